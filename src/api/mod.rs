pub mod batch;
pub mod extractor;

pub use batch::{QueuedVideo, VideoQueue, VideoReport, VideoResult};
pub use extractor::{ExtractionOutcome, SubtitleExtractor};
