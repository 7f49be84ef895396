pub mod frame;
pub mod mock;
pub mod sampler;

pub use frame::{frame_to_timecode, DecodedFrame, VideoBackend, VideoDetails, VideoError, VideoHandle};
pub use mock::SyntheticVideo;
pub use sampler::{FrameChunk, FrameSampler, SampleRequest, SampleStats};
