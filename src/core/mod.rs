pub mod area;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod ocr;
pub mod subtitle;
pub mod video;

pub use cancel::{CancellationToken, StageOutcome};
pub use config::ExtractorConfig;
pub use error::{ConfigError, ExtractError};
