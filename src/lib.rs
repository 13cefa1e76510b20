//! Clipmill batch clip converter library
//!
//! Turns a catalog of (video, clip) pairs plus per-clip timestamp logs into
//! encoded clips: the catalog is partitioned into shards and worker slots,
//! each clip's encode parameters are derived from its timestamp log, and
//! completion markers make multi-hour batches safe to interrupt and resume.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frames;
pub mod partition;
pub mod runner;
pub mod timing;

// Re-export commonly used types
pub use catalog::{Catalog, FolderMap};
pub use config::{BatchConfig, SourceMode};
pub use encoder::{Acceleration, EncodeBackend, EncodeError, FfmpegEncoder, FramesJob, TrimJob};
pub use error::{ClipmillError, ClipmillResult};
pub use partition::ShardConfig;
pub use runner::{BatchRunner, CompletionMarker, RunReport, ShardPlan};
pub use timing::ClipSpec;
