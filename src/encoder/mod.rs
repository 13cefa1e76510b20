//! Encoding backends
//!
//! The runner hands fully-resolved jobs to a backend and treats every
//! failure as per-clip: a bad clip is logged and skipped, never allowed to
//! abort the batch.

pub mod ffmpeg;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use ffmpeg::FfmpegEncoder;

/// Result type for encoding operations
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Hardware acceleration for encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceleration {
    /// CPU-only x264 encoding
    Software,
    /// NVIDIA CUDA decode and NVENC encode
    Cuda,
}

impl Acceleration {
    pub fn is_cuda(&self) -> bool {
        matches!(self, Acceleration::Cuda)
    }
}

/// Assemble a clip from an ordered set of still frames
#[derive(Debug, Clone, PartialEq)]
pub struct FramesJob {
    /// Frame files in playback order
    pub frames: Vec<PathBuf>,
    /// Constant frame rate derived from the clip's timing log
    pub fps: f64,
    /// Final destination of the clip
    pub output: PathBuf,
    /// Encoder device index, when the backend pins work to devices
    pub device: Option<usize>,
}

/// Cut a time window out of an existing source video
#[derive(Debug, Clone, PartialEq)]
pub struct TrimJob {
    /// Source video to cut from
    pub source: PathBuf,
    /// Window start in seconds
    pub start_secs: f64,
    /// Window length in seconds
    pub duration_secs: f64,
    /// Final destination of the clip
    pub output: PathBuf,
    /// Encoder device index, when the backend pins work to devices
    pub device: Option<usize>,
}

/// Per-clip encoding failures
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The destination already exists; an earlier run produced this clip
    #[error("output already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    /// The encoder process ran and exited non-zero
    #[error("encoder exited with {status}: {command}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Frame-count verification found a different number of frames than
    /// the job supplied
    #[error("produced {actual} frames, expected {expected}: {}", .path.display())]
    FrameCountMismatch {
        expected: usize,
        actual: usize,
        path: PathBuf,
    },

    /// Frame-count verification itself could not run
    #[error("frame verification failed: {message}")]
    Probe { message: String },

    /// The encoder process could not be launched
    #[error("failed to launch encoder: {message}")]
    Spawn { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncodeError {
    /// Whether the failure means the clip already exists on disk
    pub fn is_already_produced(&self) -> bool {
        matches!(self, EncodeError::AlreadyExists { .. })
    }
}

/// A video encoder the batch runner can dispatch clips to.
///
/// Both operations must be idempotent with respect to the destination: an
/// existing output is reported as [`EncodeError::AlreadyExists`] and is
/// never overwritten or left half-written.
#[async_trait]
pub trait EncodeBackend: Send + Sync {
    /// Assemble `job.frames` into a clip at `job.output`.
    async fn encode_frames(&self, job: &FramesJob) -> EncodeResult<()>;

    /// Cut `[start, start + duration)` out of `job.source` into `job.output`.
    async fn trim_source(&self, job: &TrimJob) -> EncodeResult<()>;
}
