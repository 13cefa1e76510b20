//! Batch configuration
//!
//! Settings arrive in three layers: command-line flags override an optional
//! TOML file, which overrides built-in defaults. The CLI performs the merge;
//! this module owns the resolved shape, the file layer, and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::encoder::Acceleration;
use crate::error::{ClipmillError, ClipmillResult};
use crate::partition::ShardConfig;

/// Default constant rate factor for software encodes
pub const DEFAULT_CRF: u8 = 18;
/// Default x264 speed preset for software encodes
pub const DEFAULT_PRESET: &str = "medium";
/// Default number of encoder slots
pub const DEFAULT_NUM_SLOTS: usize = 1;

/// Default worker count: one per logical CPU
pub fn default_workers() -> usize {
    num_cpus::get()
}

/// Where clip media comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Assemble clips from per-clip frame folders under this root
    Frames { frame_root: PathBuf },
    /// Cut clips out of per-video source files under this root
    Trim { video_root: PathBuf },
}

impl SourceMode {
    /// Build the mode from the two mutually exclusive root options.
    pub fn from_roots(
        frame_root: Option<PathBuf>,
        video_root: Option<PathBuf>,
    ) -> ClipmillResult<Self> {
        match (frame_root, video_root) {
            (Some(frame_root), None) => Ok(SourceMode::Frames { frame_root }),
            (None, Some(video_root)) => Ok(SourceMode::Trim { video_root }),
            _ => Err(ClipmillError::SourceModeInvalid),
        }
    }

    pub fn is_frames(&self) -> bool {
        matches!(self, SourceMode::Frames { .. })
    }

    /// Short label for logs and plan output
    pub fn label(&self) -> &'static str {
        match self {
            SourceMode::Frames { .. } => "frames",
            SourceMode::Trim { .. } => "trim",
        }
    }
}

/// Fully resolved settings for one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Scenario catalog (JSON, video id to clip ids)
    pub catalog_path: PathBuf,
    /// Directory of per-clip timestamp logs (`<clip_id>.txt`)
    pub timestamps_dir: PathBuf,
    /// Clip-to-source-folder map (one `folder/clip` line per entry)
    pub folder_map_path: PathBuf,
    /// Root under which finished clips and markers land
    pub output_root: PathBuf,
    /// Where clip media comes from
    pub source: SourceMode,
    /// How the catalog is split across cooperating processes
    pub shard: ShardConfig,
    /// Maximum videos encoded concurrently by this process
    pub workers: usize,
    /// Encoder slots that videos are pinned to round-robin
    pub num_slots: usize,
    /// Hardware acceleration mode
    pub acceleration: Acceleration,
    /// Constant rate factor for software encodes
    pub crf: u8,
    /// x264 speed preset for software encodes
    pub preset: String,
    /// Verify frame counts with ffprobe after frame-set encodes
    pub verify_frame_count: bool,
}

impl BatchConfig {
    /// Reject settings no run could execute with.
    pub fn validate(&self) -> ClipmillResult<()> {
        self.shard.validate()?;
        if self.workers == 0 {
            return Err(ClipmillError::Concurrency {
                message: "workers must be at least 1".to_string(),
            });
        }
        if self.num_slots == 0 {
            return Err(ClipmillError::Concurrency {
                message: "slots must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Optional TOML settings file, every field defaultable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub catalog: Option<PathBuf>,
    pub timestamps_dir: Option<PathBuf>,
    pub folder_map: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub frame_root: Option<PathBuf>,
    pub video_root: Option<PathBuf>,
    pub workers: Option<usize>,
    pub slots: Option<usize>,
    pub low_idx: Option<usize>,
    pub high_idx: Option<i64>,
    pub num_shards: Option<usize>,
    pub shard_rank: Option<usize>,
    pub cuda: Option<bool>,
    pub crf: Option<u8>,
    pub preset: Option<String>,
    pub verify: Option<bool>,
}

impl FileConfig {
    /// Load a settings file; any unreadable or unparseable file is fatal.
    pub fn load(path: &Path) -> ClipmillResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ClipmillError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ClipmillError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
