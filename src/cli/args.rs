//! Command-line argument definitions
//!
//! Every run option is optional on the command line; [`RunArgs::resolve`]
//! merges flags over an optional TOML settings file over built-in defaults
//! and rejects anything unusable before work starts.

use std::path::PathBuf;

use clap::Args;

use crate::config::{
    default_workers, BatchConfig, FileConfig, SourceMode, DEFAULT_CRF, DEFAULT_NUM_SLOTS,
    DEFAULT_PRESET,
};
use crate::encoder::Acceleration;
use crate::error::{ClipmillError, ClipmillResult};
use crate::partition::{ShardConfig, WINDOW_END};

/// Range-checked parser for --crf
fn crf_in_range(s: &str) -> Result<u8, String> {
    clap_num::number_range(s, 0, 51)
}

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Catalog file (JSON, video id -> clip ids)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Directory of per-clip timestamp logs
    #[arg(long)]
    pub timestamps_dir: Option<PathBuf>,

    /// Folder-map file (one folder/clip line per entry)
    #[arg(long)]
    pub folder_map: Option<PathBuf>,

    /// Frame root for frames mode
    #[arg(long, conflicts_with = "video_root")]
    pub frame_root: Option<PathBuf>,

    /// Source-video root for trim mode
    #[arg(long)]
    pub video_root: Option<PathBuf>,

    /// Root under which per-video output directories land
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// First catalog index of this run's window
    #[arg(long)]
    pub low_idx: Option<usize>,

    /// End of the window (exclusive), -1 for the catalog end
    #[arg(long, allow_hyphen_values = true)]
    pub high_idx: Option<i64>,

    /// Total cooperating processes
    #[arg(long)]
    pub num_shards: Option<usize>,

    /// This process's shard rank
    #[arg(long)]
    pub shard_rank: Option<usize>,

    /// Videos encoded concurrently (default: logical CPUs)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Encoder slots (e.g. GPUs) videos are pinned to round-robin
    #[arg(long)]
    pub slots: Option<usize>,

    /// Use CUDA decode and NVENC encode
    #[arg(long)]
    pub hwaccel: bool,

    /// Constant rate factor for software encodes (0-51)
    #[arg(long, value_parser = crf_in_range)]
    pub crf: Option<u8>,

    /// x264 speed preset for software encodes
    #[arg(long)]
    pub preset: Option<String>,

    /// Verify output frame counts with ffprobe
    #[arg(long)]
    pub verify: bool,

    /// TOML settings file merged beneath command-line flags
    #[arg(long, env = "CLIPMILL_CONFIG")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Resolve the settings layers into a validated [`BatchConfig`].
    ///
    /// Flags win over file values, file values over defaults. The frame-root
    /// and video-root pair is overridden as a unit: supplying either root on
    /// the command line replaces both file values, so a flag can switch the
    /// mode a settings file selected.
    pub fn resolve(&self) -> ClipmillResult<BatchConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let catalog_path = self
            .catalog
            .clone()
            .or(file.catalog)
            .ok_or(ClipmillError::MissingOption { name: "catalog" })?;
        let timestamps_dir = self
            .timestamps_dir
            .clone()
            .or(file.timestamps_dir)
            .ok_or(ClipmillError::MissingOption {
                name: "timestamps-dir",
            })?;
        let folder_map_path = self
            .folder_map
            .clone()
            .or(file.folder_map)
            .ok_or(ClipmillError::MissingOption { name: "folder-map" })?;
        let output_root = self
            .output_root
            .clone()
            .or(file.output_root)
            .ok_or(ClipmillError::MissingOption { name: "output-root" })?;

        let (frame_root, video_root) = if self.frame_root.is_some() || self.video_root.is_some() {
            (self.frame_root.clone(), self.video_root.clone())
        } else {
            (file.frame_root, file.video_root)
        };
        let source = SourceMode::from_roots(frame_root, video_root)?;

        let shard = ShardConfig {
            low_idx: self.low_idx.or(file.low_idx).unwrap_or(0),
            high_idx: self.high_idx.or(file.high_idx).unwrap_or(WINDOW_END),
            num_shards: self.num_shards.or(file.num_shards).unwrap_or(1),
            shard_rank: self.shard_rank.or(file.shard_rank).unwrap_or(0),
        };

        let acceleration = if self.hwaccel || file.cuda.unwrap_or(false) {
            Acceleration::Cuda
        } else {
            Acceleration::Software
        };

        let config = BatchConfig {
            catalog_path,
            timestamps_dir,
            folder_map_path,
            output_root,
            source,
            shard,
            workers: self.workers.or(file.workers).unwrap_or_else(default_workers),
            num_slots: self.slots.or(file.slots).unwrap_or(DEFAULT_NUM_SLOTS),
            acceleration,
            crf: self.crf.or(file.crf).unwrap_or(DEFAULT_CRF),
            preset: self
                .preset
                .clone()
                .or(file.preset)
                .unwrap_or_else(|| DEFAULT_PRESET.to_string()),
            verify_frame_count: self.verify || file.verify.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub format: String,
}
