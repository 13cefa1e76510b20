//! Batch orchestration
//!
//! The runner owns the failure, skip, and resume policy: videos already
//! holding a completion marker are dropped before dispatch, every per-clip
//! problem is logged and skipped without touching the rest of the batch,
//! and a video's marker is written only after all of its clips have been
//! attempted.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, FolderMap};
use crate::config::{BatchConfig, SourceMode};
use crate::encoder::{EncodeBackend, EncodeError, FramesJob, TrimJob};
use crate::error::ClipmillResult;
use crate::frames::list_frames;
use crate::partition::{assign_slots, shard_videos, SlotAssignment};
use crate::timing::ClipSpec;

/// Completion marker filename inside each video's output directory
pub const MARKER_FILE: &str = ".done";

/// Why a clip was skipped instead of produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Timestamp log missing, malformed, or non-positive span
    InvalidSpec,
    /// Clip id absent from the folder map
    UnresolvedClip,
    /// Frame directory missing or holding no images
    EmptyFrameSet,
    /// Output file already exists from an earlier run
    AlreadyProduced,
}

/// Per-reason skip tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub invalid_spec: usize,
    pub unresolved_clip: usize,
    pub empty_frame_set: usize,
    pub already_produced: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::InvalidSpec => self.invalid_spec += 1,
            SkipReason::UnresolvedClip => self.unresolved_clip += 1,
            SkipReason::EmptyFrameSet => self.empty_frame_set += 1,
            SkipReason::AlreadyProduced => self.already_produced += 1,
        }
    }

    fn merge(&mut self, other: &SkipCounts) {
        self.invalid_spec += other.invalid_spec;
        self.unresolved_clip += other.unresolved_clip;
        self.empty_frame_set += other.empty_frame_set;
        self.already_produced += other.already_produced;
    }

    pub fn total(&self) -> usize {
        self.invalid_spec + self.unresolved_clip + self.empty_frame_set + self.already_produced
    }
}

/// Final tallies for one batch run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Videos assigned to this shard
    pub videos_total: usize,
    /// Videos excluded before dispatch because their marker already existed
    pub videos_resumed: usize,
    /// Videos whose clips were all attempted this run
    pub videos_completed: usize,
    /// Trim-mode videos left unmarked because their source was missing
    pub videos_source_missing: usize,
    pub clips_produced: usize,
    pub clips_failed: usize,
    pub skips: SkipCounts,
}

/// Durable evidence that a video's clips were all attempted.
///
/// Existence alone is the resume signal; the contents are informational.
/// Empty marker files from older tooling still count as done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub video_id: String,
    pub clips_total: usize,
    pub clips_produced: usize,
    pub clips_failed: usize,
    pub clips_skipped: usize,
    pub completed_at: DateTime<Utc>,
}

/// Dry-run description of this shard's work
#[derive(Debug, Clone, Serialize)]
pub struct ShardPlan {
    /// Source mode label (`frames` or `trim`)
    pub mode: String,
    pub shard_rank: usize,
    pub num_shards: usize,
    /// Videos in the whole catalog
    pub videos_total: usize,
    pub videos_in_shard: usize,
    pub clips_in_shard: usize,
    pub assignments: Vec<PlannedVideo>,
}

/// One video's planned work
#[derive(Debug, Clone, Serialize)]
pub struct PlannedVideo {
    pub video_id: String,
    pub slot: usize,
    pub clips: usize,
    /// Whether a completion marker already exists
    pub done: bool,
}

/// Tallies carried back from one video's task
#[derive(Debug, Default)]
struct VideoOutcome {
    produced: usize,
    failed: usize,
    skips: SkipCounts,
    source_missing: bool,
}

/// What happened to a single clip
enum ClipOutcome {
    Produced,
    Skipped(SkipReason),
    Failed,
}

/// Where a video's clip media comes from, resolved once per video
enum ClipSource<'a> {
    Frames { frame_root: &'a Path },
    Trim { source: PathBuf },
}

/// Drives one shard's videos through a bounded worker pool
pub struct BatchRunner {
    config: Arc<BatchConfig>,
    catalog: Catalog,
    folder_map: Arc<FolderMap>,
    backend: Arc<dyn EncodeBackend>,
}

impl BatchRunner {
    pub fn new(
        config: BatchConfig,
        catalog: Catalog,
        folder_map: FolderMap,
        backend: Arc<dyn EncodeBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            folder_map: Arc::new(folder_map),
            backend,
        }
    }

    /// This shard's videos with their slot assignments, in catalog order
    fn shard_assignments(&self) -> Vec<SlotAssignment> {
        let ids: Vec<&str> = self.catalog.video_ids().collect();
        let shard = shard_videos(&ids, &self.config.shard);
        assign_slots(shard, self.config.num_slots)
    }

    /// Describe this shard's work without encoding anything.
    pub fn plan(&self) -> ShardPlan {
        let assignments = self.shard_assignments();
        let mut plan = ShardPlan {
            mode: self.config.source.label().to_string(),
            shard_rank: self.config.shard.shard_rank,
            num_shards: self.config.shard.num_shards,
            videos_total: self.catalog.len(),
            videos_in_shard: assignments.len(),
            clips_in_shard: 0,
            assignments: Vec::with_capacity(assignments.len()),
        };

        for assignment in assignments {
            let clips = self
                .catalog
                .clips_for(&assignment.video_id)
                .map(|c| c.len())
                .unwrap_or(0);
            let done = marker_path(&self.config.output_root, &assignment.video_id).exists();
            plan.clips_in_shard += clips;
            plan.assignments.push(PlannedVideo {
                video_id: assignment.video_id,
                slot: assignment.slot,
                clips,
                done,
            });
        }
        plan
    }

    /// Process every video in this shard and return the final tallies.
    ///
    /// Per-clip failures never abort the run; the only errors surfaced here
    /// are ones that would make any further work meaningless.
    pub async fn run(&self) -> ClipmillResult<RunReport> {
        let assignments = self.shard_assignments();
        let mut report = RunReport {
            videos_total: assignments.len(),
            ..RunReport::default()
        };

        // Resume: drop already-done videos before any dispatch so a re-run
        // over a finished shard does no per-clip work at all.
        let mut pending = Vec::new();
        for assignment in assignments {
            if marker_path(&self.config.output_root, &assignment.video_id).exists() {
                debug!("resuming past {}: completion marker present", assignment.video_id);
                report.videos_resumed += 1;
            } else {
                pending.push(assignment);
            }
        }

        if pending.is_empty() {
            info!(
                "nothing to do: {} videos in shard, {} already done",
                report.videos_total, report.videos_resumed
            );
            return Ok(report);
        }

        let pool_size = self.config.workers.min(pending.len());
        info!(
            "processing {} videos with {} workers ({} resumed)",
            pending.len(),
            pool_size,
            report.videos_resumed
        );

        let semaphore = Arc::new(Semaphore::new(pool_size));
        let mut tasks = JoinSet::new();
        for assignment in pending {
            let semaphore = Arc::clone(&semaphore);
            let config = Arc::clone(&self.config);
            let folder_map = Arc::clone(&self.folder_map);
            let backend = Arc::clone(&self.backend);
            let clips: Vec<String> = self
                .catalog
                .clips_for(&assignment.video_id)
                .map(|c| c.to_vec())
                .unwrap_or_default();

            tasks.spawn(async move {
                // The semaphore lives for the whole run and is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                process_video(config, folder_map, backend, assignment, clips).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.clips_produced += outcome.produced;
                    report.clips_failed += outcome.failed;
                    report.skips.merge(&outcome.skips);
                    if outcome.source_missing {
                        report.videos_source_missing += 1;
                    } else {
                        report.videos_completed += 1;
                    }
                }
                Err(e) => {
                    // A panicked task loses its video's tallies but must not
                    // take down the rest of the batch.
                    error!("video task failed: {}", e);
                }
            }
        }

        info!(
            "batch finished: {} clips produced, {} failed, {} skipped across {} videos",
            report.clips_produced,
            report.clips_failed,
            report.skips.total(),
            report.videos_completed
        );
        Ok(report)
    }
}

/// Process one video's clips sequentially, then write its marker.
///
/// Never returns an error: every failure is tallied and logged here.
async fn process_video(
    config: Arc<BatchConfig>,
    folder_map: Arc<FolderMap>,
    backend: Arc<dyn EncodeBackend>,
    assignment: SlotAssignment,
    clips: Vec<String>,
) -> VideoOutcome {
    let video_id = assignment.video_id;
    let device = config.acceleration.is_cuda().then_some(assignment.slot);
    let mut outcome = VideoOutcome::default();

    let source = match &config.source {
        SourceMode::Frames { frame_root } => ClipSource::Frames { frame_root },
        SourceMode::Trim { video_root } => {
            let source = video_root.join(format!("{}.mp4", video_id));
            // Leave the video unmarked so a later run retries it once the
            // source shows up.
            if !source.exists() {
                warn!("source video missing for {}: {}", video_id, source.display());
                outcome.source_missing = true;
                return outcome;
            }
            ClipSource::Trim { source }
        }
    };

    info!(
        "processing {} ({} clips, slot {})",
        video_id,
        clips.len(),
        assignment.slot
    );

    for clip_id in &clips {
        let clip_outcome = process_clip(
            &config,
            &folder_map,
            backend.as_ref(),
            &video_id,
            clip_id,
            &source,
            device,
        )
        .await;
        match clip_outcome {
            ClipOutcome::Produced => outcome.produced += 1,
            ClipOutcome::Skipped(reason) => outcome.skips.record(reason),
            ClipOutcome::Failed => outcome.failed += 1,
        }
    }

    let marker = CompletionMarker {
        video_id: video_id.clone(),
        clips_total: clips.len(),
        clips_produced: outcome.produced,
        clips_failed: outcome.failed,
        clips_skipped: outcome.skips.total(),
        completed_at: Utc::now(),
    };
    if let Err(e) = write_marker(&config.output_root, &marker) {
        warn!("failed to write completion marker for {}: {}", video_id, e);
    }

    debug!(
        "finished {}: {} produced, {} failed, {} skipped",
        video_id,
        outcome.produced,
        outcome.failed,
        outcome.skips.total()
    );
    outcome
}

/// Run one clip through spec loading, input resolution, and the encoder.
async fn process_clip(
    config: &BatchConfig,
    folder_map: &FolderMap,
    backend: &dyn EncodeBackend,
    video_id: &str,
    clip_id: &str,
    source: &ClipSource<'_>,
    device: Option<usize>,
) -> ClipOutcome {
    let output = clip_output_path(&config.output_root, video_id, clip_id);

    // Cheapest check first: a clip produced by an earlier run needs no spec
    // parsing or directory scan.
    if output.exists() {
        debug!("skipping {}/{}: output already exists", video_id, clip_id);
        return ClipOutcome::Skipped(SkipReason::AlreadyProduced);
    }

    let log_path = config.timestamps_dir.join(format!("{}.txt", clip_id));
    let Some(spec) = ClipSpec::from_log_file(&log_path) else {
        debug!("skipping {}/{}: invalid timestamp log", video_id, clip_id);
        return ClipOutcome::Skipped(SkipReason::InvalidSpec);
    };

    let result = match source {
        ClipSource::Frames { frame_root } => {
            let Some(relative) = folder_map.resolve(clip_id) else {
                debug!("skipping {}/{}: not in folder map", video_id, clip_id);
                return ClipOutcome::Skipped(SkipReason::UnresolvedClip);
            };
            let frame_dir = frame_root.join(relative);
            let frames = list_frames(&frame_dir);
            if frames.is_empty() {
                debug!(
                    "skipping {}/{}: no frames under {}",
                    video_id,
                    clip_id,
                    frame_dir.display()
                );
                return ClipOutcome::Skipped(SkipReason::EmptyFrameSet);
            }
            let job = FramesJob {
                frames,
                fps: spec.fps,
                output: output.clone(),
                device,
            };
            backend.encode_frames(&job).await
        }
        ClipSource::Trim { source } => {
            let job = TrimJob {
                source: source.clone(),
                start_secs: spec.start_secs,
                duration_secs: spec.duration_secs,
                output: output.clone(),
                device,
            };
            backend.trim_source(&job).await
        }
    };

    match result {
        Ok(()) => {
            info!("produced {}", output.display());
            ClipOutcome::Produced
        }
        Err(err) if err.is_already_produced() => {
            debug!("skipping {}/{}: output already exists", video_id, clip_id);
            ClipOutcome::Skipped(SkipReason::AlreadyProduced)
        }
        Err(EncodeError::Failed {
            command,
            status,
            stderr,
        }) => {
            error!(
                "encode failed for {}/{} ({}): {}\n{}",
                video_id, clip_id, status, command, stderr
            );
            ClipOutcome::Failed
        }
        Err(err) => {
            error!("encode failed for {}/{}: {}", video_id, clip_id, err);
            ClipOutcome::Failed
        }
    }
}

/// Final destination of one clip
pub fn clip_output_path(output_root: &Path, video_id: &str, clip_id: &str) -> PathBuf {
    output_root.join(video_id).join(format!("{}.mp4", clip_id))
}

/// Completion marker location for one video
pub fn marker_path(output_root: &Path, video_id: &str) -> PathBuf {
    output_root.join(video_id).join(MARKER_FILE)
}

/// Write a video's completion marker atomically (temp file then rename).
fn write_marker(output_root: &Path, marker: &CompletionMarker) -> std::io::Result<()> {
    let path = marker_path(output_root, &marker.video_id);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_vec_pretty(marker)?;
    let mut staging = tempfile::Builder::new().prefix(".done-").tempfile_in(dir)?;
    staging.write_all(&json)?;
    staging.persist(&path).map_err(|e| e.error)?;
    Ok(())
}
