//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::{Catalog, FolderMap};
use crate::cli::args::{PlanArgs, RunArgs};
use crate::config::BatchConfig;
use crate::encoder::{EncodeBackend, FfmpegEncoder};
use crate::runner::{BatchRunner, ShardPlan};

/// Execute the run command
pub async fn run(args: RunArgs) -> Result<()> {
    let config = args.resolve()?;

    info!("Starting batch run");
    info!("Catalog: {}", config.catalog_path.display());
    info!("Output root: {}", config.output_root.display());
    info!("Mode: {}", config.source.label());
    info!(
        "Shard: rank {} of {}, window [{}, {})",
        config.shard.shard_rank, config.shard.num_shards, config.shard.low_idx, config.shard.high_idx
    );
    info!(
        "Workers: {}, slots: {}, acceleration: {:?}",
        config.workers, config.num_slots, config.acceleration
    );

    let encoder = FfmpegEncoder::new()
        .with_acceleration(config.acceleration)
        .with_crf(config.crf)
        .with_preset(config.preset.clone())
        .with_verification(config.verify_frame_count);
    encoder.check_available().await?;

    let runner = load_runner(config, Arc::new(encoder))?;
    let report = runner.run().await?;

    info!(
        "Summary: {} produced, {} failed, {} skipped ({} invalid spec, {} unresolved, {} empty frame set, {} already produced)",
        report.clips_produced,
        report.clips_failed,
        report.skips.total(),
        report.skips.invalid_spec,
        report.skips.unresolved_clip,
        report.skips.empty_frame_set,
        report.skips.already_produced
    );
    info!(
        "Videos: {} completed, {} resumed, {} missing sources, {} in shard",
        report.videos_completed,
        report.videos_resumed,
        report.videos_source_missing,
        report.videos_total
    );
    if report.clips_failed > 0 {
        warn!(
            "{} clips failed to encode; see error logs above",
            report.clips_failed
        );
    }

    info!("Run completed");
    Ok(())
}

/// Execute the plan command
pub async fn plan(args: PlanArgs) -> Result<()> {
    let config = args.run.resolve()?;

    // Planning never encodes, so the backend is never exercised.
    let runner = load_runner(config, Arc::new(FfmpegEncoder::new()))?;
    let plan = runner.plan();

    match args.format.as_str() {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Failed to serialize plan to JSON")?
        ),
        "yaml" => print!(
            "{}",
            serde_yaml::to_string(&plan).context("Failed to serialize plan to YAML")?
        ),
        _ => display_plan(&plan),
    }
    Ok(())
}

/// Load the shared inputs and assemble the runner
fn load_runner(config: BatchConfig, backend: Arc<dyn EncodeBackend>) -> Result<BatchRunner> {
    let catalog = Catalog::load(&config.catalog_path).context("Failed to load catalog")?;
    let folder_map =
        FolderMap::load(&config.folder_map_path).context("Failed to load folder map")?;
    info!(
        "Loaded {} videos from catalog, {} folder-map entries",
        catalog.len(),
        folder_map.len()
    );
    Ok(BatchRunner::new(config, catalog, folder_map, backend))
}

/// Display a shard plan in human-readable format
fn display_plan(plan: &ShardPlan) {
    println!(
        "Shard {} of {} ({} mode)",
        plan.shard_rank, plan.num_shards, plan.mode
    );
    println!(
        "Videos: {} of {} in catalog, {} clips total",
        plan.videos_in_shard, plan.videos_total, plan.clips_in_shard
    );
    println!();
    for video in &plan.assignments {
        let status = if video.done { "done" } else { "pending" };
        println!(
            "  slot {}  {:>4} clips  {:<8} {}",
            video.slot, video.clips, status, video.video_id
        );
    }
}
