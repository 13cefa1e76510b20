//! Work partitioning
//!
//! Splits the catalog across cooperating processes. An index window first
//! selects a contiguous run of videos, a modulo shard then picks this
//! process's share of the window, and each assigned video is pinned to an
//! encoder slot round-robin.

use serde::{Deserialize, Serialize};

use crate::error::{ClipmillError, ClipmillResult};

/// Sentinel meaning "window extends to the end of the catalog"
pub const WINDOW_END: i64 = -1;

/// How the catalog is divided among cooperating processes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    /// First catalog index in the window (inclusive)
    pub low_idx: usize,
    /// End of the window (exclusive), or [`WINDOW_END`] for the catalog end
    pub high_idx: i64,
    /// Total number of cooperating processes
    pub num_shards: usize,
    /// This process's shard, in `[0, num_shards)`
    pub shard_rank: usize,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            low_idx: 0,
            high_idx: WINDOW_END,
            num_shards: 1,
            shard_rank: 0,
        }
    }
}

impl ShardConfig {
    /// Reject parameters that cannot describe a valid partition.
    pub fn validate(&self) -> ClipmillResult<()> {
        if self.num_shards == 0 {
            return Err(ClipmillError::ShardConfig {
                message: "num-shards must be at least 1".to_string(),
            });
        }
        if self.shard_rank >= self.num_shards {
            return Err(ClipmillError::ShardConfig {
                message: format!(
                    "shard-rank {} is out of range for {} shards",
                    self.shard_rank, self.num_shards
                ),
            });
        }
        if self.high_idx < WINDOW_END {
            return Err(ClipmillError::ShardConfig {
                message: format!(
                    "high-idx must be -1 or a non-negative index, got {}",
                    self.high_idx
                ),
            });
        }
        Ok(())
    }
}

/// A video pinned to an encoder slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub video_id: String,
    pub slot: usize,
}

/// Select this shard's videos from the catalog's insertion order.
///
/// The window is applied first with slice semantics (a window past the end
/// is empty, never an error), then every `num_shards`-th entry of the window
/// belongs to this rank.
pub fn shard_videos(video_ids: &[&str], config: &ShardConfig) -> Vec<String> {
    let high = if config.high_idx == WINDOW_END {
        video_ids.len()
    } else {
        (config.high_idx as usize).min(video_ids.len())
    };
    let low = config.low_idx.min(high);

    video_ids[low..high]
        .iter()
        .enumerate()
        .filter(|(pos, _)| pos % config.num_shards == config.shard_rank)
        .map(|(_, id)| id.to_string())
        .collect()
}

/// Pin each of this shard's videos to an encoder slot, round-robin.
///
/// Callers guarantee `num_slots >= 1`; configuration resolution rejects
/// zero before work reaches this point.
pub fn assign_slots(video_ids: Vec<String>, num_slots: usize) -> Vec<SlotAssignment> {
    video_ids
        .into_iter()
        .enumerate()
        .map(|(pos, video_id)| SlotAssignment {
            video_id,
            slot: pos % num_slots,
        })
        .collect()
}

#[cfg(test)]
mod tests;
