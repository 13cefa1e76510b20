//! Clip timing derivation from timestamp logs
//!
//! Every clip ships with a sparse log: one header line, then one line per
//! frame whose first whitespace-delimited token is an integer microsecond
//! timestamp. Loading is fail-soft, so a missing or malformed log yields
//! `None` and the caller skips the clip; it never errors the batch.

use std::path::Path;

use tracing::debug;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Timing parameters derived from one clip's timestamp log
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    /// Frames per second, derived from the first two samples
    pub fps: f64,
    /// Offset of the clip within its source video, in seconds
    pub start_secs: f64,
    /// Total clip duration in seconds
    pub duration_secs: f64,
    /// Number of timestamp samples in the log
    pub sample_count: usize,
}

impl ClipSpec {
    /// Load and validate a clip's timestamp log.
    ///
    /// Returns `None` when the file is missing or unreadable, holds fewer
    /// than two samples after the header, contains an unparseable timestamp
    /// token, or spans a non-positive time range.
    pub fn from_log_file(path: &Path) -> Option<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("timestamp log {} unreadable: {}", path.display(), e);
                return None;
            }
        };

        let spec = Self::from_log_text(&raw);
        if spec.is_none() {
            debug!("timestamp log {} is invalid", path.display());
        }
        spec
    }

    /// Parse timestamp-log text: a header line, then one sample per
    /// non-blank line
    pub fn from_log_text(raw: &str) -> Option<Self> {
        let mut timestamps = Vec::new();

        for line in raw.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let token = line.split_whitespace().next()?;
            timestamps.push(token.parse::<i64>().ok()?);
        }

        Self::from_timestamps(&timestamps)
    }

    /// Derive timing from raw microsecond samples.
    ///
    /// The fps uses exactly the first interval `ts[1] - ts[0]`, not an
    /// average; downstream output parity depends on this. A zero or negative
    /// first interval makes fps undefined and invalidates the clip even when
    /// the overall span is positive.
    pub fn from_timestamps(timestamps: &[i64]) -> Option<Self> {
        if timestamps.len() < 2 {
            return None;
        }

        let first = timestamps[0];
        let second = timestamps[1];
        let last = *timestamps.last()?;

        if last <= first || second <= first {
            return None;
        }

        Some(Self {
            fps: MICROS_PER_SEC / (second - first) as f64,
            start_secs: first as f64 / MICROS_PER_SEC,
            duration_secs: (last - first) as f64 / MICROS_PER_SEC,
            sample_count: timestamps.len(),
        })
    }
}
