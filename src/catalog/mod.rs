//! Catalog and folder-map loading
//!
//! Both structures are loaded once at startup and shared read-only with the
//! workers. Failures here are fatal: a batch cannot safely start without
//! knowing exactly which videos it owns.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ClipmillError, ClipmillResult};

/// The video → clips mapping driving the whole batch.
///
/// Iteration order is the catalog file's key order; the partitioner relies on
/// this for deterministic shard membership across machines and restarts.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: IndexMap<String, Vec<String>>,
}

impl Catalog {
    /// Load the catalog from a JSON object of video id → ordered clip id array
    pub fn load(path: &Path) -> ClipmillResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ClipmillError::CatalogLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let entries: IndexMap<String, Vec<String>> =
            serde_json::from_str(&raw).map_err(|e| ClipmillError::CatalogLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        debug!("loaded catalog with {} videos", entries.len());
        Ok(Self { entries })
    }

    /// Build a catalog from already-ordered entries
    pub fn from_entries(entries: IndexMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// Video ids in catalog order
    pub fn video_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Clip ids for one video, in catalog order
    pub fn clips_for(&self, video_id: &str) -> Option<&[String]> {
        self.entries.get(video_id).map(Vec::as_slice)
    }

    /// Number of videos in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no videos
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Clip id → relative frame-folder path, loaded from a flat text file
#[derive(Debug, Clone, Default)]
pub struct FolderMap {
    entries: HashMap<String, String>,
}

impl FolderMap {
    /// Load the map from a file with one `folder/clipId` entry per line.
    ///
    /// An unreadable file is fatal; individual bad lines are not (see
    /// [`FolderMap::parse`]).
    pub fn load(path: &Path) -> ClipmillResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ClipmillError::FolderMapLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::parse(&raw))
    }

    /// Parse folder-map text.
    ///
    /// Each line splits on its first `/`: the first segment is the folder,
    /// the remainder is the clip id, and the stored value is the whole line
    /// (the path relative to the frame root). Blank lines and lines without a
    /// `/` are skipped. A clip id appearing on more than one line keeps the
    /// last line.
    pub fn parse(raw: &str) -> Self {
        let mut entries = HashMap::new();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once('/') {
                Some((_folder, clip)) => {
                    entries.insert(clip.to_string(), line.to_string());
                }
                None => {
                    debug!("skipping malformed folder-map line: {:?}", line);
                }
            }
        }

        Self { entries }
    }

    /// Resolve a clip id to its relative frame-folder path
    pub fn resolve(&self, clip_id: &str) -> Option<&str> {
        self.entries.get(clip_id).map(String::as_str)
    }

    /// Number of mapped clips
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
