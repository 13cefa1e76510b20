//! Error handling module for clipmill
//!
//! Only fatal configuration problems live here: anything that makes it unsafe
//! to start (or continue planning) a batch. Per-clip conditions are modeled as
//! skip outcomes in the runner and never surface as errors.

use thiserror::Error;

/// Fatal errors that abort a run before any work starts
#[derive(Error, Debug)]
pub enum ClipmillError {
    /// Catalog file missing, unreadable, or not valid JSON
    #[error("failed to load catalog {path}: {message}")]
    CatalogLoad { path: String, message: String },

    /// Folder-map file missing or unreadable
    #[error("failed to load folder map {path}: {message}")]
    FolderMapLoad { path: String, message: String },

    /// Config file missing, unreadable, or not valid TOML
    #[error("failed to load config file {path}: {message}")]
    ConfigLoad { path: String, message: String },

    /// An option required by the selected command was not supplied on the
    /// command line or in the config file
    #[error("missing required option: {name}")]
    MissingOption { name: &'static str },

    /// Neither or both of the frame root and video root were configured
    #[error("exactly one of frame-root (frames mode) or video-root (trim mode) must be set")]
    SourceModeInvalid,

    /// Shard window or rank parameters out of range
    #[error("invalid shard configuration: {message}")]
    ShardConfig { message: String },

    /// Worker-pool or slot counts that cannot schedule any work
    #[error("invalid concurrency configuration: {message}")]
    Concurrency { message: String },

    /// The external encoder binary is not usable
    #[error("encoder unavailable: {message}")]
    EncoderUnavailable { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for clipmill operations
pub type ClipmillResult<T> = std::result::Result<T, ClipmillError>;
