//! Error taxonomy for a publish run.
//!
//! [`PublishError`] is fatal: it stops the pipeline and is surfaced to the operator.
//! Every other error type here is recovered where it occurs, logged against the
//! offending item, and recorded in the run's skipped list.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// Bad or missing request name.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Version-control or other external tool failed.
    #[error("external tool failed during {stage}: {message}")]
    ExternalTool { stage: &'static str, message: String },

    /// The daily record could not be written, so nothing downstream has an id.
    #[error("top-level record insert failed: {0}")]
    TopLevelRecord(String),

    /// The human could not be asked (stdin closed, script exhausted).
    #[error("prompt failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("failed to read corpus {path}: {source}")]
    Corpus {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-asset failure; the asset is excluded from later stages.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to upload {file}: {message}")]
    Upload { file: String, message: String },
}

/// Per-record insert failure for a dependent (audio or text) record.
#[derive(Debug, Error)]
#[error("failed to insert {record}: {message}")]
pub struct RecordError {
    pub record: String,
    pub message: String,
}

/// Local cache sync failure. Never changes the run outcome.
#[derive(Debug, Error)]
#[error("mirror of {target} failed: {message} (retry manually: {hint})")]
pub struct MirrorError {
    pub target: String,
    pub message: String,
    pub hint: String,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input closed")]
    Closed,

    #[error("prompt io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to launch git {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} exited with {status}")]
    Exit { command: String, status: String },
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no audio player found (tried: {0})")]
    NotFound(String),

    #[error("{player} failed: {message}")]
    Failed { player: String, message: String },
}

#[derive(Debug, Error)]
#[error("artwork generation failed: {0}")]
pub struct ArtworkError(pub String);
