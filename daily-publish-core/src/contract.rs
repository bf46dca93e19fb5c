//! # contract: interfaces to everything outside the pipeline
//!
//! The orchestrator never talks to the network, git, a terminal or a sound card
//! directly. It goes through the traits in this module, which are implemented by
//! thin adapters (`vcs::GitCli`, `prompt::StdinPrompt`, `player::SystemPlayer`,
//! `artwork::SvgArtwork`, and the HTTP store client in the CLI crate) and by
//! `mockall` mocks in tests.
//!
//! ## Mocking & Testing
//! - Every trait is annotated with `automock`; the generated `Mock*` types are
//!   exported when the `test-export-mocks` feature is enabled (on by default), so
//!   downstream crates can drive the whole pipeline deterministically.
//!
//! ## Record Types
//! - `DailyRecord`, `AudioRecord` and `TextRecord` are the rows written to the
//!   database side of the store. They serialize to the JSON bodies the REST
//!   client posts.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
#[allow(unused_imports)]
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};

use crate::error::{ArtworkError, PlayerError, PromptError, StoreError, VcsError};

/// The top-level row written once per run. Its returned id keys every other row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub name: String,
    pub date: NaiveDate,
    pub description: String,
    pub cover_art_url: Option<String>,
}

/// One row per successfully uploaded audio asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    pub daily_id: i64,
    pub file_name: String,
    pub url: String,
    pub duration_seconds: Option<u32>,
    pub size_bytes: u64,
    pub coherency_level: Option<u8>,
}

/// One row per finalized generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub daily_id: i64,
    pub content: String,
    pub coherency_level: u8,
    pub length: usize,
}

/// Generated cover art, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// File extension without the dot, e.g. `svg`.
    pub extension: String,
}

/// Blob storage plus the three database tables a run writes to.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload bytes under `path` and return the public URL.
    async fn upload_blob(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Insert the daily record and return its id.
    async fn insert_daily(&self, record: &DailyRecord) -> Result<i64, StoreError>;

    async fn insert_audio(&self, record: &AudioRecord) -> Result<(), StoreError>;

    async fn insert_text(&self, record: &TextRecord) -> Result<(), StoreError>;

    /// Fetch a previously uploaded blob.
    async fn download_blob(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// The slice of a version-control client the publish step needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Check out `branch`, creating it from the current HEAD if it does not exist.
    async fn checkout_or_create_branch(&self, branch: &str) -> Result<(), VcsError>;

    /// Stage every change in the working tree and commit it.
    async fn commit_all(&self, message: &str) -> Result<(), VcsError>;

    async fn push(&self, branch: &str) -> Result<(), VcsError>;
}

/// Asks a human a question and returns their answer, without the trailing newline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, PromptError>;
}

/// Plays an audio file so the reviewer can rate it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), PlayerError>;
}

/// Produces cover art for a bundle.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArtworkGenerator: Send + Sync {
    async fn generate(&self, name: &str) -> Result<Artwork, ArtworkError>;
}
