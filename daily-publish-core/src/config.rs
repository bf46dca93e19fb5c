use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything a run needs besides the request itself and the collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub paths: PathsConfig,
    pub generation: GenerationConfig,
    pub publish: GitConfig,
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        info!(
            incoming_dir = %self.paths.incoming_dir.display(),
            content_dir = %self.paths.content_dir.display(),
            text_count = self.generation.text_count,
            max_words = self.generation.max_words,
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}

/// Filesystem layout consumed and produced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds `<name>/` directories or `<name>.<ext>` files.
    pub incoming_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub template: PathBuf,
    pub content_dir: PathBuf,
    pub corpus: PathBuf,
    pub audio_cache_dir: PathBuf,
    pub texts_cache: PathBuf,
    pub artwork_cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            incoming_dir: PathBuf::from("incoming"),
            backup_dir: PathBuf::from("incoming/.backup"),
            template: PathBuf::from("templates/daily.md"),
            content_dir: PathBuf::from("content"),
            corpus: PathBuf::from("corpus.txt"),
            audio_cache_dir: PathBuf::from("local/audio"),
            texts_cache: PathBuf::from("local/texts.json"),
            artwork_cache_dir: PathBuf::from("local/covers"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// How many candidate texts to generate and review.
    pub text_count: usize,
    pub max_words: usize,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            text_count: 3,
            max_words: 40,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Commit message; `{name}` is replaced with the request name.
    pub commit_template: String,
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            commit_template: "Publish {name}".to_string(),
            remote: "origin".to_string(),
        }
    }
}

impl GitConfig {
    pub fn commit_message(&self, name: &str) -> String {
        self.commit_template.replace("{name}", name)
    }
}
