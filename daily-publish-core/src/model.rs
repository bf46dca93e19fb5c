//! Values that flow through a run.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::PublishError;

/// What the operator asked to publish. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    /// Slug; doubles as branch name and directory name.
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
}

impl PublishRequest {
    /// Validate the name and derive the date from it.
    ///
    /// A name starting with `YYYY-MM-DD` takes that date, anything else takes `today`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        today: NaiveDate,
    ) -> Result<Self, PublishError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PublishError::Validation(
                "a non-empty name is required".to_string(),
            ));
        }
        if trimmed.contains(|c: char| c == '/' || c == '\\') || trimmed == "." || trimmed == ".." {
            return Err(PublishError::Validation(format!(
                "name {trimmed:?} must be usable as a directory and branch name"
            )));
        }
        let date = date_from_name(trimmed).unwrap_or(today);
        Ok(Self {
            name: trimmed.to_string(),
            description: description.into(),
            date,
        })
    }
}

fn date_prefix() -> Option<&'static Regex> {
    static DATE_PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    DATE_PREFIX
        .get_or_init(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})").ok())
        .as_ref()
}

fn date_from_name(name: &str) -> Option<NaiveDate> {
    let captured = date_prefix()?.captures(name)?.get(1)?.as_str();
    NaiveDate::parse_from_str(captured, "%Y-%m-%d").ok()
}

/// An audio file found on disk. `duration`, `remote_url` and `coherency_level`
/// are filled in by later stages.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    pub file_name: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
    pub content_type: String,
    pub duration: Option<u32>,
    pub storage_path: String,
    /// Set only once the upload has fully succeeded.
    pub remote_url: Option<String>,
    pub coherency_level: Option<u8>,
}

/// A reviewed text. Only constructed once a rating exists.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedText {
    pub content: String,
    /// 1..=100
    pub coherency_level: u8,
    /// Word count of `content`.
    pub length: usize,
}

impl GeneratedText {
    pub fn new(content: String, coherency_level: u8) -> Self {
        let length = content.split_whitespace().count();
        Self {
            content,
            coherency_level,
            length,
        }
    }
}

/// Lowercase, `[a-z0-9-]` only, no leading/trailing or doubled dashes.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
