//! Fills the content template and writes `<content>/<name>/<name>.md`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::PublishError;
use crate::model::{AudioAsset, GeneratedText, PublishRequest};

/// Used when the configured template file does not exist.
pub const DEFAULT_TEMPLATE: &str = "---
title: \"{name}\"
date: {date}
daily_id: {daily_id}
cover: \"{cover_art}\"
---

{description}

## Audio

{audio_files}

## Words

{markov_text}
";

/// Everything the template can reference.
#[derive(Debug, Clone, Copy)]
pub struct DocumentInputs<'a> {
    pub request: &'a PublishRequest,
    pub assets: &'a [AudioAsset],
    pub texts: &'a [GeneratedText],
    pub cover_art_url: Option<&'a str>,
    pub daily_id: Option<i64>,
}

fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Markdown list of uploaded assets. Assets without a remote URL are left out.
fn audio_list(assets: &[AudioAsset]) -> String {
    assets
        .iter()
        .filter_map(|a| {
            let url = a.remote_url.as_deref()?;
            Some(match a.duration {
                Some(secs) => format!("- [{}]({}) ({})", a.file_name, url, format_duration(secs)),
                None => format!("- [{}]({})", a.file_name, url),
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render(template: &str, inputs: &DocumentInputs<'_>) -> String {
    let texts = inputs
        .texts
        .iter()
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let daily_id = inputs.daily_id.map(|id| id.to_string()).unwrap_or_default();

    template
        .replace("{name}", &inputs.request.name)
        .replace("{date}", &inputs.request.date.format("%Y-%m-%d").to_string())
        .replace("{description}", &inputs.request.description)
        .replace("{audio_files}", &audio_list(inputs.assets))
        .replace("{cover_art}", inputs.cover_art_url.unwrap_or(""))
        .replace("{daily_id}", &daily_id)
        .replace("{markov_text}", &texts)
}

/// Load the template, falling back to [`DEFAULT_TEMPLATE`] when the file is missing.
pub fn load_template(path: &Path) -> Result<String, PublishError> {
    match fs::read_to_string(path) {
        Ok(t) => Ok(t),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "[PUBLISH][RENDER] Template missing, using built-in default");
            Ok(DEFAULT_TEMPLATE.to_string())
        }
        Err(e) => Err(PublishError::io(path, e)),
    }
}

pub fn document_path(content_dir: &Path, name: &str) -> PathBuf {
    content_dir.join(name).join(format!("{name}.md"))
}

/// Render and write the document; returns where it was written.
pub fn write_document(
    template_path: &Path,
    content_dir: &Path,
    inputs: &DocumentInputs<'_>,
) -> Result<PathBuf, PublishError> {
    let template = load_template(template_path)?;
    let body = render(&template, inputs);
    let out = document_path(content_dir, &inputs.request.name);
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e))?;
    }
    fs::write(&out, body).map_err(|e| PublishError::io(&out, e))?;
    info!(path = %out.display(), "[PUBLISH][RENDER] Wrote content document");
    Ok(out)
}
