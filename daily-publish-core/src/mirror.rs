//! Best-effort copy of a run's output into the local development cache.
//!
//! Every function here reports failure as [`MirrorError`] with a hint for doing the
//! step by hand. None of them can change the outcome of a run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::RemoteStore;
use crate::error::MirrorError;
use crate::model::{AudioAsset, GeneratedText};

/// One entry of the local texts JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirroredText {
    pub id: u64,
    pub daily_name: String,
    pub daily_id: Option<i64>,
    pub content: String,
    pub coherency_level: u8,
    pub length: usize,
}

/// Download each uploaded asset back into `<cache_dir>/<name>/<file>`.
/// Assets that never reached the store are skipped.
pub async fn mirror_audio(
    store: &dyn RemoteStore,
    cache_dir: &Path,
    name: &str,
    assets: &[AudioAsset],
) -> Vec<Result<PathBuf, MirrorError>> {
    let mut results = Vec::new();
    for asset in assets.iter().filter(|a| a.remote_url.is_some()) {
        let target = cache_dir.join(name).join(&asset.file_name);
        let hint = format!(
            "download {} from the store to {}",
            asset.storage_path,
            target.display()
        );
        let result = async {
            let bytes = store
                .download_blob(&asset.storage_path)
                .await
                .map_err(|e| e.to_string())?;
            write_file(&target, &bytes).map_err(|e| e.to_string())?;
            debug!(path = %target.display(), size = bytes.len(), "[PUBLISH][MIRROR] Mirrored audio");
            Ok::<_, String>(target.clone())
        }
        .await
        .map_err(|message| MirrorError {
            target: asset.file_name.clone(),
            message,
            hint,
        });
        results.push(result);
    }
    results
}

/// Append `texts` to the JSON array at `path`, numbering them after the highest existing id.
/// Returns the ids assigned. An unreadable existing file is left untouched.
pub fn append_texts(
    path: &Path,
    daily_name: &str,
    daily_id: Option<i64>,
    texts: &[GeneratedText],
) -> Result<Vec<u64>, MirrorError> {
    let fail = |message: String| MirrorError {
        target: path.display().to_string(),
        message,
        hint: format!("append the {} text(s) of {daily_name} to the file by hand", texts.len()),
    };

    let mut entries: Vec<MirroredText> = match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Vec::new(),
        Ok(raw) => serde_json::from_str(&raw).map_err(|e| fail(format!("existing file is not a text list: {e}")))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(fail(e.to_string())),
    };

    let mut next_id = entries.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    let mut assigned = Vec::with_capacity(texts.len());
    for text in texts {
        entries.push(MirroredText {
            id: next_id,
            daily_name: daily_name.to_string(),
            daily_id,
            content: text.content.clone(),
            coherency_level: text.coherency_level,
            length: text.length,
        });
        assigned.push(next_id);
        next_id += 1;
    }

    let json = serde_json::to_vec_pretty(&entries).map_err(|e| fail(e.to_string()))?;
    // Write beside the target and rename, so a crash never leaves half a file.
    let tmp = path.with_extension("json.tmp");
    write_file(&tmp, &json).map_err(|e| fail(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| fail(e.to_string()))?;
    info!(path = %path.display(), ids = ?assigned, "[PUBLISH][MIRROR] Appended texts");
    Ok(assigned)
}

/// Download the cover from `storage_path` into `<dir>/<sanitized>.<extension>`.
pub async fn mirror_cover(
    store: &dyn RemoteStore,
    dir: &Path,
    sanitized_name: &str,
    storage_path: &str,
    extension: &str,
) -> Result<PathBuf, MirrorError> {
    let target = dir.join(format!("{sanitized_name}.{extension}"));
    let fail = |message: String| MirrorError {
        target: target.display().to_string(),
        message,
        hint: format!("download {storage_path} from the store to {}", target.display()),
    };
    let bytes = store
        .download_blob(storage_path)
        .await
        .map_err(|e| fail(e.to_string()))?;
    write_file(&target, &bytes).map_err(|e| fail(e.to_string()))?;
    info!(path = %target.display(), "[PUBLISH][MIRROR] Mirrored cover art");
    Ok(target)
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}
