//! Finds the audio for a bundle and backs it up before anything is renamed.
//!
//! Looks for `<incoming>/<name>/` first (multi-asset), then `<incoming>/<name>.<ext>`
//! (single asset). Neither is fine: the run publishes text only.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::PathsConfig;
use crate::error::PublishError;
use crate::model::AudioAsset;

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "ogg"];

pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

fn audio_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetSource {
    Directory(PathBuf),
    SingleFile(PathBuf),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct Discovery {
    pub source: AssetSource,
    /// Where originals were copied, if anything was found.
    pub backup: Option<PathBuf>,
    /// In processing order.
    pub assets: Vec<AudioAsset>,
}

/// Locate, back up and index the assets for `name`. `stamp` makes the backup path unique.
pub fn discover_assets(
    paths: &PathsConfig,
    name: &str,
    stamp: &str,
) -> Result<Discovery, PublishError> {
    let dir = paths.incoming_dir.join(name);
    if dir.is_dir() {
        info!(path = %dir.display(), "[PUBLISH][DISCOVER] Found asset directory");
        return discover_directory(paths, name, stamp, &dir);
    }

    for ext in AUDIO_EXTENSIONS {
        let file = paths.incoming_dir.join(format!("{name}.{ext}"));
        if file.is_file() {
            info!(path = %file.display(), "[PUBLISH][DISCOVER] Found single asset file");
            return discover_single(paths, name, stamp, &file);
        }
    }

    info!(
        incoming = %paths.incoming_dir.display(),
        name,
        "[PUBLISH][DISCOVER] No assets found, continuing text-only"
    );
    Ok(Discovery {
        source: AssetSource::Nothing,
        backup: None,
        assets: Vec::new(),
    })
}

fn discover_directory(
    paths: &PathsConfig,
    name: &str,
    stamp: &str,
    dir: &Path,
) -> Result<Discovery, PublishError> {
    let backup = paths.backup_dir.join(format!("{name}-{stamp}"));
    copy_dir(dir, &backup)?;
    info!(from = %dir.display(), to = %backup.display(), "[PUBLISH][DISCOVER] Backed up asset directory");

    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PublishError::io(dir, e))? {
        let path = entry.map_err(|e| PublishError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        match audio_extension(&path) {
            Some(ext) => files.push((path, ext)),
            None => debug!(path = %path.display(), "[PUBLISH][DISCOVER] Ignoring non-audio file"),
        }
    }
    files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

    let renamed = index_files(dir, name, &files)?;
    let mut assets = Vec::with_capacity(renamed.len());
    for path in renamed {
        assets.push(asset_for(name, &path)?);
    }
    info!(count = assets.len(), "[PUBLISH][DISCOVER] Indexed directory assets");

    Ok(Discovery {
        source: AssetSource::Directory(dir.to_path_buf()),
        backup: Some(backup),
        assets,
    })
}

fn discover_single(
    paths: &PathsConfig,
    name: &str,
    stamp: &str,
    file: &Path,
) -> Result<Discovery, PublishError> {
    fs::create_dir_all(&paths.backup_dir).map_err(|e| PublishError::io(&paths.backup_dir, e))?;
    let ext = audio_extension(file).unwrap_or_default();
    let backup = paths.backup_dir.join(format!("{name}-{stamp}.{ext}"));
    fs::copy(file, &backup).map_err(|e| PublishError::io(&backup, e))?;
    info!(from = %file.display(), to = %backup.display(), "[PUBLISH][DISCOVER] Backed up single asset");

    Ok(Discovery {
        source: AssetSource::SingleFile(file.to_path_buf()),
        backup: Some(backup),
        assets: vec![asset_for(name, file)?],
    })
}

/// Rename `files` to `<name>-<n>.<ext>`, 1-based, in the given order.
/// Goes through temporary names so an existing `<name>-2.wav` is never clobbered.
fn index_files(
    dir: &Path,
    name: &str,
    files: &[(PathBuf, String)],
) -> Result<Vec<PathBuf>, PublishError> {
    let mut staged = Vec::with_capacity(files.len());
    for (i, (path, ext)) in files.iter().enumerate() {
        let tmp = dir.join(format!(".{name}-indexing-{}.{ext}", i + 1));
        fs::rename(path, &tmp).map_err(|e| PublishError::io(path, e))?;
        staged.push((tmp, ext));
    }

    let mut out = Vec::with_capacity(staged.len());
    for (i, (tmp, ext)) in staged.into_iter().enumerate() {
        let target = dir.join(format!("{name}-{}.{ext}", i + 1));
        fs::rename(&tmp, &target).map_err(|e| PublishError::io(&tmp, e))?;
        debug!(path = %target.display(), "[PUBLISH][DISCOVER] Indexed asset");
        out.push(target);
    }
    Ok(out)
}

fn asset_for(name: &str, path: &Path) -> Result<AudioAsset, PublishError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size_bytes = fs::metadata(path)
        .map_err(|e| PublishError::io(path, e))?
        .len();
    let ext = audio_extension(path).unwrap_or_default();
    Ok(AudioAsset {
        storage_path: format!("audio/{name}/{file_name}"),
        file_name,
        local_path: path.to_path_buf(),
        size_bytes,
        content_type: content_type_for(&ext).to_string(),
        duration: None,
        remote_url: None,
        coherency_level: None,
    })
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), PublishError> {
    fs::create_dir_all(to).map_err(|e| PublishError::io(to, e))?;
    for entry in fs::read_dir(from).map_err(|e| PublishError::io(from, e))? {
        let path = entry.map_err(|e| PublishError::io(from, e))?.path();
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = to.join(file_name);
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else if path.is_file() {
            fs::copy(&path, &target).map_err(|e| PublishError::io(&target, e))?;
        } else {
            warn!(path = %path.display(), "[PUBLISH][DISCOVER] Skipping special file in backup");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths(root: &Path) -> PathsConfig {
        PathsConfig {
            incoming_dir: root.join("incoming"),
            backup_dir: root.join("backup"),
            ..PathsConfig::default()
        }
    }

    #[test]
    fn nothing_found_is_not_an_error() {
        let root = tempdir().unwrap();
        let found = discover_assets(&paths(root.path()), "day", "s").unwrap();
        assert_eq!(found.source, AssetSource::Nothing);
        assert!(found.assets.is_empty());
        assert!(found.backup.is_none());
    }

    #[test]
    fn directory_is_backed_up_then_indexed_in_name_order() {
        let root = tempdir().unwrap();
        let p = paths(root.path());
        let dir = p.incoming_dir.join("day");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("b.wav"), b"bbbb").unwrap();
        fs::write(dir.join("a.mp3"), b"aa").unwrap();
        fs::write(dir.join("day-2.wav"), b"already").unwrap();
        fs::write(dir.join("notes.txt"), b"ignore me").unwrap();

        let found = discover_assets(&p, "day", "20240101").unwrap();

        let backup = root.path().join("backup/day-20240101");
        assert_eq!(found.backup.as_deref(), Some(backup.as_path()));
        for original in ["a.mp3", "b.wav", "day-2.wav", "notes.txt"] {
            assert!(backup.join(original).is_file(), "{original} missing from backup");
        }

        let names: Vec<&str> = found.assets.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["day-1.mp3", "day-2.wav", "day-3.wav"]);
        // a.mp3 -> day-1, b.wav -> day-2, old day-2.wav -> day-3
        assert_eq!(fs::read(dir.join("day-2.wav")).unwrap(), b"bbbb");
        assert_eq!(fs::read(dir.join("day-3.wav")).unwrap(), b"already");
        assert!(dir.join("notes.txt").is_file());

        let first = &found.assets[0];
        assert_eq!(first.size_bytes, 2);
        assert_eq!(first.content_type, "audio/mpeg");
        assert_eq!(first.storage_path, "audio/day/day-1.mp3");
        assert!(first.remote_url.is_none());
    }

    #[test]
    fn single_file_is_copied_and_referenced_in_place() {
        let root = tempdir().unwrap();
        let p = paths(root.path());
        fs::create_dir_all(&p.incoming_dir).unwrap();
        let file = p.incoming_dir.join("day.wav");
        fs::write(&file, b"RIFF").unwrap();

        let found = discover_assets(&p, "day", "s1").unwrap();

        assert_eq!(found.source, AssetSource::SingleFile(file.clone()));
        assert!(root.path().join("backup/day-s1.wav").is_file());
        assert_eq!(found.assets.len(), 1);
        assert_eq!(found.assets[0].local_path, file);
        assert_eq!(found.assets[0].file_name, "day.wav");
    }
}
