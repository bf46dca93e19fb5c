//! Command-line audio playback for the review step.

use std::env;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::contract::AudioPlayer;
use crate::error::PlayerError;

/// Known players, in order of preference, with the flags that make them exit when done.
const CANDIDATES: &[(&str, &[&str])] = &[
    ("afplay", &[]),
    ("paplay", &[]),
    ("aplay", &["-q"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("mpv", &["--no-video", "--really-quiet"]),
];

/// Plays files with the first known player found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemPlayer {
    detected: Option<(PathBuf, Vec<String>)>,
}

impl SystemPlayer {
    pub fn detect() -> Self {
        let search_path = env::var_os("PATH").unwrap_or_default();
        let dirs: Vec<PathBuf> = env::split_paths(&search_path).collect();
        Self::detect_in(&dirs)
    }

    /// Detect a player in the given directories only.
    pub fn detect_in(dirs: &[PathBuf]) -> Self {
        for (name, args) in CANDIDATES {
            if let Some(found) = dirs.iter().map(|d| d.join(name)).find(|p| p.is_file()) {
                info!(player = %found.display(), "Detected audio player");
                return Self {
                    detected: Some((found, args.iter().map(|a| a.to_string()).collect())),
                };
            }
        }
        debug!("No audio player detected on PATH");
        Self { detected: None }
    }

    pub fn program(&self) -> Option<&Path> {
        self.detected.as_ref().map(|(p, _)| p.as_path())
    }
}

#[async_trait]
impl AudioPlayer for SystemPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlayerError> {
        let (program, args) = self.detected.as_ref().ok_or_else(|| {
            PlayerError::NotFound(
                CANDIDATES
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        })?;
        let player = program.display().to_string();
        let status = Command::new(program)
            .args(args)
            .arg(path)
            .status()
            .await
            .map_err(|e| PlayerError::Failed {
                player: player.clone(),
                message: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(PlayerError::Failed {
                player,
                message: format!("exited with {status}"),
            })
        }
    }
}
