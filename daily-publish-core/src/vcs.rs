use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::contract::VersionControl;
use crate::error::VcsError;

/// Drives the `git` binary inside a working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: remote.into(),
        }
    }

    /// Run `git -C <workdir> <args>`; returns whether it exited successfully.
    async fn git(&self, args: &[&str]) -> Result<bool, VcsError> {
        let command = args.join(" ");
        let status = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .status()
            .await;

        match status {
            Ok(s) => {
                tracing::debug!(
                    command = %command,
                    path = %self.workdir.display(),
                    status = ?s,
                    "git finished"
                );
                Ok(s.success())
            }
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    command = %command,
                    path = %self.workdir.display(),
                    "Failed to launch git process"
                );
                Err(VcsError::Launch { command, source: e })
            }
        }
    }

    async fn git_checked(&self, args: &[&str]) -> Result<(), VcsError> {
        if self.git(args).await? {
            Ok(())
        } else {
            let command = args.join(" ");
            tracing::error!(
                command = %command,
                path = %self.workdir.display(),
                "git exited with non-zero code"
            );
            Err(VcsError::Exit {
                command,
                status: "non-zero exit".to_string(),
            })
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn checkout_or_create_branch(&self, branch: &str) -> Result<(), VcsError> {
        let reference = format!("refs/heads/{branch}");
        let exists = self
            .git(&["rev-parse", "--verify", "--quiet", &reference])
            .await?;
        if exists {
            self.git_checked(&["checkout", branch]).await?;
            tracing::info!(branch, "Checked out existing branch");
        } else {
            self.git_checked(&["checkout", "-b", branch]).await?;
            tracing::info!(branch, "Created and checked out new branch");
        }
        Ok(())
    }

    async fn commit_all(&self, message: &str) -> Result<(), VcsError> {
        self.git_checked(&["add", "-A"]).await?;
        self.git_checked(&["commit", "-m", message]).await?;
        tracing::info!(message, "Committed all changes");
        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<(), VcsError> {
        self.git_checked(&["push", "-u", &self.remote, branch]).await?;
        tracing::info!(remote = %self.remote, branch, "Pushed branch");
        Ok(())
    }
}
