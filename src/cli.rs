/// CLI glue for `publish`: argument parsing, collaborator wiring and the final summary.
///
/// All pipeline logic lives in [`daily_publish_core`]. This module only:
/// - parses `publish <name> [description] [--config <path>] [--repo <path>]`
/// - loads config and store credentials
/// - wires the real collaborators (REST store, git, stdin prompt, system player, SVG artwork)
/// - prints the completion banner, or hands a fatal error back to `main`
///
/// For programmatic or integration use, call [`run`] with a constructed [`Cli`].
use crate::load_config::{default_config, load_config};
use crate::store::RestStore;
use anyhow::Result;
use chrono::Local;
use clap::{CommandFactory, Parser};
use daily_publish_core::artwork::SvgArtwork;
use daily_publish_core::error::PublishError;
use daily_publish_core::model::PublishRequest;
use daily_publish_core::pipeline::{publish, Outcome, PublishArgs, Services};
use daily_publish_core::player::SystemPlayer;
use daily_publish_core::prompt::StdinPrompt;
use daily_publish_core::vcs::GitCli;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// Exit status for a rejected request name.
pub const EXIT_USAGE: u8 = 2;
/// Exit status for any other fatal error.
pub const EXIT_FAILURE: u8 = 1;

/// CLI for daily-publish: turn a bundle of audio into a published daily document.
#[derive(Debug, Parser)]
#[clap(
    name = "publish",
    version,
    about = "Upload a day's audio, review generated texts, record, render, commit and mirror"
)]
pub struct Cli {
    /// Bundle name; used as slug, git branch and directory name. A leading YYYY-MM-DD sets the date.
    pub name: String,

    /// Free-text description for the document
    pub description: Option<String>,

    /// Path to the YAML config file (defaults apply when omitted)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Git working tree to commit the document in
    #[clap(long, default_value = ".")]
    pub repo: PathBuf,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let today = Local::now().date_naive();
    let description = cli.description.unwrap_or_default();

    // Reject a bad name before touching config, the network or git.
    PublishRequest::new(cli.name.as_str(), description.as_str(), today)?;

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    let store = RestStore::new(&config.store);
    let vcs = GitCli::new(&cli.repo, config.publish.publish.remote.clone());
    let prompt = StdinPrompt::new();
    let player = SystemPlayer::detect();
    let artwork = SvgArtwork;
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = match config.publish.generation.seed {
        Some(seed) => {
            tracing::info!(seed, "Using fixed RNG seed");
            ChaCha8Rng::seed_from_u64(seed)
        }
        None => ChaCha8Rng::from_entropy(),
    };

    tracing::info!(command = "publish", name = %cli.name, "Starting publish run");
    let args = PublishArgs {
        name: cli.name,
        description,
        today,
    };
    match publish(&config.publish, services, args, &mut rng).await {
        Ok(report) => {
            tracing::info!(command = "publish", outcome = %report.outcome(), "Publish complete");
            println!("==== Publish complete ====");
            print!("{}", report.summary());
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "publish", error = %e, "Publish aborted");
            Err(e.into())
        }
    }
}

/// Map a fatal error to its process exit status.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<PublishError>() {
        Some(PublishError::Validation(_)) => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

/// Print a fatal error the way the operator should see it, and return the exit status.
pub fn report_failure(error: &anyhow::Error) -> u8 {
    let code = exit_code(error);
    eprintln!("[ERROR] {error:#}");
    eprintln!("==== Publish {} ====", Outcome::Aborted);
    if code == EXIT_USAGE {
        eprintln!("{}", Cli::command().render_usage());
    }
    code
}
