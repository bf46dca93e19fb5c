/// `load_config` module: reads the optional YAML config and injects store credentials from the environment.
///
/// # Responsibilities
/// - Parse the YAML file into [`PublishConfig`] plus the CLI-only `store` section
/// - Fill every missing key with its default, so an empty file (or no file) is valid
/// - Read `PUBLISH_STORE_URL` and `PUBLISH_STORE_KEY`; secrets never live in YAML
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Result};
use daily_publish_core::config::{GenerationConfig, GitConfig, PathsConfig, PublishConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const STORE_URL_VAR: &str = "PUBLISH_STORE_URL";
pub const STORE_KEY_VAR: &str = "PUBLISH_STORE_KEY";

#[derive(Debug)]
pub struct CliConfig {
    pub publish: PublishConfig,
    pub store: StoreSettings,
}

/// Where and how to reach the storage/database service.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub url: String,
    pub key: String,
    pub bucket: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub bucket: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            bucket: "daily".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    paths: PathsConfig,
    generation: GenerationConfig,
    publish: GitConfig,
    store: StoreSection,
}

/// Load `path` and merge in environment secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    // serde_yaml maps an empty document to unit, not to an empty map.
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(&config_content).map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            anyhow!("Failed to parse config YAML: {e}")
        })?
    };
    info!(config_path = ?path_ref, "Parsed config YAML successfully");

    assemble(raw)
}

/// Defaults for every key, plus environment secrets. Used when no `--config` is given.
pub fn default_config() -> Result<CliConfig> {
    info!("No config file given, using defaults");
    assemble(RawConfig::default())
}

fn assemble(raw: RawConfig) -> Result<CliConfig> {
    let store = StoreSettings {
        url: require_env(STORE_URL_VAR)?
            .trim_end_matches('/')
            .to_string(),
        key: require_env(STORE_KEY_VAR)?,
        bucket: raw.store.bucket,
    };
    let publish = PublishConfig {
        paths: raw.paths,
        generation: raw.generation,
        publish: raw.publish,
    };
    publish.trace_loaded();
    Ok(CliConfig { publish, store })
}

fn require_env(var: &str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => {
            error!(var, "Environment variable is empty");
            Err(anyhow!("{var} is set but empty"))
        }
        Err(e) => {
            error!(error = ?e, var, "Environment variable missing");
            Err(anyhow!("{var} must be set (environment or .env)"))
        }
    }
}
