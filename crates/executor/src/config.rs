use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use super::error::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct SolverConfig {
    /// Retry budget handed to `CycleResolver`.
    pub max_resolve_attempts: usize,
    /// Resolve detected negative cycles and re-run the query.
    pub resolve_cycles: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub graph_path: String,
    pub queries_path: String,
    pub undirected: bool,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    pub buffer_size: usize,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub solver: SolverConfig,
    pub input: InputConfig,
    pub executor: ExecutorConfig,
}

/// Loads configuration from a file and environment variables.
///
/// The file defaults to `crates/executor/Config.toml` under the current
/// directory; `EXECUTOR_CONFIG` points elsewhere. Individual keys are
/// overridden with `EXECUTOR_<SECTION>__<KEY>`, e.g.
/// `EXECUTOR_SOLVER__RESOLVE_CYCLES=false`.
pub fn load_config() -> Result<Config, Error> {
    let config_file_path = match env::var("EXECUTOR_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => env::current_dir()
            .map_err(|e| {
                Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
            })?
            .join("crates")
            .join("executor")
            .join("Config.toml"),
    };

    load_config_from(config_file_path)
}

pub fn load_config_from(config_file_path: PathBuf) -> Result<Config, Error> {
    if !config_file_path.exists() {
        return Err(Error::ConfigLoadError(format!(
            "Configuration file not found at calculated path: {}",
            config_file_path.display()
        )));
    }

    let s = ConfigLoader::builder()
        .add_source(File::from(config_file_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix("EXECUTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    Ok(app_config)
}
