pub mod ask;
pub mod bindings;
pub mod config;
pub mod digest;
pub mod fact_check;
pub mod multilingual;
pub mod papers;
pub mod retrieve;

use crate::cli::{Cli, OutputFormat};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use vazhi_core::config::{ConfigStore, RouterConfig};
use vazhi_core::generate::OpenAiGenerator;
use vazhi_core::{ConfigError, GenerationError, GeneratorHandle, PipelineError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generator setup failed: {0}")]
    Generator(#[from] GenerationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

pub fn config_store(cli: &Cli) -> ConfigStore {
    match &cli.config {
        Some(path) => ConfigStore::new(path.clone()),
        None => ConfigStore::new_default(),
    }
}

/// Effective configuration; a missing file yields the defaults.
pub fn load_config(cli: &Cli) -> Result<RouterConfig> {
    let store = config_store(cli);
    let config = store.load()?;
    tracing::debug!(path = %store.path().display(), exists = store.exists(), "Config loaded");
    Ok(config)
}

pub fn generator(config: &RouterConfig) -> Result<GeneratorHandle> {
    Ok(Arc::new(OpenAiGenerator::from_config(
        &config.generator,
        config.timeout_ms,
    )?))
}

/// Rejects blank positional text before any backend is built.
pub fn require_text<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed)
}

/// Spinner on stderr for pretty output; hidden for machine formats.
pub fn spinner(cli: &Cli, message: String) -> ProgressBar {
    if cli.output != OutputFormat::Pretty {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("  rust  ", "query").unwrap(), "rust");
        let err = require_text("   ", "query").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: query must not be empty");
    }
}
