use crate::cli::Cli;
use crate::commands::{load_config, Result};
use crate::output::{format_output, OutputData};
use vazhi_core::registry::{language_registry, topic_registry};

/// Builds both registries from the config without touching the network.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let topics = topic_registry(&config)?;
    let languages = language_registry(&config)?;

    let data = OutputData::Bindings {
        default_topic: topics.fallback().to_string(),
        default_language: languages.fallback().to_string(),
        topics: topics.bindings(),
        languages: languages.bindings(),
    };
    format_output(&data, &cli.output)
}
