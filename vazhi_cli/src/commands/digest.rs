use crate::cli::Cli;
use crate::commands::{generator, load_config, require_text, spinner, Result};
use crate::output::{format_output, OutputData};
use vazhi_core::pipeline::digest_pipeline;

pub async fn run(cli: &Cli, topic: &str) -> Result<()> {
    let topic = require_text(topic, "topic")?;
    let config = load_config(cli)?;
    let digest = digest_pipeline(&config, generator(&config)?)?;

    let spinner = spinner(cli, format!("Collecting news and background on '{}'...", topic));
    let result = digest.summarize(topic).await;
    spinner.finish_and_clear();

    format_output(&OutputData::Digest(result?), &cli.output)
}
