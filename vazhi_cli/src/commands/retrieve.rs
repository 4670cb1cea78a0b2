use crate::cli::Cli;
use crate::commands::{generator, load_config, require_text, spinner, Result};
use crate::output::{format_output, OutputData};
use vazhi_core::pipeline::topic_pipeline;

/// Classification may still call the generative backend (`--classifier llm`);
/// the answer step never runs.
pub async fn run(cli: &Cli, query: &str) -> Result<()> {
    let query = require_text(query, "query")?;
    let config = load_config(cli)?;
    let pipeline = topic_pipeline(&config, cli.classifier.into(), generator(&config)?)?;

    let spinner = spinner(cli, format!("Retrieving context for '{}'...", query));
    let result = pipeline.retrieve(query).await;
    spinner.finish_and_clear();

    format_output(&OutputData::Retrieval(result), &cli.output)
}
