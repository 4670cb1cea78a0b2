use crate::cli::Cli;
use crate::commands::{generator, load_config, require_text, spinner, Result};
use crate::output::{format_output, OutputData};
use std::sync::Arc;
use vazhi_core::classify::ScriptDetector;
use vazhi_core::pipeline::language_pipeline;

pub async fn run(cli: &Cli, query: &str) -> Result<()> {
    let query = require_text(query, "query")?;
    let config = load_config(cli)?;
    let pipeline = language_pipeline(&config, Arc::new(ScriptDetector), generator(&config)?)?;

    let spinner = spinner(cli, "Detecting language...".to_string());
    let result = pipeline.answer(query).await;
    spinner.finish_and_clear();

    format_output(&OutputData::MultilingualAnswer(result?), &cli.output)
}
