use crate::cli::Cli;
use crate::commands::{generator, load_config, require_text, spinner, CommandError, Result};
use crate::output::{format_output, OutputData};
use vazhi_core::pipeline::paper_summarizer;

pub async fn run(cli: &Cli, query: &str, count: Option<usize>) -> Result<()> {
    let query = require_text(query, "query")?;
    let mut config = load_config(cli)?;
    if let Some(count) = count {
        if count == 0 {
            return Err(CommandError::InvalidInput(
                "--count must be at least 1".to_string(),
            ));
        }
        config.paper_count = count;
    }
    let summarizer = paper_summarizer(&config, generator(&config)?)?;

    let spinner = spinner(
        cli,
        format!("Summarising {} papers for '{}'...", config.paper_count, query),
    );
    let result = summarizer.summarize(query).await;
    spinner.finish_and_clear();

    format_output(&OutputData::Papers(result?), &cli.output)
}
