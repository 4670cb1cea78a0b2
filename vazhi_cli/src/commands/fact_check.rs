use crate::cli::Cli;
use crate::commands::{generator, load_config, require_text, spinner, Result};
use crate::output::{format_output, OutputData};
use vazhi_core::pipeline::fact_checker;

pub async fn run(cli: &Cli, statement: &str) -> Result<()> {
    let statement = require_text(statement, "statement")?;
    let config = load_config(cli)?;
    let checker = fact_checker(&config, generator(&config)?)?;

    let spinner = spinner(cli, "Checking statement...".to_string());
    let result = checker.check(statement).await;
    spinner.finish_and_clear();

    format_output(&OutputData::FactCheck(result?), &cli.output)
}
