use crate::cli::{Cli, ConfigAction};
use crate::commands::{config_store, CommandError, Result};
use crate::output::{format_output, OutputData};
use owo_colors::OwoColorize;
use vazhi_core::config::RouterConfig;

pub async fn run(cli: &Cli, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => {
            println!("{}", config_store(cli).path().display());
            Ok(())
        }
        ConfigAction::Init { force } => init_config(cli, force),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let store = config_store(cli);
    let config = store.load()?;
    let data = OutputData::ConfigInfo {
        path: store.path().display().to_string(),
        exists: store.exists(),
        config,
    };
    format_output(&data, &cli.output)
}

fn init_config(cli: &Cli, force: bool) -> Result<()> {
    let store = config_store(cli);
    if store.exists() && !force {
        return Err(CommandError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        )));
    }
    store.save(&RouterConfig::default())?;
    println!(
        "{} Wrote default configuration to {}",
        "✓".green().bold(),
        store.path().display().cyan()
    );
    Ok(())
}
