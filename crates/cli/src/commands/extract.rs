use std::path::{Path, PathBuf};

use clap::Args;
use delaymine_core::config::{AppConfig, ConfigOverrides};
use delaymine_core::errors::ApplicationError;
use delaymine_core::features::{FeatureExtractor, IndicatorTable};
use delaymine_core::io;
use serde_json::json;

use crate::commands::{load_options, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    #[arg(long, help = "Flight records (JSON array, JSON Lines or one object) or a directory of them")]
    pub input: PathBuf,
    #[arg(long, help = "Where to write the indicator table (JSON)")]
    pub output: PathBuf,
}

pub fn run(args: &ExtractArgs, config_path: Option<&Path>) -> CommandResult {
    if let Err(error) = AppConfig::load(load_options(config_path, ConfigOverrides::default())) {
        return CommandResult::from_error("extract", &ApplicationError::from(error));
    }

    match execute(args) {
        Ok(table) => CommandResult::success_with_data(
            "extract",
            format!("wrote indicator table to {}", args.output.display()),
            Some(json!({
                "flights": table.rows.len(),
                "columns": table.column_count(),
                "output": args.output.display().to_string(),
            })),
        ),
        Err(error) => CommandResult::from_error("extract", &error),
    }
}

fn execute(args: &ExtractArgs) -> Result<IndicatorTable, ApplicationError> {
    let flights = io::read_flights(&args.input)?;
    let table = FeatureExtractor::new().indicator_table(&flights)?;
    io::write_indicator_table(&args.output, &table)?;
    Ok(table)
}
