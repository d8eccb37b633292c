use std::path::{Path, PathBuf};

use clap::Args;
use delaymine_core::config::{AppConfig, ConfigOverrides};
use delaymine_core::errors::{ApplicationError, ParameterError};
use delaymine_core::features::FeatureExtractor;
use delaymine_core::io;
use delaymine_core::pipeline::{MiningPipeline, MiningReport, PipelineSettings};
use delaymine_core::rules::{DisplayLabels, RuleMetric};
use delaymine_core::table::TransactionTable;
use serde::Serialize;

use crate::commands::{load_options, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct MineArgs {
    #[arg(long, help = "Flight records (file or directory), or an indicator table with --table")]
    pub input: PathBuf,
    #[arg(long, help = "Treat --input as an indicator table written by `extract`")]
    pub table: bool,
    #[arg(long, help = "Minimum itemset support in (0, 1]")]
    pub min_support: Option<f64>,
    #[arg(long, help = "Minimum value of --metric for a rule to be kept")]
    pub min_threshold: Option<f64>,
    #[arg(long, help = "Rule filter metric: support|confidence|lift|leverage|conviction")]
    pub metric: Option<String>,
    #[arg(long, help = "Largest itemset size to search")]
    pub max_len: Option<usize>,
    #[arg(long, help = "Metric rules are ordered by")]
    pub sort_by: Option<String>,
    #[arg(long, help = "Rule order, asc|desc; defaults to the configured direction")]
    pub order: Option<String>,
    #[arg(long, help = "Keep only the first N ranked rules")]
    pub top: Option<usize>,
    #[arg(long, help = "Path for rules with raw field names (JSON Lines)")]
    pub rules_output: Option<PathBuf>,
    #[arg(long, help = "Path for display-labelled rules; empty disables")]
    pub display_output: Option<String>,
}

impl MineArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rules_path: self.rules_output.clone(),
            display_path: self.display_output.clone(),
            log_level: None,
        }
    }

    /// Flags win over configuration. They are checked by the pipeline, not by
    /// config validation, so a bad flag is a parameter error.
    fn apply(&self, settings: &mut PipelineSettings) -> Result<(), ParameterError> {
        if let Some(min_support) = self.min_support {
            settings.miner.min_support = min_support;
        }
        if let Some(metric) = &self.metric {
            settings.filter.metric = metric.parse::<RuleMetric>()?;
        }
        if let Some(min_threshold) = self.min_threshold {
            settings.filter.min_threshold = min_threshold;
        }
        if let Some(max_len) = self.max_len {
            settings.miner.max_len = Some(max_len);
        }
        if let Some(sort_by) = &self.sort_by {
            settings.ranking.sort_by = sort_by.parse::<RuleMetric>()?;
        }
        if let Some(order) = &self.order {
            settings.ranking.ascending = parse_ascending(order)?;
        }
        settings.ranking.limit = self.top;
        Ok(())
    }
}

fn parse_ascending(order: &str) -> Result<bool, ParameterError> {
    match order.trim().to_ascii_lowercase().as_str() {
        "asc" | "ascending" => Ok(true),
        "desc" | "descending" => Ok(false),
        other => Err(ParameterError::UnknownOrder(other.to_owned())),
    }
}

#[derive(Debug, Serialize)]
struct MineSummary {
    transactions: usize,
    items: usize,
    frequent_itemsets: usize,
    rules: usize,
    rules_path: String,
    display_path: Option<String>,
    levels: Vec<delaymine_core::pipeline::LevelSummary>,
}

pub fn run(args: &MineArgs, config_path: Option<&Path>) -> CommandResult {
    match execute(args, config_path) {
        Ok(summary) => {
            let message = format!("mined {} rules into {}", summary.rules, summary.rules_path);
            let data = serde_json::to_value(&summary).ok();
            CommandResult::success_with_data("mine", message, data)
        }
        Err(error) => CommandResult::from_error("mine", &error),
    }
}

fn execute(args: &MineArgs, config_path: Option<&Path>) -> Result<MineSummary, ApplicationError> {
    let config = AppConfig::load(load_options(config_path, args.overrides()))?;
    let mut settings = config.pipeline_settings();
    args.apply(&mut settings)?;

    let table = load_table(args)?;
    let report = MiningPipeline::new(settings).run(&table)?;
    write_outputs(&config, &report)?;

    Ok(MineSummary {
        transactions: report.transactions,
        items: report.items,
        frequent_itemsets: report.frequent_itemsets,
        rules: report.rules.len(),
        rules_path: config.output.rules_path.display().to_string(),
        display_path: config.output.display_path.as_ref().map(|path| path.display().to_string()),
        levels: report.levels,
    })
}

fn load_table(args: &MineArgs) -> Result<TransactionTable, ApplicationError> {
    if args.table {
        let indicator = io::read_indicator_table(&args.input)?;
        return Ok(indicator.to_transaction_table()?);
    }

    let flights = io::read_flights(&args.input)?;
    Ok(FeatureExtractor::new().transactions(&flights)?)
}

fn write_outputs(config: &AppConfig, report: &MiningReport) -> Result<(), ApplicationError> {
    io::write_rules_file(&config.output.rules_path, &report.rules, None)?;
    if let Some(display_path) = &config.output.display_path {
        io::write_rules_file(display_path, &report.rules, Some(&DisplayLabels::business()))?;
    }
    Ok(())
}
