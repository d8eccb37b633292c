pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use delaymine_core::config::{AppConfig, LogFormat, LoggingConfig};

use crate::commands::extract::ExtractArgs;
use crate::commands::mine::MineArgs;

#[derive(Debug, Parser)]
#[command(
    name = "delaymine",
    about = "Flight delay association rule miner",
    long_about = "Turn flight records into categorical transactions, mine frequent itemsets and rank the association rules between them.",
    after_help = "Examples:\n  delaymine extract --input flights.jsonl --output table.json\n  delaymine mine --input table.json --table --sort-by lift --top 20\n  delaymine config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load (must exist when given)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Convert flight records into a one-hot indicator table")]
    Extract(ExtractArgs),
    #[command(about = "Mine, filter and rank association rules and write them as JSON Lines")]
    Mine(MineArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Commands report their own configuration errors; logging falls back to
    // defaults when the config does not load.
    let logging = AppConfig::load(commands::load_options(config_path, Default::default()))
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    if let Err(error) = init_logging(&logging) {
        eprintln!("{error:#}");
    }

    let result = match &cli.command {
        Command::Extract(args) => commands::extract::run(args, config_path),
        Command::Mine(args) => commands::mine::run(args, config_path),
        Command::Config => commands::config::run(config_path),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries the command outcome only.
pub fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!("failed to initialize logging: {error}"))
}
