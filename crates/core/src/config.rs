use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mining::{MinerSettings, DEFAULT_MIN_SUPPORT};
use crate::pipeline::PipelineSettings;
use crate::rules::{
    RankingSettings, RuleFilter, RuleMetric, DEFAULT_FILTER_METRIC, DEFAULT_MIN_THRESHOLD,
    DEFAULT_PRECISION, DEFAULT_SORT_METRIC,
};

pub const DEFAULT_CONFIG_FILE: &str = "delaymine.toml";
pub const DEFAULT_RULES_PATH: &str = "association_rules.json";
pub const DEFAULT_DISPLAY_PATH: &str = "association_rules_display.json";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub mining: MiningConfig,
    pub ranking: RankingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MiningConfig {
    pub min_support: f64,
    pub metric: RuleMetric,
    pub min_threshold: f64,
    pub max_len: Option<usize>,
    pub parallel: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankingConfig {
    pub sort_by: RuleMetric,
    pub ascending: bool,
    pub precision: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputConfig {
    pub rules_path: PathBuf,
    /// Empty disables the display-labelled copy.
    pub display_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Values supplied on the command line. They win over every other source.
/// Mining parameters given as flags are applied to [`PipelineSettings`]
/// instead, so that a bad flag surfaces as a parameter error.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub rules_path: Option<PathBuf>,
    pub display_path: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid delaymine TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("`${{{var}}}` refers to an unset environment variable")]
    MissingEnvInterpolation { var: String },
    #[error("`${{` is never closed with `}}`")]
    UnterminatedInterpolation,
    #[error("{key}=`{value}` cannot be parsed")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mining: MiningConfig {
                min_support: DEFAULT_MIN_SUPPORT,
                metric: DEFAULT_FILTER_METRIC,
                min_threshold: DEFAULT_MIN_THRESHOLD,
                max_len: None,
                parallel: true,
            },
            ranking: RankingConfig {
                sort_by: DEFAULT_SORT_METRIC,
                ascending: false,
                precision: DEFAULT_PRECISION,
            },
            output: OutputConfig {
                rules_path: PathBuf::from(DEFAULT_RULES_PATH),
                display_path: Some(PathBuf::from(DEFAULT_DISPLAY_PATH)),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let format = match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            other => {
                return Err(ConfigError::Validation(format!(
                    "logging.format `{other}` is not one of compact|pretty|json"
                )))
            }
        };
        Ok(format)
    }
}

impl AppConfig {
    /// Layers defaults, the config file, `DELAYMINE_*` variables and
    /// `options.overrides`, then validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let LoadOptions { config_path, require_file, overrides } = options;
        let mut config = Self::default();

        match resolve_config_path(config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if require_file => {
                return Err(ConfigError::MissingConfigFile(
                    config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
                ))
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Settings for one pipeline run. `limit` is left unset.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            miner: MinerSettings {
                min_support: self.mining.min_support,
                max_len: self.mining.max_len,
                parallel: self.mining.parallel,
            },
            filter: RuleFilter {
                metric: self.mining.metric,
                min_threshold: self.mining.min_threshold,
            },
            ranking: RankingSettings {
                sort_by: self.ranking.sort_by,
                ascending: self.ranking.ascending,
                precision: self.ranking.precision,
                limit: None,
            },
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(mining) = patch.mining {
            if let Some(min_support) = mining.min_support {
                self.mining.min_support = min_support;
            }
            if let Some(metric) = mining.metric {
                self.mining.metric = metric;
            }
            if let Some(min_threshold) = mining.min_threshold {
                self.mining.min_threshold = min_threshold;
            }
            if let Some(max_len) = mining.max_len {
                self.mining.max_len = Some(max_len);
            }
            if let Some(parallel) = mining.parallel {
                self.mining.parallel = parallel;
            }
        }

        if let Some(ranking) = patch.ranking {
            if let Some(sort_by) = ranking.sort_by {
                self.ranking.sort_by = sort_by;
            }
            if let Some(ascending) = ranking.ascending {
                self.ranking.ascending = ascending;
            }
            if let Some(precision) = ranking.precision {
                self.ranking.precision = precision;
            }
        }

        if let Some(output) = patch.output {
            if let Some(rules_path) = output.rules_path {
                self.output.rules_path = PathBuf::from(rules_path);
            }
            if let Some(display_path) = output.display_path {
                self.output.display_path = optional_path(display_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DELAYMINE_MINING_MIN_SUPPORT") {
            self.mining.min_support = parse_env("DELAYMINE_MINING_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("DELAYMINE_MINING_METRIC") {
            self.mining.metric = parse_env("DELAYMINE_MINING_METRIC", &value)?;
        }
        if let Some(value) = read_env("DELAYMINE_MINING_MIN_THRESHOLD") {
            self.mining.min_threshold = parse_env("DELAYMINE_MINING_MIN_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("DELAYMINE_MINING_MAX_LEN") {
            self.mining.max_len = Some(parse_env("DELAYMINE_MINING_MAX_LEN", &value)?);
        }
        if let Some(value) = read_env("DELAYMINE_MINING_PARALLEL") {
            self.mining.parallel = parse_env("DELAYMINE_MINING_PARALLEL", &value)?;
        }

        if let Some(value) = read_env("DELAYMINE_RANKING_SORT_BY") {
            self.ranking.sort_by = parse_env("DELAYMINE_RANKING_SORT_BY", &value)?;
        }
        if let Some(value) = read_env("DELAYMINE_RANKING_ASCENDING") {
            self.ranking.ascending = parse_env("DELAYMINE_RANKING_ASCENDING", &value)?;
        }
        if let Some(value) = read_env("DELAYMINE_RANKING_PRECISION") {
            self.ranking.precision = parse_env("DELAYMINE_RANKING_PRECISION", &value)?;
        }

        if let Some(value) = read_env("DELAYMINE_OUTPUT_RULES_PATH") {
            self.output.rules_path = PathBuf::from(value);
        }
        // An empty value is meaningful here, so the raw variable is read.
        if let Ok(value) = env::var("DELAYMINE_OUTPUT_DISPLAY_PATH") {
            self.output.display_path = optional_path(value);
        }

        let log_level =
            read_env("DELAYMINE_LOGGING_LEVEL").or_else(|| read_env("DELAYMINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DELAYMINE_LOGGING_FORMAT").or_else(|| read_env("DELAYMINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(rules_path) = overrides.rules_path {
            self.output.rules_path = rules_path;
        }
        if let Some(display_path) = overrides.display_path {
            self.output.display_path = optional_path(display_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_mining(&self.mining)?;
        validate_ranking(&self.ranking)?;
        validate_output(&self.output)?;
        validate_log_level(&self.logging.level)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.into(), source })?;
    toml::from_str(&interpolate_env_vars(&text)?)
        .map_err(|source| ConfigError::ParseFile { path: path.into(), source })
}

/// Replaces every `${NAME}` with the value of the environment variable NAME.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after_open[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_owned() })?;
        output.push_str(&value);
        rest = &after_open[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn optional_path(value: String) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn validate_mining(mining: &MiningConfig) -> Result<(), ConfigError> {
    if !(mining.min_support > 0.0 && mining.min_support <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "mining.min_support must be in range (0, 1], got {}",
            mining.min_support
        )));
    }

    mining
        .metric
        .validate_threshold(mining.min_threshold)
        .map_err(|error| ConfigError::Validation(format!("mining.min_threshold: {error}")))?;

    if mining.max_len == Some(0) {
        return Err(ConfigError::Validation(
            "mining.max_len must be greater than zero when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_ranking(ranking: &RankingConfig) -> Result<(), ConfigError> {
    let settings = RankingSettings {
        sort_by: ranking.sort_by,
        ascending: ranking.ascending,
        precision: ranking.precision,
        limit: None,
    };
    settings
        .validate()
        .map_err(|error| ConfigError::Validation(format!("ranking.precision: {error}")))
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.rules_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("output.rules_path must not be empty".to_string()));
    }

    if output.display_path.as_deref() == Some(output.rules_path.as_path()) {
        return Err(ConfigError::Validation(
            "output.display_path must differ from output.rules_path".to_string(),
        ));
    }

    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), ConfigError> {
    if LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str()) {
        return Ok(());
    }
    Err(ConfigError::Validation(format!(
        "logging.level `{level}` is not one of {}",
        LOG_LEVELS.join("|")
    )))
}

/// Unset and blank variables both count as absent.
fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    mining: Option<MiningPatch>,
    ranking: Option<RankingPatch>,
    output: Option<OutputPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MiningPatch {
    min_support: Option<f64>,
    metric: Option<RuleMetric>,
    min_threshold: Option<f64>,
    max_len: Option<usize>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    sort_by: Option<RuleMetric>,
    ascending: Option<bool>,
    precision: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputPatch {
    rules_path: Option<String>,
    display_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
