use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use delaymine_core::config::{AppConfig, ConfigOverrides, DEFAULT_CONFIG_FILE};
use delaymine_core::errors::ApplicationError;
use toml::Value;

use crate::commands::{load_options, CommandResult};

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(load_options(config_path, ConfigOverrides::default())) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("config", &ApplicationError::from(error)),
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    };

    push(
        "mining.min_support",
        config.mining.min_support.to_string(),
        &["DELAYMINE_MINING_MIN_SUPPORT"],
    );
    push("mining.metric", config.mining.metric.to_string(), &["DELAYMINE_MINING_METRIC"]);
    push(
        "mining.min_threshold",
        config.mining.min_threshold.to_string(),
        &["DELAYMINE_MINING_MIN_THRESHOLD"],
    );
    push(
        "mining.max_len",
        config.mining.max_len.map_or_else(|| "<unset>".to_string(), |value| value.to_string()),
        &["DELAYMINE_MINING_MAX_LEN"],
    );
    push("mining.parallel", config.mining.parallel.to_string(), &["DELAYMINE_MINING_PARALLEL"]);

    push("ranking.sort_by", config.ranking.sort_by.to_string(), &["DELAYMINE_RANKING_SORT_BY"]);
    push(
        "ranking.ascending",
        config.ranking.ascending.to_string(),
        &["DELAYMINE_RANKING_ASCENDING"],
    );
    push(
        "ranking.precision",
        config.ranking.precision.to_string(),
        &["DELAYMINE_RANKING_PRECISION"],
    );

    push(
        "output.rules_path",
        config.output.rules_path.display().to_string(),
        &["DELAYMINE_OUTPUT_RULES_PATH"],
    );
    push(
        "output.display_path",
        config
            .output
            .display_path
            .as_ref()
            .map_or_else(|| "<disabled>".to_string(), |path| path.display().to_string()),
        &["DELAYMINE_OUTPUT_DISPLAY_PATH"],
    );

    push(
        "logging.level",
        config.logging.level.clone(),
        &["DELAYMINE_LOGGING_LEVEL", "DELAYMINE_LOG_LEVEL"],
    );
    push(
        "logging.format",
        format!("{:?}", config.logging.format).to_ascii_lowercase(),
        &["DELAYMINE_LOGGING_FORMAT", "DELAYMINE_LOG_FORMAT"],
    );

    CommandResult::success("config", lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
