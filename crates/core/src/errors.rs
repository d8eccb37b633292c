use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("transaction table has no transactions")]
    EmptyTable,
    #[error("transaction table has no items")]
    NoItems,
    #[error("row {row} has {actual} values but the table declares {expected} item columns")]
    RowWidthMismatch { row: usize, expected: usize, actual: usize },
    #[error("item `{0}` is not part of the table's item universe")]
    UnknownItem(String),
    #[error("column `{0}` appears more than once")]
    DuplicateColumn(String),
    #[error("malformed indicator table: {0}")]
    MalformedTable(String),
    #[error("malformed flight record {index}: {message}")]
    MalformedRecord { index: usize, message: String },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("min_support must be in (0, 1], got {0}")]
    MinSupportOutOfRange(f64),
    #[error("{metric} threshold must be in {range}, got {value}")]
    ThresholdOutOfRange { metric: &'static str, range: &'static str, value: f64 },
    #[error("max_len must be at least 1")]
    ZeroMaxLen,
    #[error("precision must be at most {max}, got {value}")]
    PrecisionTooLarge { max: u32, value: u32 },
    #[error("unknown rule metric `{0}` (expected support|confidence|lift|leverage|conviction)")]
    UnknownMetric(String),
    #[error("unknown sort order `{0}` (expected asc|desc)")]
    UnknownOrder(String),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MiningError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("frequent itemset invariant violated: subset {subset:?} has no recorded support")]
    MissingSubsetSupport { subset: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Mining(#[from] MiningError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("io failure on `{path}`: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl From<InputError> for ApplicationError {
    fn from(value: InputError) -> Self {
        Self::Mining(MiningError::Input(value))
    }
}

impl From<ParameterError> for ApplicationError {
    fn from(value: ParameterError) -> Self {
        Self::Mining(MiningError::Parameter(value))
    }
}

impl ApplicationError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Mining(MiningError::Input(_)) => "input_error",
            Self::Mining(MiningError::Parameter(_)) => "parameter_error",
            Self::Mining(MiningError::MissingSubsetSupport { .. }) => "invariant_violation",
            Self::Configuration(_) => "config_validation",
            Self::Io { .. } => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Mining(MiningError::Input(_)) => 3,
            Self::Mining(MiningError::Parameter(_)) => 4,
            Self::Io { .. } | Self::Serialization(_) => 5,
            Self::Mining(MiningError::MissingSubsetSupport { .. }) => 6,
        }
    }
}
