pub mod config;
pub mod errors;
pub mod features;
pub mod io;
pub mod mining;
pub mod pipeline;
pub mod rules;
pub mod table;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{ApplicationError, InputError, MiningError, ParameterError};
pub use features::{FeatureExtractor, FlightFeatures, FlightRecord, IndicatorTable};
pub use mining::{AprioriMiner, FrequentItemset, FrequentItemsets, ItemsetMiner, MinerSettings};
pub use pipeline::{MiningPipeline, MiningReport, PipelineSettings};
pub use rules::{
    AssociationRule, DisplayLabels, RankingSettings, RuleFilter, RuleGenerator, RuleMetric,
    RuleMetrics, RuleRanker, RuleRecord,
};
pub use table::{ItemId, ItemUniverse, TransactionTable};
