//! Association rule derivation, ranking and presentation.

mod display;
mod generator;
mod metrics;
mod ranker;

pub use display::{DisplayLabels, DisplayRecord, RULE_FIELDS};
pub use generator::{AssociationRule, RuleFilter, RuleGenerator};
pub use metrics::{round_half_away, serialize_metric, RuleMetric, RuleMetrics, INFINITY_TOKEN};
pub use ranker::{RankingSettings, RuleRanker, RuleRecord};

/// Metric a rule must meet to be admitted.
pub const DEFAULT_FILTER_METRIC: RuleMetric = RuleMetric::Confidence;

pub const DEFAULT_MIN_THRESHOLD: f64 = 0.1;

/// Metric rules are ordered by when the caller does not choose one.
pub const DEFAULT_SORT_METRIC: RuleMetric = RuleMetric::Leverage;

/// Decimal places kept in emitted metrics.
pub const DEFAULT_PRECISION: u32 = 5;

pub const MAX_PRECISION: u32 = 12;
