use std::cmp::Ordering;

use serde::Serialize;

use super::generator::AssociationRule;
use super::metrics::{RuleMetric, RuleMetrics};
use super::{DEFAULT_PRECISION, DEFAULT_SORT_METRIC, MAX_PRECISION};
use crate::errors::ParameterError;
use crate::table::ItemUniverse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankingSettings {
    pub sort_by: RuleMetric,
    pub ascending: bool,
    /// Decimal places kept for every metric.
    pub precision: u32,
    pub limit: Option<usize>,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            sort_by: DEFAULT_SORT_METRIC,
            ascending: false,
            precision: DEFAULT_PRECISION,
            limit: None,
        }
    }
}

impl RankingSettings {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.precision > MAX_PRECISION {
            return Err(ParameterError::PrecisionTooLarge {
                max: MAX_PRECISION,
                value: self.precision,
            });
        }
        Ok(())
    }
}

/// A ranked rule with item labels resolved, ready for emission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuleRecord {
    pub antecedents: Vec<String>,
    pub consequents: Vec<String>,
    #[serde(flatten)]
    pub metrics: RuleMetrics,
}

impl RuleRecord {
    pub fn from_rule(rule: &AssociationRule, universe: &ItemUniverse) -> Self {
        Self {
            antecedents: universe.labels_of(rule.antecedent()),
            consequents: universe.labels_of(rule.consequent()),
            metrics: *rule.metrics(),
        }
    }

    pub fn rounded(&self, precision: u32) -> Self {
        Self {
            antecedents: self.antecedents.clone(),
            consequents: self.consequents.clone(),
            metrics: self.metrics.rounded(precision),
        }
    }
}

/// Rounds rules for output and orders them by one metric, then by labels.
#[derive(Clone, Debug, Default)]
pub struct RuleRanker {
    settings: RankingSettings,
}

impl RuleRanker {
    pub fn new(settings: RankingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    pub fn rank(
        &self,
        rules: &[AssociationRule],
        universe: &ItemUniverse,
    ) -> Result<Vec<RuleRecord>, ParameterError> {
        self.settings.validate()?;

        // Sorting happens on rounded values so that ties visible in the output
        // are always broken by labels.
        let mut records: Vec<RuleRecord> = rules
            .iter()
            .map(|rule| RuleRecord::from_rule(rule, universe).rounded(self.settings.precision))
            .collect();
        records.sort_by(|left, right| self.compare(left, right));
        if let Some(limit) = self.settings.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    fn compare(&self, left: &RuleRecord, right: &RuleRecord) -> Ordering {
        let metric = self.settings.sort_by;
        // total_cmp places +inf above every finite value.
        let by_metric = left.metrics.get(metric).total_cmp(&right.metrics.get(metric));
        let by_metric = if self.settings.ascending { by_metric } else { by_metric.reverse() };

        by_metric
            .then_with(|| left.antecedents.cmp(&right.antecedents))
            .then_with(|| left.consequents.cmp(&right.consequents))
    }
}
