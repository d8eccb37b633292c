use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::errors::MiningError;
use crate::mining::{AprioriMiner, ItemsetMiner, LevelStats, MinerSettings};
use crate::rules::{RankingSettings, RuleFilter, RuleGenerator, RuleRanker, RuleRecord};
use crate::table::TransactionTable;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineSettings {
    pub miner: MinerSettings,
    pub filter: RuleFilter,
    pub ranking: RankingSettings,
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), MiningError> {
        self.miner.validate()?;
        self.filter.validate()?;
        self.ranking.validate()?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: usize,
    pub candidates: usize,
    pub pruned: usize,
    pub frequent: usize,
}

impl From<&LevelStats> for LevelSummary {
    fn from(stats: &LevelStats) -> Self {
        Self {
            level: stats.level,
            candidates: stats.candidates,
            pruned: stats.pruned,
            frequent: stats.frequent,
        }
    }
}

/// Outcome of one mining run: table shape, search statistics and the ranked
/// rules.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MiningReport {
    pub transactions: usize,
    pub items: usize,
    pub frequent_itemsets: usize,
    pub levels: Vec<LevelSummary>,
    pub rules: Vec<RuleRecord>,
}

/// Mines frequent itemsets, derives rules and ranks them.
#[derive(Clone, Debug, Default)]
pub struct MiningPipeline {
    settings: PipelineSettings,
}

impl MiningPipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn run(&self, table: &TransactionTable) -> Result<MiningReport, MiningError> {
        // Every parameter is checked before any counting starts.
        self.settings.validate()?;
        let started = Instant::now();

        let itemsets = AprioriMiner::new(self.settings.miner).mine(table)?;
        let rules = RuleGenerator::new(self.settings.filter).generate(&itemsets, table.universe())?;
        let records = RuleRanker::new(self.settings.ranking).rank(&rules, table.universe())?;

        info!(
            event_name = "pipeline.run.completed",
            transactions = table.len(),
            items = table.universe().len(),
            frequent_itemsets = itemsets.len(),
            rules = records.len(),
            sort_by = %self.settings.ranking.sort_by,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "mining pipeline completed"
        );

        Ok(MiningReport {
            transactions: table.len(),
            items: table.universe().len(),
            frequent_itemsets: itemsets.len(),
            levels: itemsets.levels().iter().map(LevelSummary::from).collect(),
            rules: records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{MiningPipeline, PipelineSettings};
    use crate::errors::{MiningError, ParameterError};
    use crate::mining::MinerSettings;
    use crate::rules::{RankingSettings, RuleFilter, RuleMetric};
    use crate::table::TransactionTable;

    fn scenario_table() -> TransactionTable {
        TransactionTable::from_transactions(vec![
            vec!["a", "b"],
            vec!["a", "b", "c"],
            vec!["a"],
            vec!["b", "c"],
        ])
        .expect("table")
    }

    fn settings(min_support: f64, min_confidence: f64) -> PipelineSettings {
        PipelineSettings {
            miner: MinerSettings { min_support, ..MinerSettings::default() },
            filter: RuleFilter::min_confidence(min_confidence),
            ranking: RankingSettings::default(),
        }
    }

    #[test]
    fn end_to_end_run_reports_shape_and_rules() {
        let report =
            MiningPipeline::new(settings(0.5, 0.6)).run(&scenario_table()).expect("pipeline");

        assert_eq!(report.transactions, 4);
        assert_eq!(report.items, 3);
        // {a}, {b}, {c}, {a,b}, {b,c}
        assert_eq!(report.frequent_itemsets, 5);
        assert_eq!(report.levels.len(), 2);

        let pairs: Vec<(Vec<String>, Vec<String>)> = report
            .rules
            .iter()
            .map(|record| (record.antecedents.clone(), record.consequents.clone()))
            .collect();
        assert!(pairs.contains(&(vec!["c".to_owned()], vec!["b".to_owned()])));
        assert!(pairs.contains(&(vec!["a".to_owned()], vec!["b".to_owned()])));
        assert!(pairs.iter().all(|(antecedent, consequent)| antecedent != consequent));
    }

    #[test]
    fn leverage_order_is_descending_by_default() {
        let report =
            MiningPipeline::new(settings(0.25, 0.0)).run(&scenario_table()).expect("pipeline");

        for pair in report.rules.windows(2) {
            assert!(pair[0].metrics.leverage >= pair[1].metrics.leverage);
        }
    }

    #[test]
    fn high_support_yields_an_empty_report() {
        let report =
            MiningPipeline::new(settings(0.99, 0.1)).run(&scenario_table()).expect("pipeline");

        assert_eq!(report.frequent_itemsets, 0);
        assert!(report.rules.is_empty());
    }

    #[test]
    fn invalid_threshold_fails_before_mining() {
        let mut settings = settings(0.5, 0.1);
        settings.filter = RuleFilter { metric: RuleMetric::Confidence, min_threshold: 1.5 };

        let error = MiningPipeline::new(settings).run(&scenario_table()).expect_err("invalid");
        assert!(matches!(
            error,
            MiningError::Parameter(ParameterError::ThresholdOutOfRange { metric: "confidence", .. })
        ));
    }

    #[test]
    fn invalid_min_support_is_rejected() {
        let error = MiningPipeline::new(settings(0.0, 0.1))
            .run(&scenario_table())
            .expect_err("zero support");

        assert_eq!(error, MiningError::Parameter(ParameterError::MinSupportOutOfRange(0.0)));
    }
}
