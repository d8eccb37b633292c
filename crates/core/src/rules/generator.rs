use tracing::{info, warn};

use super::metrics::{RuleMetric, RuleMetrics};
use super::{DEFAULT_FILTER_METRIC, DEFAULT_MIN_THRESHOLD};
use crate::errors::{MiningError, ParameterError};
use crate::mining::{FrequentItemset, FrequentItemsets};
use crate::table::{ItemId, ItemUniverse};

/// Largest itemset whose splits are enumerated with a `u64` mask.
const MAX_SPLIT_LEN: usize = 63;

/// Admission criterion for generated rules: `metric >= min_threshold`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuleFilter {
    pub metric: RuleMetric,
    pub min_threshold: f64,
}

impl Default for RuleFilter {
    fn default() -> Self {
        Self { metric: DEFAULT_FILTER_METRIC, min_threshold: DEFAULT_MIN_THRESHOLD }
    }
}

impl RuleFilter {
    pub fn min_confidence(min_confidence: f64) -> Self {
        Self { metric: RuleMetric::Confidence, min_threshold: min_confidence }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        self.metric.validate_threshold(self.min_threshold)
    }

    pub fn admits(&self, metrics: &RuleMetrics) -> bool {
        metrics.get(self.metric) >= self.min_threshold
    }
}

/// A rule `antecedent => consequent` split from one frequent itemset.
#[derive(Clone, Debug, PartialEq)]
pub struct AssociationRule {
    antecedent: Vec<ItemId>,
    consequent: Vec<ItemId>,
    metrics: RuleMetrics,
}

impl AssociationRule {
    pub fn antecedent(&self) -> &[ItemId] {
        &self.antecedent
    }

    pub fn consequent(&self) -> &[ItemId] {
        &self.consequent
    }

    pub fn metrics(&self) -> &RuleMetrics {
        &self.metrics
    }
}

#[derive(Clone, Debug, Default)]
pub struct RuleGenerator {
    filter: RuleFilter,
}

impl RuleGenerator {
    pub fn new(filter: RuleFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &RuleFilter {
        &self.filter
    }

    /// Emits every antecedent/consequent split of every frequent itemset of
    /// size two or more that passes the filter. Both directions of a split are
    /// evaluated independently.
    pub fn generate(
        &self,
        itemsets: &FrequentItemsets,
        universe: &ItemUniverse,
    ) -> Result<Vec<AssociationRule>, MiningError> {
        self.filter.validate()?;

        let mut rules = Vec::new();
        let mut evaluated = 0usize;
        for itemset in itemsets.iter().filter(|itemset| itemset.len() >= 2) {
            if itemset.len() > MAX_SPLIT_LEN {
                warn!(
                    event_name = "rules.generator.itemset_skipped",
                    itemset_len = itemset.len(),
                    "itemset too large to split into rules"
                );
                continue;
            }
            evaluated += self.split(itemset, itemsets, universe, &mut rules)?;
        }

        info!(
            event_name = "rules.generator.completed",
            metric = self.filter.metric.as_str(),
            min_threshold = self.filter.min_threshold,
            evaluated,
            admitted = rules.len(),
            "association rules generated"
        );
        Ok(rules)
    }

    fn split(
        &self,
        itemset: &FrequentItemset,
        itemsets: &FrequentItemsets,
        universe: &ItemUniverse,
        rules: &mut Vec<AssociationRule>,
    ) -> Result<usize, MiningError> {
        let items = itemset.items();
        let full_mask: u64 = (1u64 << items.len()) - 1;
        let mut evaluated = 0;

        for mask in 1..full_mask {
            let (antecedent, consequent): (Vec<ItemId>, Vec<ItemId>) =
                items.iter().enumerate().fold((Vec::new(), Vec::new()), |mut sides, (bit, id)| {
                    if mask & (1u64 << bit) != 0 {
                        sides.0.push(*id);
                    } else {
                        sides.1.push(*id);
                    }
                    sides
                });

            let antecedent_count = lookup(itemsets, universe, &antecedent)?;
            let consequent_count = lookup(itemsets, universe, &consequent)?;
            let metrics = RuleMetrics::from_counts(
                itemset.support_count(),
                antecedent_count,
                consequent_count,
                itemsets.total_transactions(),
            );
            evaluated += 1;

            if self.filter.admits(&metrics) {
                rules.push(AssociationRule { antecedent, consequent, metrics });
            }
        }
        Ok(evaluated)
    }
}

fn lookup(
    itemsets: &FrequentItemsets,
    universe: &ItemUniverse,
    items: &[ItemId],
) -> Result<usize, MiningError> {
    match itemsets.support_count(items) {
        Some(count) if count > 0 => Ok(count),
        _ => Err(MiningError::MissingSubsetSupport { subset: universe.labels_of(items) }),
    }
}

#[cfg(test)]
mod tests {
    use super::{AssociationRule, RuleFilter, RuleGenerator};
    use crate::errors::{MiningError, ParameterError};
    use crate::mining::{
        AprioriMiner, FrequentItemset, FrequentItemsets, ItemsetMiner, MinerSettings,
    };
    use crate::rules::RuleMetric;
    use crate::table::{ItemId, TransactionTable};

    fn scenario_table() -> TransactionTable {
        TransactionTable::from_transactions(vec![
            vec!["a", "b"],
            vec!["a", "b", "c"],
            vec!["a"],
            vec!["b", "c"],
        ])
        .expect("scenario table")
    }

    fn rules_for(
        table: &TransactionTable,
        min_support: f64,
        filter: RuleFilter,
    ) -> Vec<AssociationRule> {
        let itemsets = AprioriMiner::new(MinerSettings { min_support, ..MinerSettings::default() })
            .mine(table)
            .expect("mining");
        RuleGenerator::new(filter).generate(&itemsets, table.universe()).expect("rules")
    }

    fn find<'a>(
        table: &TransactionTable,
        rules: &'a [AssociationRule],
        antecedent: &[&str],
        consequent: &[&str],
    ) -> Option<&'a AssociationRule> {
        rules.iter().find(|rule| {
            table.universe().labels_of(rule.antecedent()) == antecedent
                && table.universe().labels_of(rule.consequent()) == consequent
        })
    }

    #[test]
    fn scenario_b_emits_both_directions() {
        let table = scenario_table();
        let rules = rules_for(&table, 0.5, RuleFilter::min_confidence(0.5));

        // {a,b} and {b,c} each split both ways; every split clears 0.5.
        assert_eq!(rules.len(), 4);
        let forward = find(&table, &rules, &["a"], &["b"]).expect("a => b");
        let backward = find(&table, &rules, &["b"], &["a"]).expect("b => a");
        assert!(find(&table, &rules, &["b"], &["c"]).is_some());
        assert_eq!(
            find(&table, &rules, &["c"], &["b"]).expect("c => b").metrics().confidence,
            1.0
        );

        let forward = forward.metrics();
        assert_eq!(forward.support, 0.5);
        assert!((forward.confidence - 0.5 / 0.75).abs() < 1e-12);
        assert!((forward.lift - (0.5 / 0.75) / 0.75).abs() < 1e-12);
        assert_eq!(backward.metrics().support, forward.support);
        assert_eq!(backward.metrics().lift, forward.lift);
    }

    #[test]
    fn scenario_c_certain_rule_has_infinite_conviction() {
        // c never appears without b.
        let table = scenario_table();
        let rules = rules_for(&table, 0.25, RuleFilter::min_confidence(0.0));

        let certain = find(&table, &rules, &["c"], &["b"]).expect("c => b");
        assert_eq!(certain.metrics().confidence, 1.0);
        assert_eq!(certain.metrics().conviction, f64::INFINITY);

        let uncertain = find(&table, &rules, &["b"], &["c"]).expect("b => c");
        assert!(uncertain.metrics().conviction.is_finite());
    }

    #[test]
    fn emitted_rules_satisfy_metric_identities() {
        let table = TransactionTable::from_transactions(vec![
            vec!["SU", "winter", "18:00-23:59", ">180min"],
            vec!["SU", "winter", "06:00-11:59", "0-15min"],
            vec!["S7", "summer", "18:00-23:59", ">180min"],
            vec!["SU", "summer", "18:00-23:59", ">180min"],
            vec!["S7", "winter", "06:00-11:59", "0-15min"],
            vec!["SU", "winter", "18:00-23:59", "15-60min"],
        ])
        .expect("table");
        let itemsets = AprioriMiner::new(MinerSettings {
            min_support: 1.0 / 6.0,
            ..MinerSettings::default()
        })
        .mine(&table)
        .expect("mining");
        let rules = RuleGenerator::new(RuleFilter::min_confidence(0.0))
            .generate(&itemsets, table.universe())
            .expect("rules");

        assert!(!rules.is_empty());
        for rule in &rules {
            let mut union: Vec<ItemId> =
                rule.antecedent().iter().chain(rule.consequent()).copied().collect();
            union.sort_unstable();
            let joint = itemsets.support(&union).expect("union is frequent");
            let antecedent = itemsets.support(rule.antecedent()).expect("antecedent");
            let metrics = rule.metrics();

            assert!(rule.antecedent().iter().all(|id| !rule.consequent().contains(id)));
            assert!((metrics.confidence - joint / antecedent).abs() < 1e-9);
            assert!(!metrics.conviction.is_nan());

            let mirrored = rules
                .iter()
                .find(|other| {
                    other.antecedent() == rule.consequent()
                        && other.consequent() == rule.antecedent()
                })
                .expect("mirrored rule is emitted at zero threshold");
            assert_eq!(mirrored.metrics().lift, metrics.lift);
            assert_eq!(mirrored.metrics().rounded(5).lift, metrics.rounded(5).lift);
        }
    }

    #[test]
    fn filter_threshold_can_use_other_metrics() {
        let table = scenario_table();
        let rules = rules_for(
            &table,
            0.25,
            RuleFilter { metric: RuleMetric::Lift, min_threshold: 1.1 },
        );

        assert!(!rules.is_empty());
        assert!(rules.iter().all(|rule| rule.metrics().lift >= 1.1));
    }

    #[test]
    fn no_rules_is_an_empty_result() {
        let table = scenario_table();
        // Lift never reaches 2 here: the largest is 4/3 for c => b.
        let rules =
            rules_for(&table, 0.5, RuleFilter { metric: RuleMetric::Lift, min_threshold: 2.0 });
        assert!(rules.is_empty());

        let rules = rules_for(&table, 0.99, RuleFilter::min_confidence(0.1));
        assert!(rules.is_empty());
    }

    #[test]
    fn invalid_threshold_is_a_parameter_error() {
        let table = scenario_table();
        let itemsets = FrequentItemsets::new(4, Vec::new(), Vec::new());
        let result = RuleGenerator::new(RuleFilter::min_confidence(1.5))
            .generate(&itemsets, table.universe());

        assert!(matches!(
            result,
            Err(MiningError::Parameter(ParameterError::ThresholdOutOfRange { .. }))
        ));
    }

    #[test]
    fn missing_subset_is_reported_not_panicked() {
        let table = scenario_table();
        let itemsets = FrequentItemsets::new(
            4,
            vec![
                FrequentItemset::new(vec![ItemId(0)], 3),
                FrequentItemset::new(vec![ItemId(0), ItemId(1)], 2),
            ],
            Vec::new(),
        );
        let result = RuleGenerator::new(RuleFilter::min_confidence(0.1))
            .generate(&itemsets, table.universe());

        assert_eq!(
            result.err(),
            Some(MiningError::MissingSubsetSupport { subset: vec!["b".to_owned()] })
        );
    }
}
