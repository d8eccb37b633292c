use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use super::itemset::{FrequentItemset, FrequentItemsets, LevelStats};
use super::{ItemsetMiner, DEFAULT_MIN_SUPPORT, SUPPORT_EPSILON};
use crate::errors::{MiningError, ParameterError};
use crate::table::{ItemId, TransactionTable};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinerSettings {
    pub min_support: f64,
    /// Largest itemset size searched; `None` searches until a level is empty.
    pub max_len: Option<usize>,
    pub parallel: bool,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self { min_support: DEFAULT_MIN_SUPPORT, max_len: None, parallel: true }
    }
}

impl MinerSettings {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(ParameterError::MinSupportOutOfRange(self.min_support));
        }
        if self.max_len == Some(0) {
            return Err(ParameterError::ZeroMaxLen);
        }
        Ok(())
    }

    /// Smallest support count that satisfies `min_support` (inclusive).
    pub fn minimum_count(&self, total_transactions: usize) -> usize {
        let raw = self.min_support * total_transactions as f64;
        ((raw - SUPPORT_EPSILON).ceil().max(1.0)) as usize
    }
}

/// Level-wise frequent itemset search with anti-monotone candidate pruning.
#[derive(Clone, Debug, Default)]
pub struct AprioriMiner {
    settings: MinerSettings,
}

impl AprioriMiner {
    pub fn new(settings: MinerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MinerSettings {
        &self.settings
    }

    fn count(&self, table: &TransactionTable, candidates: &[Vec<ItemId>]) -> Vec<usize> {
        if self.settings.parallel {
            candidates.par_iter().map(|candidate| count_candidate(table, candidate)).collect()
        } else {
            candidates.iter().map(|candidate| count_candidate(table, candidate)).collect()
        }
    }

    fn reached_max_len(&self, level: usize) -> bool {
        self.settings.max_len.is_some_and(|max_len| level >= max_len)
    }
}

impl ItemsetMiner for AprioriMiner {
    fn mine(&self, table: &TransactionTable) -> Result<FrequentItemsets, MiningError> {
        self.settings.validate()?;

        let total = table.len();
        let min_count = self.settings.minimum_count(total);
        let mut frequent = Vec::new();
        let mut levels = Vec::new();

        let mut candidates: Vec<Vec<ItemId>> =
            table.present_items().into_iter().map(|item| vec![item]).collect();
        let mut pruned = 0;
        let mut level = 1;

        loop {
            let counted = candidates.len();
            let counts = self.count(table, &candidates);
            let survivors: Vec<(Vec<ItemId>, usize)> = candidates
                .into_iter()
                .zip(counts)
                .filter(|(_, count)| *count >= min_count)
                .collect();

            let stats = LevelStats {
                level,
                candidates: counted + pruned,
                pruned,
                frequent: survivors.len(),
            };
            debug!(
                event_name = "mining.apriori.level_completed",
                level = stats.level,
                candidates = stats.candidates,
                pruned = stats.pruned,
                frequent = stats.frequent,
                "apriori level completed"
            );
            levels.push(stats);

            let previous: Vec<Vec<ItemId>> =
                survivors.iter().map(|(items, _)| items.clone()).collect();
            frequent.extend(
                survivors.into_iter().map(|(items, count)| FrequentItemset::new(items, count)),
            );

            if previous.is_empty() || self.reached_max_len(level) {
                break;
            }

            let (next, next_pruned) = join_and_prune(previous);
            if next.is_empty() {
                break;
            }
            candidates = next;
            pruned = next_pruned;
            level += 1;
        }

        info!(
            event_name = "mining.apriori.completed",
            transactions = total,
            min_count,
            itemsets = frequent.len(),
            levels = levels.len(),
            "frequent itemset search completed"
        );

        Ok(FrequentItemsets::new(total, frequent, levels))
    }
}

fn count_candidate(table: &TransactionTable, candidate: &[ItemId]) -> usize {
    table.count_supersets(&table.bits_for(candidate))
}

/// Joins frequent (k-1)-itemsets sharing their first k-2 items and keeps a
/// candidate only if all of its (k-1)-subsets are frequent. Returns the
/// admitted candidates and the number rejected by the subset check.
fn join_and_prune(mut previous: Vec<Vec<ItemId>>) -> (Vec<Vec<ItemId>>, usize) {
    previous.sort_unstable();
    let known: FxHashSet<&[ItemId]> = previous.iter().map(Vec::as_slice).collect();

    let mut admitted = Vec::new();
    let mut pruned = 0;
    for (position, left) in previous.iter().enumerate() {
        let prefix_len = left.len() - 1;
        for right in &previous[position + 1..] {
            if left[..prefix_len] != right[..prefix_len] {
                break;
            }
            let mut candidate = left.clone();
            candidate.push(right[prefix_len]);

            if all_subsets_known(&candidate, &known) {
                admitted.push(candidate);
            } else {
                pruned += 1;
            }
        }
    }
    (admitted, pruned)
}

fn all_subsets_known(candidate: &[ItemId], known: &FxHashSet<&[ItemId]>) -> bool {
    // The two subsets dropping one of the last two items are the join parents.
    let checked = candidate.len().saturating_sub(2);
    let mut subset = Vec::with_capacity(candidate.len() - 1);
    (0..checked).all(|skip| {
        subset.clear();
        subset.extend(
            candidate.iter().enumerate().filter(|(index, _)| *index != skip).map(|(_, id)| *id),
        );
        known.contains(subset.as_slice())
    })
}
