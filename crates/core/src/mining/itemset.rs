use rustc_hash::FxHashMap;

use crate::table::{ItemId, ItemUniverse};

/// An itemset that met the support threshold, with its exact support count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequentItemset {
    items: Vec<ItemId>,
    support_count: usize,
}

impl FrequentItemset {
    /// `items` is sorted and deduplicated on construction.
    pub fn new(mut items: Vec<ItemId>, support_count: usize) -> Self {
        items.sort_unstable();
        items.dedup();
        Self { items, support_count }
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn support_count(&self) -> usize {
        self.support_count
    }

    pub fn support(&self, total_transactions: usize) -> f64 {
        self.support_count as f64 / total_transactions as f64
    }

    pub fn labels(&self, universe: &ItemUniverse) -> Vec<String> {
        universe.labels_of(&self.items)
    }
}

/// Counters for one level of the level-wise search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelStats {
    pub level: usize,
    pub candidates: usize,
    pub pruned: usize,
    pub frequent: usize,
}

/// Every frequent itemset of one mining run, indexed by its sorted items.
#[derive(Clone, Debug, Default)]
pub struct FrequentItemsets {
    total_transactions: usize,
    itemsets: Vec<FrequentItemset>,
    counts: FxHashMap<Vec<ItemId>, usize>,
    levels: Vec<LevelStats>,
}

impl FrequentItemsets {
    pub fn new(
        total_transactions: usize,
        mut itemsets: Vec<FrequentItemset>,
        levels: Vec<LevelStats>,
    ) -> Self {
        itemsets.sort_by(|left, right| {
            left.len().cmp(&right.len()).then_with(|| left.items().cmp(right.items()))
        });
        let counts = itemsets
            .iter()
            .map(|itemset| (itemset.items().to_vec(), itemset.support_count()))
            .collect();
        Self { total_transactions, itemsets, counts, levels }
    }

    pub fn total_transactions(&self) -> usize {
        self.total_transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrequentItemset> {
        self.itemsets.iter()
    }

    pub fn len(&self) -> usize {
        self.itemsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itemsets.is_empty()
    }

    pub fn levels(&self) -> &[LevelStats] {
        &self.levels
    }

    /// Support count of a sorted itemset, or `None` when it is not frequent.
    pub fn support_count(&self, items: &[ItemId]) -> Option<usize> {
        self.counts.get(items).copied()
    }

    pub fn support(&self, items: &[ItemId]) -> Option<f64> {
        self.support_count(items).map(|count| count as f64 / self.total_transactions as f64)
    }

    pub fn max_len(&self) -> usize {
        self.itemsets.iter().map(FrequentItemset::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{FrequentItemset, FrequentItemsets};
    use crate::table::ItemId;

    #[test]
    fn itemset_items_are_canonicalized() {
        let itemset = FrequentItemset::new(vec![ItemId(2), ItemId(0), ItemId(2)], 3);

        assert_eq!(itemset.items(), &[ItemId(0), ItemId(2)]);
        assert_eq!(itemset.support(4), 0.75);
    }

    #[test]
    fn lookup_uses_sorted_items() {
        let itemsets = FrequentItemsets::new(
            4,
            vec![
                FrequentItemset::new(vec![ItemId(1), ItemId(0)], 2),
                FrequentItemset::new(vec![ItemId(0)], 3),
            ],
            Vec::new(),
        );

        assert_eq!(itemsets.support_count(&[ItemId(0), ItemId(1)]), Some(2));
        assert_eq!(itemsets.support(&[ItemId(0)]), Some(0.75));
        assert_eq!(itemsets.support(&[ItemId(5)]), None);
        assert_eq!(itemsets.iter().next().map(FrequentItemset::len), Some(1));
        assert_eq!(itemsets.max_len(), 2);
    }
}
