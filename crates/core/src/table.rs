//! Transaction table: a fixed item universe plus one bit-set per flight.
//!
//! Labels are interned once into dense [`ItemId`]s so that subset checks during
//! mining reduce to word-wise `AND` over [`ItemBits`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::InputError;

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered set of item labels. Position in the universe is the item's id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemUniverse {
    labels: Vec<String>,
    index: FxHashMap<String, ItemId>,
}

impl ItemUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels<I, S>(labels: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut universe = Self::new();
        for label in labels {
            let label = label.into();
            if universe.index.contains_key(&label) {
                return Err(InputError::DuplicateColumn(label));
            }
            universe.intern(label);
        }
        Ok(universe)
    }

    /// Returns the id for `label`, registering it when unseen.
    pub fn intern(&mut self, label: impl Into<String>) -> ItemId {
        let label = label.into();
        if let Some(id) = self.index.get(&label) {
            return *id;
        }
        let id = ItemId(self.labels.len() as u32);
        self.index.insert(label.clone(), id);
        self.labels.push(label);
        id
    }

    pub fn id_of(&self, label: &str) -> Option<ItemId> {
        self.index.get(label).copied()
    }

    pub fn label(&self, id: ItemId) -> &str {
        &self.labels[id.index()]
    }

    pub fn labels_of(&self, ids: &[ItemId]) -> Vec<String> {
        ids.iter().map(|id| self.label(*id).to_owned()).collect()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fixed-width bit-set over an item universe.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemBits {
    words: Vec<u64>,
}

impl ItemBits {
    pub fn empty(universe_len: usize) -> Self {
        Self { words: vec![0; universe_len.div_ceil(WORD_BITS).max(1)] }
    }

    pub fn from_ids(universe_len: usize, ids: &[ItemId]) -> Self {
        let mut bits = Self::empty(universe_len);
        for id in ids {
            bits.insert(*id);
        }
        bits
    }

    pub fn insert(&mut self, id: ItemId) {
        let index = id.index();
        if index / WORD_BITS >= self.words.len() {
            self.words.resize(index / WORD_BITS + 1, 0);
        }
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    pub fn contains(&self, id: ItemId) -> bool {
        let index = id.index();
        self.words
            .get(index / WORD_BITS)
            .map(|word| word & (1u64 << (index % WORD_BITS)) != 0)
            .unwrap_or(false)
    }

    /// True when every bit set in `other` is also set in `self`.
    pub fn is_superset_of(&self, other: &ItemBits) -> bool {
        other.words.iter().enumerate().all(|(position, required)| {
            let present = self.words.get(position).copied().unwrap_or(0);
            present & required == *required
        })
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.words.iter().enumerate().flat_map(|(position, word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| ItemId((position * WORD_BITS + bit) as u32))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionTable {
    universe: ItemUniverse,
    transactions: Vec<ItemBits>,
}

impl TransactionTable {
    /// Builds a table whose universe is every label seen, in first-seen order.
    pub fn from_transactions<I, T, S>(rows: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut universe = ItemUniverse::new();
        let mut id_rows = Vec::new();
        for row in rows {
            let ids: Vec<ItemId> =
                row.into_iter().map(|label| universe.intern(label.as_ref())).collect();
            id_rows.push(ids);
        }

        let width = universe.len();
        let transactions = id_rows.iter().map(|ids| ItemBits::from_ids(width, ids)).collect();
        Self::new(universe, transactions)
    }

    /// Builds a table over a fixed universe; labels outside it are rejected.
    pub fn with_universe<I, T, S>(universe: ItemUniverse, rows: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let width = universe.len();
        let mut transactions = Vec::new();
        for row in rows {
            let mut bits = ItemBits::empty(width);
            for label in row {
                let label = label.as_ref();
                let id =
                    universe.id_of(label).ok_or_else(|| InputError::UnknownItem(label.to_owned()))?;
                bits.insert(id);
            }
            transactions.push(bits);
        }
        Self::new(universe, transactions)
    }

    /// Builds a table from a boolean matrix. The column named `id_column`, if
    /// present, is dropped from the item universe.
    pub fn from_indicator_matrix(
        columns: &[String],
        rows: &[Vec<bool>],
        id_column: Option<&str>,
    ) -> Result<Self, InputError> {
        let kept: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, name)| Some(name.as_str()) != id_column)
            .map(|(position, _)| position)
            .collect();
        let universe = ItemUniverse::from_labels(kept.iter().map(|position| &columns[*position]))?;

        let mut transactions = Vec::with_capacity(rows.len());
        for (row_index, values) in rows.iter().enumerate() {
            if values.len() != columns.len() {
                return Err(InputError::RowWidthMismatch {
                    row: row_index,
                    expected: columns.len(),
                    actual: values.len(),
                });
            }
            let mut bits = ItemBits::empty(universe.len());
            for (item, position) in kept.iter().enumerate() {
                if values[*position] {
                    bits.insert(ItemId(item as u32));
                }
            }
            transactions.push(bits);
        }

        Self::new(universe, transactions)
    }

    fn new(universe: ItemUniverse, transactions: Vec<ItemBits>) -> Result<Self, InputError> {
        if transactions.is_empty() {
            return Err(InputError::EmptyTable);
        }
        if universe.is_empty() {
            return Err(InputError::NoItems);
        }
        Ok(Self { universe, transactions })
    }

    pub fn universe(&self) -> &ItemUniverse {
        &self.universe
    }

    pub fn transactions(&self) -> &[ItemBits] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Items that occur in at least one transaction, in id order.
    pub fn present_items(&self) -> Vec<ItemId> {
        let mut seen = ItemBits::empty(self.universe.len());
        for transaction in &self.transactions {
            for id in transaction.ids() {
                seen.insert(id);
            }
        }
        seen.ids().collect()
    }

    /// Number of transactions containing every item of `itemset`.
    pub fn count_supersets(&self, itemset: &ItemBits) -> usize {
        self.transactions.iter().filter(|transaction| transaction.is_superset_of(itemset)).count()
    }

    pub fn bits_for(&self, ids: &[ItemId]) -> ItemBits {
        ItemBits::from_ids(self.universe.len(), ids)
    }

    /// Item labels of one transaction, in id order.
    pub fn transaction_labels(&self, position: usize) -> Vec<&str> {
        self.transactions
            .get(position)
            .map(|bits| bits.ids().map(|id| self.universe.label(id)).collect())
            .unwrap_or_default()
    }
}
