//! Frequent itemset discovery.
//!
//! The level-wise [`AprioriMiner`] is the only implementation; the
//! [`ItemsetMiner`] trait is the seam the pipeline depends on.

mod apriori;
mod itemset;

pub use apriori::{AprioriMiner, MinerSettings};
pub use itemset::{FrequentItemset, FrequentItemsets, LevelStats};

use crate::errors::MiningError;
use crate::table::TransactionTable;

/// Default minimum support, matching the flight analysis deployments.
pub const DEFAULT_MIN_SUPPORT: f64 = 0.0001;

/// Tolerance applied when turning a support fraction into a minimum count.
pub const SUPPORT_EPSILON: f64 = 1e-9;

pub trait ItemsetMiner {
    fn mine(&self, table: &TransactionTable) -> Result<FrequentItemsets, MiningError>;
}
