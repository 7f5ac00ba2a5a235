//! Join-aggregate evaluators.
//!
//! Both strategies answer the same query over the same read-only snapshots:
//!
//! ```text
//! SELECT A.key, SUM(A.value) FROM A JOIN B ON A.key = B.key GROUP BY A.key
//! ```
//!
//! - [`Strategy::HashJoinThenAggregate`] materializes the join output and
//!   aggregates it: O(|A| + |B| + |A ⋈ B|).
//! - [`Strategy::PreAggregate`] aggregates each side first and multiplies:
//!   O(|A| + |B|), memory bounded by the distinct keys of each side.
//!
//! Results are equal as key→sum mappings; [`AggregatedResult`] fixes the
//! order for output and [`compare_results`] checks the equality.

pub mod evaluator;
pub mod hash_join;
pub mod pre_aggregate;
pub mod result;

use gjoin_types::{Key, Sum};

pub use evaluator::{Evaluation, Strategy};
pub use hash_join::{
    HashJoinTable, aggregate_joined, hash_join_aggregate, hash_join_build, hash_join_probe,
};
pub use pre_aggregate::{count_by_key, merge_by_key, pre_aggregate_join, sum_by_key};
pub use result::{AggregatedResult, Equivalence, SumMismatch, compare_results};

/// Unordered key→sum mapping produced by a strategy.
pub type AggregateMap = hashbrown::HashMap<Key, Sum>;
