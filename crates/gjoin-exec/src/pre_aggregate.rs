//! Pre-aggregation (group-join): aggregate each relation on its own, then
//! merge the two per-key summaries by multiplication.
//!
//! For a key with A values `v_1..v_n` and `m` B rows, the join-then-sum
//! result is `m * (v_1 + ... + v_n)`: each B row matches all `n` A rows.
//! So `sum_a(k) * count_b(k)` gives the same answer without materializing
//! any joined row. This holds only for a pure equality predicate and SUM.

use gjoin_error::{GroupJoinError, Result};
use gjoin_types::{Key, RowA, RowB, Sum};
use hashbrown::HashMap;

use crate::AggregateMap;

/// Per-key 64-bit sum of A's value column.
pub fn sum_by_key(a: &[RowA]) -> Result<HashMap<Key, Sum>> {
    let mut sums: HashMap<Key, Sum> = HashMap::new();
    for row in a {
        let slot = sums.entry(row.key).or_insert(0);
        *slot = slot
            .checked_add(Sum::from(row.value))
            .ok_or(GroupJoinError::AccumulatorOverflow { key: row.key })?;
    }
    Ok(sums)
}

/// Per-key row count of B.
pub fn count_by_key(b: &[RowB]) -> HashMap<Key, u64> {
    let mut counts: HashMap<Key, u64> = HashMap::new();
    for row in b {
        *counts.entry(row.key).or_insert(0) += 1;
    }
    counts
}

/// Combine `sum_a` and `count_b` on their common keys.
///
/// A key present on only one side is dropped (inner-join semantics).
pub fn merge_by_key(
    sum_a: &HashMap<Key, Sum>,
    count_b: &HashMap<Key, u64>,
) -> Result<AggregateMap> {
    let mut merged: AggregateMap = HashMap::with_capacity(count_b.len().min(sum_a.len()));
    for (&key, &count) in count_b {
        let Some(&sum) = sum_a.get(&key) else {
            continue;
        };
        let product = Sum::try_from(count)
            .ok()
            .and_then(|count| sum.checked_mul(count))
            .ok_or(GroupJoinError::AccumulatorOverflow { key })?;
        merged.insert(key, product);
    }
    Ok(merged)
}

/// Output of one pre-aggregation evaluation.
#[derive(Debug)]
pub struct PreAggregateOutput {
    pub sums: AggregateMap,
    pub build_keys: usize,
    pub probe_keys: usize,
}

/// Scan A once, scan B once, merge.
pub fn pre_aggregate_join(a: &[RowA], b: &[RowB]) -> Result<PreAggregateOutput> {
    let _span = tracing::debug_span!(
        "pre_aggregate_join",
        build_rows = a.len(),
        probe_rows = b.len(),
    )
    .entered();

    let sum_a = sum_by_key(a)?;
    let count_b = count_by_key(b);
    let sums = merge_by_key(&sum_a, &count_b)?;

    tracing::debug!(
        a_keys = sum_a.len(),
        b_keys = count_b.len(),
        groups = sums.len(),
        "pre-aggregation merge complete"
    );

    Ok(PreAggregateOutput {
        sums,
        build_keys: sum_a.len(),
        probe_keys: count_b.len(),
    })
}
