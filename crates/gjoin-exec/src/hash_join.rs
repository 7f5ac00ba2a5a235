//! Build-then-probe hash join followed by group-by-sum.
//!
//! Build: index relation A by key. Duplicate keys are kept as separate rows
//! chained behind one head entry, never merged.
//! Probe: every B row looks up its key and emits one [`JoinedRow`] per
//! matching A row. Duplicate B rows re-probe independently and each re-emit the
//! full match set; that fan-out is what the pre-aggregation shortcut multiplies.
//! Aggregate: group the materialized join output by key, summing in 64 bits.

use gjoin_error::{GroupJoinError, Result};
use gjoin_types::{JoinedRow, Key, RowA, RowB, Sum};
use hashbrown::HashMap;

use crate::AggregateMap;

// ── Build-Side Hash Table ──────────────────────────────────────────────────

/// Hash index over relation A.
#[derive(Debug)]
pub struct HashJoinTable<'a> {
    /// Build rows, borrowed from the snapshot.
    rows: &'a [RowA],
    /// Maps a key to the index of the newest row with that key (head of the chain).
    head: HashMap<Key, usize>,
    /// Parallel to `rows`: index of the next older row with the same key.
    next: Vec<Option<usize>>,
}

impl<'a> HashJoinTable<'a> {
    /// Number of distinct keys on the build side.
    pub fn distinct_keys(&self) -> usize {
        self.head.len()
    }

    pub fn build_rows(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the A rows whose key equals `key`.
    ///
    /// Rows come out newest-first; the aggregate does not depend on the order.
    pub fn matches(&self, key: Key) -> BucketIter<'_, 'a> {
        BucketIter {
            table: self,
            current: self.head.get(&key).copied(),
        }
    }

    #[cfg(test)]
    fn bucket_len(&self, key: Key) -> usize {
        self.matches(key).count()
    }
}

/// Walks one collision-free key chain of a [`HashJoinTable`].
#[derive(Debug)]
pub struct BucketIter<'t, 'a> {
    table: &'t HashJoinTable<'a>,
    current: Option<usize>,
}

impl<'a> Iterator for BucketIter<'_, 'a> {
    type Item = &'a RowA;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        let rows: &'a [RowA] = self.table.rows;
        self.current = self.table.next[idx];
        Some(&rows[idx])
    }
}

/// Build the hash index over relation A.
pub fn hash_join_build(build: &[RowA]) -> HashJoinTable<'_> {
    let mut head: HashMap<Key, usize> = HashMap::with_capacity(build.len());
    let mut next: Vec<Option<usize>> = Vec::with_capacity(build.len());

    for (idx, row) in build.iter().enumerate() {
        next.push(head.insert(row.key, idx));
    }

    tracing::debug!(
        build_rows = build.len(),
        distinct_keys = head.len(),
        "hash join build complete"
    );

    HashJoinTable {
        rows: build,
        head,
        next,
    }
}

// ── Probe Phase ────────────────────────────────────────────────────────────

/// Probe the index with every B row and materialize the inner-join output.
///
/// A B row with no match emits nothing. B is never deduplicated.
pub fn hash_join_probe(table: &HashJoinTable<'_>, probe: &[RowB]) -> Vec<JoinedRow> {
    let _span = tracing::debug_span!(
        "hash_join_probe",
        build_rows = table.build_rows(),
        probe_rows = probe.len(),
    )
    .entered();

    let mut joined = Vec::with_capacity(probe.len());
    let mut unmatched_probes = 0_usize;
    for row_b in probe {
        let before = joined.len();
        joined.extend(table.matches(row_b.key).map(|row_a| JoinedRow {
            key: row_a.key,
            value: row_a.value,
            probe_key: row_b.key,
        }));
        if joined.len() == before {
            unmatched_probes += 1;
        }
    }

    tracing::debug!(
        output_rows = joined.len(),
        unmatched_probes,
        "hash join probe complete"
    );
    joined
}

// ── Aggregation Phase ──────────────────────────────────────────────────────

/// GROUP BY key, SUM(value) over the materialized join output.
pub fn aggregate_joined(joined: &[JoinedRow]) -> Result<AggregateMap> {
    let mut sums: AggregateMap = HashMap::new();
    for row in joined {
        let slot = sums.entry(row.key).or_insert(0);
        *slot = slot
            .checked_add(Sum::from(row.value))
            .ok_or(GroupJoinError::AccumulatorOverflow { key: row.key })?;
    }
    tracing::debug!(
        input_rows = joined.len(),
        groups = sums.len(),
        "join output aggregated"
    );
    Ok(sums)
}

/// Output of one hash-join-then-aggregate evaluation.
#[derive(Debug)]
pub struct HashJoinOutput {
    pub sums: AggregateMap,
    /// Cardinality of the materialized join output.
    pub joined_rows: usize,
    pub build_keys: usize,
}

/// Run build, probe, and aggregate back to back.
pub fn hash_join_aggregate(a: &[RowA], b: &[RowB]) -> Result<HashJoinOutput> {
    let table = hash_join_build(a);
    let joined = hash_join_probe(&table, b);
    let sums = aggregate_joined(&joined)?;
    Ok(HashJoinOutput {
        sums,
        joined_rows: joined.len(),
        build_keys: table.distinct_keys(),
    })
}
