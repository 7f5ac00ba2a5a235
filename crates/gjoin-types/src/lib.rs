//! Core row and relation types.
//!
//! Relation A carries `(key, value)` rows, relation B carries `(key)` rows.
//! Both are loaded once per run into a [`Relation`] snapshot that every
//! strategy reads through a shared slice; nothing downstream can mutate it.

pub mod schema;

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use schema::{RelationSchema, SchemaConfig, SchemaPreset};

/// Join key. Input keys are 32-bit.
pub type Key = i32;
/// Value column of relation A. Input values are 32-bit.
pub type Value = i32;
/// Aggregated sum. Always 64-bit: duplicate-key fan-out overflows 32 bits quickly.
pub type Sum = i64;

/// One row of relation A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowA {
    pub key: Key,
    pub value: Value,
}

impl RowA {
    pub const fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}

/// One row of relation B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowB {
    pub key: Key,
}

impl RowB {
    pub const fn new(key: Key) -> Self {
        Self { key }
    }
}

/// One matching `(A, B)` pair materialized by the hash join.
///
/// `probe_key` always equals `key` for this equi-join; it is carried because
/// it comes from the probe side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinedRow {
    pub key: Key,
    pub value: Value,
    pub probe_key: Key,
}

/// One `(key, sum)` entry of an aggregated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub key: Key,
    pub sum: Sum,
}

impl AggregatedRow {
    pub const fn new(key: Key, sum: Sum) -> Self {
        Self { key, sum }
    }
}

/// Immutable snapshot of a loaded relation.
///
/// Cloning is cheap and shares the rows; the snapshot only hands out `&[R]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation<R> {
    rows: Arc<[R]>,
}

impl<R> Relation<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { rows: rows.into() }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R> Deref for Relation<R> {
    type Target = [R];

    fn deref(&self) -> &[R] {
        &self.rows
    }
}

impl<R> From<Vec<R>> for Relation<R> {
    fn from(rows: Vec<R>) -> Self {
        Self::new(rows)
    }
}

impl<R> FromIterator<R> for Relation<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

pub type RelationA = Relation<RowA>;
pub type RelationB = Relation<RowB>;

/// Build relation A from `(key, value)` pairs.
pub fn relation_a(pairs: &[(Key, Value)]) -> RelationA {
    pairs.iter().map(|&(k, v)| RowA::new(k, v)).collect()
}

/// Build relation B from bare keys.
pub fn relation_b(keys: &[Key]) -> RelationB {
    keys.iter().copied().map(RowB::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_clone_shares_rows() {
        let a = relation_a(&[(1, 10), (1, 20)]);
        let b = a.clone();
        assert!(std::ptr::eq(a.rows().as_ptr(), b.rows().as_ptr()));
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn relation_b_keeps_duplicates_in_order() {
        let b = relation_b(&[3, 1, 3]);
        let keys: Vec<Key> = b.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![3, 1, 3]);
    }

    #[test]
    fn aggregated_row_orders_by_key_first() {
        let mut rows = vec![AggregatedRow::new(5, 1), AggregatedRow::new(-2, 9)];
        rows.sort();
        assert_eq!(rows[0].key, -2);
    }

    #[test]
    fn aggregated_row_json_shape() {
        let json = serde_json::to_string(&AggregatedRow::new(1, 60)).unwrap();
        assert_eq!(json, r#"{"key":1,"sum":60}"#);
    }
}
