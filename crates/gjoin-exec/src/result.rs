//! Ordered aggregated results and the equivalence check between strategies.
//!
//! Every result handed to a sink is materialized as a sequence sorted
//! strictly ascending by key, regardless of input row order or hash-map
//! iteration order.

use std::cmp::Ordering;

use gjoin_types::{AggregatedRow, Key, Sum};
use serde::{Deserialize, Serialize};

use crate::AggregateMap;

/// Aggregated result, sorted ascending by key with one entry per key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedResult {
    rows: Vec<AggregatedRow>,
}

impl AggregatedResult {
    pub fn from_map(map: AggregateMap) -> Self {
        let mut rows: Vec<AggregatedRow> = map
            .into_iter()
            .map(|(key, sum)| AggregatedRow::new(key, sum))
            .collect();
        rows.sort_unstable_by_key(|row| row.key);
        Self { rows }
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AggregatedRow> {
        self.rows.iter()
    }

    pub fn get(&self, key: Key) -> Option<Sum> {
        self.rows
            .binary_search_by_key(&key, |row| row.key)
            .ok()
            .map(|idx| self.rows[idx].sum)
    }
}

impl<'a> IntoIterator for &'a AggregatedResult {
    type Item = &'a AggregatedRow;
    type IntoIter = std::slice::Iter<'a, AggregatedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl From<AggregateMap> for AggregatedResult {
    fn from(map: AggregateMap) -> Self {
        Self::from_map(map)
    }
}

/// One key whose sums disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumMismatch {
    pub key: Key,
    pub left: Sum,
    pub right: Sum,
}

/// Outcome of comparing two results as key→sum mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Equivalence {
    Match,
    Mismatch {
        only_left: Vec<Key>,
        only_right: Vec<Key>,
        differing: Vec<SumMismatch>,
    },
}

impl Equivalence {
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Compare two results key by key.
///
/// Both inputs are sorted, so this is a single merge walk.
pub fn compare_results(left: &AggregatedResult, right: &AggregatedResult) -> Equivalence {
    let mut only_left = Vec::new();
    let mut only_right = Vec::new();
    let mut differing = Vec::new();

    let mut lhs = left.rows.iter().peekable();
    let mut rhs = right.rows.iter().peekable();
    loop {
        match (lhs.peek(), rhs.peek()) {
            (Some(l), Some(r)) => match l.key.cmp(&r.key) {
                Ordering::Less => {
                    only_left.push(l.key);
                    lhs.next();
                }
                Ordering::Greater => {
                    only_right.push(r.key);
                    rhs.next();
                }
                Ordering::Equal => {
                    if l.sum != r.sum {
                        differing.push(SumMismatch {
                            key: l.key,
                            left: l.sum,
                            right: r.sum,
                        });
                    }
                    lhs.next();
                    rhs.next();
                }
            },
            (Some(l), None) => {
                only_left.push(l.key);
                lhs.next();
            }
            (None, Some(r)) => {
                only_right.push(r.key);
                rhs.next();
            }
            (None, None) => break,
        }
    }

    if only_left.is_empty() && only_right.is_empty() && differing.is_empty() {
        Equivalence::Match
    } else {
        Equivalence::Mismatch {
            only_left,
            only_right,
            differing,
        }
    }
}
