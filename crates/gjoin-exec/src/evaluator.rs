//! One join-aggregate operation, two interchangeable implementations.

use std::fmt;
use std::str::FromStr;

use gjoin_error::{GroupJoinError, Result};
use gjoin_types::{RowA, RowB};
use serde::{Deserialize, Serialize};

use crate::hash_join::hash_join_aggregate;
use crate::pre_aggregate::pre_aggregate_join;
use crate::AggregateMap;

/// Evaluation strategy for `SELECT A.key, SUM(A.value) FROM A JOIN B USING (key) GROUP BY A.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Build a hash index on A, probe with B, materialize, then group-by-sum.
    HashJoinThenAggregate,
    /// Sum A by key, count B by key, multiply on common keys.
    PreAggregate,
}

impl Strategy {
    pub const ALL: [Self; 2] = [Self::HashJoinThenAggregate, Self::PreAggregate];

    /// Stable identifier used in reports and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HashJoinThenAggregate => "hash-join",
            Self::PreAggregate => "pre-aggregate",
        }
    }

    /// Human-readable label used on the status channel.
    pub const fn label(self) -> &'static str {
        match self {
            Self::HashJoinThenAggregate => "HashJoin-Then-Aggregation",
            Self::PreAggregate => "GroupJoin",
        }
    }

    /// Evaluate the query over read-only views of A and B.
    pub fn evaluate(self, a: &[RowA], b: &[RowB]) -> Result<Evaluation> {
        match self {
            Self::HashJoinThenAggregate => {
                let out = hash_join_aggregate(a, b)?;
                Ok(Evaluation {
                    strategy: self,
                    sums: out.sums,
                    joined_rows: Some(out.joined_rows),
                })
            }
            Self::PreAggregate => {
                let out = pre_aggregate_join(a, b)?;
                Ok(Evaluation {
                    strategy: self,
                    sums: out.sums,
                    joined_rows: None,
                })
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = GroupJoinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hash-join" | "hash_join" | "hashjoin" => Ok(Self::HashJoinThenAggregate),
            "pre-aggregate" | "pre_aggregate" | "groupjoin" | "group-join" => {
                Ok(Self::PreAggregate)
            }
            other => Err(GroupJoinError::invalid_config(format!(
                "unknown strategy `{other}` (expected hash-join|pre-aggregate)"
            ))),
        }
    }
}

/// Unordered result of one evaluation plus what it cost.
#[derive(Debug)]
pub struct Evaluation {
    pub strategy: Strategy,
    pub sums: AggregateMap,
    /// Materialized join cardinality. `None` for strategies that never materialize it.
    pub joined_rows: Option<usize>,
}
