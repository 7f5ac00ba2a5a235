//! Single-shot timing of each strategy over already-loaded relations.
//!
//! Loading is never inside a timer. Each strategy runs exactly once; repeated
//! measurement belongs to the criterion bench, not here.

use std::fmt;
use std::time::{Duration, Instant};

use gjoin_error::Result;
use gjoin_exec::{AggregatedResult, Strategy};
use gjoin_types::{RowA, RowB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

/// Notice printed in place of a ratio when the denominator measured zero.
pub const DEGENERATE_TIMING_NOTICE: &str =
    "pre-aggregate duration measured as zero; speed-up is undefined at this timer resolution";

/// One strategy's sorted result and what it cost.
#[derive(Debug, Clone)]
pub struct TimedRun {
    pub strategy: Strategy,
    pub result: AggregatedResult,
    pub elapsed: Duration,
    pub joined_rows: Option<usize>,
}

/// Run `strategy` once over read-only views of `a` and `b`.
///
/// The timer covers evaluation only. Sorting into an [`AggregatedResult`]
/// happens after the clock stops.
pub fn time_strategy(strategy: Strategy, a: &[RowA], b: &[RowB]) -> Result<TimedRun> {
    let _span = info_span!("strategy", strategy = strategy.as_str()).entered();
    let started = Instant::now();
    let evaluation = strategy.evaluate(a, b)?;
    let elapsed = started.elapsed();
    debug!(
        strategy = strategy.as_str(),
        elapsed_us = elapsed.as_micros(),
        keys = evaluation.sums.len(),
        "strategy finished"
    );
    Ok(TimedRun {
        strategy,
        joined_rows: evaluation.joined_rows,
        result: AggregatedResult::from_map(evaluation.sums),
        elapsed,
    })
}

/// `duration(hash join) / duration(pre-aggregate)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeedUp {
    Ratio { value: f64 },
    Degenerate { notice: String },
}

impl SpeedUp {
    pub fn from_durations(hash_join: Duration, pre_aggregate: Duration) -> Self {
        if pre_aggregate.is_zero() {
            return Self::Degenerate {
                notice: DEGENERATE_TIMING_NOTICE.to_owned(),
            };
        }
        Self::Ratio {
            value: hash_join.as_secs_f64() / pre_aggregate.as_secs_f64(),
        }
    }

    pub const fn ratio(&self) -> Option<f64> {
        match self {
            Self::Ratio { value } => Some(*value),
            Self::Degenerate { .. } => None,
        }
    }
}

impl fmt::Display for SpeedUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ratio { value } => write!(f, "{value:.3}"),
            Self::Degenerate { notice } => f.write_str(notice),
        }
    }
}

/// Both strategies, timed back to back.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub hash_join: TimedRun,
    pub pre_aggregate: TimedRun,
    pub speed_up: SpeedUp,
}

/// Run hash join then pre-aggregation, each once.
///
/// A failing first strategy stops before the second starts.
pub fn compare_strategies(a: &[RowA], b: &[RowB]) -> Result<Comparison> {
    let hash_join = time_strategy(Strategy::HashJoinThenAggregate, a, b)?;
    let pre_aggregate = time_strategy(Strategy::PreAggregate, a, b)?;
    let speed_up = SpeedUp::from_durations(hash_join.elapsed, pre_aggregate.elapsed);
    Ok(Comparison {
        hash_join,
        pre_aggregate,
        speed_up,
    })
}

/// Milliseconds with microsecond precision, for status lines.
pub fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use gjoin_types::{relation_a, relation_b};

    #[test]
    fn zero_denominator_is_degenerate_not_a_panic() {
        let speed_up = SpeedUp::from_durations(Duration::from_millis(5), Duration::ZERO);
        assert_eq!(speed_up.ratio(), None);
        assert_eq!(speed_up.to_string(), DEGENERATE_TIMING_NOTICE);
    }

    #[test]
    fn ratio_is_hash_over_pre() {
        let speed_up =
            SpeedUp::from_durations(Duration::from_millis(30), Duration::from_millis(10));
        let ratio = speed_up.ratio().unwrap();
        assert!((ratio - 3.0).abs() < 1e-9);
        assert_eq!(speed_up.to_string(), "3.000");
    }

    #[test]
    fn zero_numerator_is_a_valid_ratio() {
        let speed_up = SpeedUp::from_durations(Duration::ZERO, Duration::from_micros(1));
        assert_eq!(speed_up.ratio(), Some(0.0));
    }

    #[test]
    fn comparison_runs_both_and_leaves_inputs_alone() {
        let a = relation_a(&[(1, 10), (1, 20), (2, 5), (3, 7)]);
        let b = relation_b(&[1, 1, 2, 4]);
        let before = (a.clone(), b.clone());

        let comparison = compare_strategies(&a, &b).unwrap();
        assert_eq!(comparison.hash_join.result, comparison.pre_aggregate.result);
        assert_eq!(comparison.hash_join.joined_rows, Some(5));
        assert_eq!(comparison.pre_aggregate.joined_rows, None);
        assert_eq!(comparison.hash_join.result.get(1), Some(60));
        assert_eq!((a, b), before);
    }
}
