//! Machine-readable run report.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gjoin_error::{GroupJoinError, Result};
use gjoin_exec::{Equivalence, Strategy};
use gjoin_io::{LoadStats, StagedFile, stage_file};
use gjoin_types::Key;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::benchmark::{SpeedUp, TimedRun, millis};
use crate::config::RunMode;

/// JSON schema version for `RunReport`.
pub const REPORT_SCHEMA_V1: &str = "gjoin.report.v1";

/// Mismatching keys kept per list in a report.
pub const MISMATCH_REPORT_LIMIT: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: String,
    pub mode: RunMode,
    pub a: RelationSummary,
    pub b: RelationSummary,
    pub strategies: Vec<StrategyReport>,
    /// Present in compare mode only.
    pub speed_up: Option<SpeedUp>,
    /// Present in compare mode only.
    pub equivalence: Option<Equivalence>,
}

impl RunReport {
    pub fn new(mode: RunMode, a: RelationSummary, b: RelationSummary) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_V1.to_owned(),
            mode,
            a,
            b,
            strategies: Vec::new(),
            speed_up: None,
            equivalence: None,
        }
    }

    /// Record a comparison verdict, keeping at most
    /// [`MISMATCH_REPORT_LIMIT`] keys per list.
    pub fn set_equivalence(&mut self, equivalence: &Equivalence) {
        self.equivalence = Some(truncate_equivalence(equivalence, MISMATCH_REPORT_LIMIT));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub distinct_keys: usize,
    pub malformed_lines: usize,
}

impl RelationSummary {
    pub fn new(path: &Path, stats: &LoadStats, keys: impl IntoIterator<Item = Key>) -> Self {
        let distinct: HashSet<Key> = keys.into_iter().collect();
        Self {
            path: path.to_path_buf(),
            rows: stats.rows,
            distinct_keys: distinct.len(),
            malformed_lines: stats.malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub duration_us: u64,
    pub duration_ms: f64,
    pub result_keys: usize,
    /// Join cardinality, for strategies that materialize the join.
    pub joined_rows: Option<usize>,
    pub output: PathBuf,
}

impl StrategyReport {
    pub fn new(run: &TimedRun, output: &Path) -> Self {
        Self {
            strategy: run.strategy,
            duration_us: duration_us(run.elapsed),
            duration_ms: millis(run.elapsed),
            result_keys: run.result.len(),
            joined_rows: run.joined_rows,
            output: output.to_path_buf(),
        }
    }
}

fn duration_us(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

fn truncate_equivalence(equivalence: &Equivalence, limit: usize) -> Equivalence {
    match equivalence {
        Equivalence::Match => Equivalence::Match,
        Equivalence::Mismatch {
            only_left,
            only_right,
            differing,
        } => Equivalence::Mismatch {
            only_left: only_left.iter().copied().take(limit).collect(),
            only_right: only_right.iter().copied().take(limit).collect(),
            differing: differing.iter().copied().take(limit).collect(),
        },
    }
}

/// Stage `report` as pretty JSON for `path`.
pub fn stage_run_report(path: &Path, report: &RunReport) -> Result<StagedFile> {
    let payload = serde_json::to_vec_pretty(report)
        .map_err(|error| GroupJoinError::Serialize(format!("run report: {error}")))?;
    stage_file(path, |mut out| {
        out.write_all(&payload)?;
        out.flush()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gjoin_exec::SumMismatch;

    fn summary(rows: usize) -> RelationSummary {
        RelationSummary {
            path: PathBuf::from("A.txt"),
            rows,
            distinct_keys: rows,
            malformed_lines: 0,
        }
    }

    #[test]
    fn distinct_keys_ignore_duplicates() {
        let stats = LoadStats {
            lines: 4,
            rows: 4,
            malformed: 0,
            blank: 0,
        };
        let summary = RelationSummary::new(Path::new("B.txt"), &stats, [1, 1, 2, 1]);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.distinct_keys, 2);
    }

    #[test]
    fn mismatch_lists_are_capped() {
        let big = Equivalence::Mismatch {
            only_left: (0..100).collect(),
            only_right: vec![7],
            differing: vec![SumMismatch {
                key: 3,
                left: 1,
                right: 2,
            }],
        };
        let mut report = RunReport::new(RunMode::Compare, summary(1), summary(1));
        report.set_equivalence(&big);
        match report.equivalence.unwrap() {
            Equivalence::Mismatch {
                only_left,
                only_right,
                differing,
            } => {
                assert_eq!(only_left.len(), MISMATCH_REPORT_LIMIT);
                assert_eq!(only_right, vec![7]);
                assert_eq!(differing.len(), 1);
            }
            Equivalence::Match => panic!("verdict lost"),
        }
    }

    #[test]
    fn json_carries_schema_version_and_verdict() {
        let mut report = RunReport::new(RunMode::Compare, summary(3), summary(2));
        report.speed_up = Some(SpeedUp::from_durations(
            Duration::from_millis(4),
            Duration::from_millis(2),
        ));
        report.set_equivalence(&Equivalence::Match);

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["schema_version"], REPORT_SCHEMA_V1);
        assert_eq!(json["mode"], "compare");
        assert_eq!(json["speed_up"]["kind"], "ratio");
        assert_eq!(json["equivalence"]["verdict"], "match");
    }
}
