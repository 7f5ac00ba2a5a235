//! One end-to-end run: load, evaluate, compare, persist, report.
//!
//! Sequencing is strict. Both relations are loaded and checked for emptiness
//! before any strategy runs. Result files and the report are staged beside
//! their destinations and committed together once all of them are written,
//! so a fatal error never leaves partial output.

use std::io::Write;

use gjoin_error::{GroupJoinError, RelationSide, Result};
use gjoin_exec::{Equivalence, compare_results};
use gjoin_io::{Loaded, commit_staged, load_relation, render_table, stage_result};
use gjoin_types::{RowA, RowB};
use tracing::{error, info, info_span};

use crate::benchmark::{SpeedUp, compare_strategies, millis, time_strategy};
use crate::config::RunConfig;
use crate::report::{RelationSummary, RunReport, StrategyReport, stage_run_report};

/// How a run that got as far as writing results ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Compare mode only: both results were written but disagree.
    Mismatch(RunReport),
}

impl RunOutcome {
    pub const fn report(&self) -> &RunReport {
        match self {
            Self::Completed(report) | Self::Mismatch(report) => report,
        }
    }

    /// `0` on success, `3` on a strategy mismatch.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::Mismatch(_) => 3,
        }
    }
}

/// Execute `config`, writing status lines to `status`.
pub fn execute<W: Write>(config: &RunConfig, status: &mut W) -> Result<RunOutcome> {
    config.validate()?;
    let schema = config.schema_config()?;
    let options = config.source_options()?;
    let _span = info_span!("run", mode = config.mode.as_str()).entered();

    let a: Loaded<RowA> = load_relation(&config.a_path, &schema.a, &options)?;
    let b: Loaded<RowB> = load_relation(&config.b_path, &schema.b, &options)?;
    if a.relation.is_empty() {
        return Err(GroupJoinError::EmptyRelation {
            relation: RelationSide::A,
        });
    }
    if b.relation.is_empty() {
        return Err(GroupJoinError::EmptyRelation {
            relation: RelationSide::B,
        });
    }

    let mut report = RunReport::new(
        config.mode,
        RelationSummary::new(&config.a_path, &a.stats, a.relation.iter().map(|r| r.key)),
        RelationSummary::new(&config.b_path, &b.stats, b.relation.iter().map(|r| r.key)),
    );

    let mut staged = Vec::with_capacity(3);
    let outcome = match config.mode.single_strategy() {
        None => {
            let comparison = compare_strategies(&a.relation, &b.relation)?;
            let hash = &comparison.hash_join;
            let pre = &comparison.pre_aggregate;
            writeln!(
                status,
                "Execution Time ({}): {:.3} ms",
                hash.strategy.label(),
                millis(hash.elapsed)
            )?;
            writeln!(
                status,
                "Execution Time ({}): {:.3} ms",
                pre.strategy.label(),
                millis(pre.elapsed)
            )?;
            match &comparison.speed_up {
                SpeedUp::Ratio { .. } => writeln!(status, "Speed Up: {}", comparison.speed_up)?,
                SpeedUp::Degenerate { notice } => writeln!(status, "Fatal Error: {notice}")?,
            }

            staged.push(stage_result(&config.out_hash, &hash.result, options.delimiter)?);
            staged.push(stage_result(&config.out_pre, &pre.result, options.delimiter)?);
            if config.display {
                let hash_title = format!("{} Results", hash.strategy.label());
                let pre_title = format!("{} Results", pre.strategy.label());
                render_table(&mut *status, &hash_title, &hash.result)?;
                render_table(&mut *status, &pre_title, &pre.result)?;
            }

            let equivalence = compare_results(&hash.result, &pre.result);
            report.strategies.push(StrategyReport::new(hash, &config.out_hash));
            report.strategies.push(StrategyReport::new(pre, &config.out_pre));
            report.speed_up = Some(comparison.speed_up.clone());
            report.set_equivalence(&equivalence);

            match &equivalence {
                Equivalence::Match => RunOutcome::Completed(report),
                Equivalence::Mismatch {
                    only_left,
                    only_right,
                    differing,
                } => {
                    error!(
                        only_hash_join = only_left.len(),
                        only_pre_aggregate = only_right.len(),
                        differing = differing.len(),
                        "strategies disagree"
                    );
                    RunOutcome::Mismatch(report)
                }
            }
        }
        Some(strategy) => {
            let run = time_strategy(strategy, &a.relation, &b.relation)?;
            writeln!(
                status,
                "Execution Time ({}): {:.3} ms",
                strategy.label(),
                millis(run.elapsed)
            )?;
            staged.push(stage_result(&config.out, &run.result, options.delimiter)?);
            if config.display {
                render_table(&mut *status, &format!("{} Results", strategy.label()), &run.result)?;
            }
            report.strategies.push(StrategyReport::new(&run, &config.out));
            RunOutcome::Completed(report)
        }
    };

    if let Some(path) = &config.report {
        staged.push(stage_run_report(path, outcome.report())?);
    }
    let written = staged.len();
    commit_staged(staged)?;
    info!(files = written, "run outputs committed");
    Ok(outcome)
}
