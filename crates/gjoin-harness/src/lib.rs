//! Run orchestration for the group-join benchmark.
//!
//! [`run::execute`] loads both relations once, times each strategy over the
//! same read-only snapshots, writes the sorted results, and reports the
//! speed-up. [`datagen`] produces seeded input files to run against.

pub mod benchmark;
pub mod config;
pub mod datagen;
pub mod report;
pub mod run;

pub use benchmark::{
    Comparison, DEGENERATE_TIMING_NOTICE, SpeedUp, TimedRun, compare_strategies, millis,
    time_strategy,
};
pub use config::{RunConfig, RunMode};
pub use datagen::{GenerateConfig, Generated, KeyDistribution, generate, write_generated};
pub use report::{
    MISMATCH_REPORT_LIMIT, REPORT_SCHEMA_V1, RelationSummary, RunReport, StrategyReport,
    stage_run_report,
};
pub use run::{RunOutcome, execute};
