//! Input and output glue around the evaluators.
//!
//! - [`source`]: delimited-text loader for relations A and B.
//! - [`sink`]: sorted CSV writer, staged file commits, console table, and
//!   relation writers used by the data generator.

pub mod sink;
pub mod source;

pub use sink::{
    RESULT_HEADER, StagedFile, commit_staged, render_table, stage_file, stage_result,
    write_relation_a, write_relation_b, write_result,
};
pub use source::{
    FromRecord, LoadStats, Loaded, SourceOptions, load_relation, parse_record, read_relation,
    split_fields, validate_delimiter,
};
