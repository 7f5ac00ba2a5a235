//! Error type shared by every crate in the workspace.
//!
//! Errors fall into two classes:
//! - fatal: the run stops immediately, no further strategy executes and no
//!   partial output is written;
//! - local: a single malformed input record, skipped by the loader after a
//!   diagnostic. `MalformedRecord` never escapes a load.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which input relation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationSide {
    /// Build side: rows of `(key, value)`.
    A,
    /// Probe side: rows of `(key)`.
    B,
}

impl std::fmt::Display for RelationSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GroupJoinError {
    /// The input relation could not be opened or read at all.
    #[error("source unavailable: relation {relation} at {path}: {source}")]
    SourceUnavailable {
        relation: RelationSide,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One input line failed field-count or integer validation.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The relation loaded but produced zero valid rows.
    #[error("relation {relation} is empty: a join against nothing is not a meaningful run")]
    EmptyRelation { relation: RelationSide },

    /// The output destination could not be opened or written.
    #[error("sink unavailable: {path}: {source}")]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A 64-bit sum or product does not fit.
    #[error("64-bit accumulator overflow for key {key}")]
    AccumulatorOverflow { key: i32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GroupJoinError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Whether this error must stop the run.
    ///
    /// Only `MalformedRecord` is recoverable; the loader handles it in place.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedRecord { .. })
    }

    /// Process exit status for a fatal error.
    ///
    /// `2` for usage and configuration problems, `1` for everything else.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, GroupJoinError>;
