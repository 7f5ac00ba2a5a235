//! Run configuration: which inputs, which strategies, where results go.
//!
//! A [`RunConfig`] can be built in code, deserialized from JSON, or assembled
//! by the CLI on top of a JSON file. Every field has a default, so a partial
//! JSON document is valid.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use gjoin_error::{GroupJoinError, Result};
use gjoin_exec::Strategy;
use gjoin_io::{SourceOptions, validate_delimiter};
use gjoin_types::{SchemaConfig, SchemaPreset};
use serde::{Deserialize, Serialize};

/// Which strategies a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Both strategies, timed, compared, and persisted separately.
    #[default]
    Compare,
    HashJoin,
    PreAggregate,
}

impl RunMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compare => "compare",
            Self::HashJoin => "hash-join",
            Self::PreAggregate => "pre-aggregate",
        }
    }

    /// The single strategy this mode runs, or `None` for [`RunMode::Compare`].
    pub const fn single_strategy(self) -> Option<Strategy> {
        match self {
            Self::Compare => None,
            Self::HashJoin => Some(Strategy::HashJoinThenAggregate),
            Self::PreAggregate => Some(Strategy::PreAggregate),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = GroupJoinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "compare" | "both" => Ok(Self::Compare),
            "hash-join" | "hash_join" | "hashjoin" => Ok(Self::HashJoin),
            "pre-aggregate" | "pre_aggregate" | "groupjoin" => Ok(Self::PreAggregate),
            other => Err(GroupJoinError::invalid_config(format!(
                "unknown mode `{other}` (expected compare|hash-join|pre-aggregate)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub a_path: PathBuf,
    pub b_path: PathBuf,
    pub mode: RunMode,
    pub schema: SchemaPreset,
    /// Overrides the preset's key position for relation B.
    pub b_key_position: Option<usize>,
    pub delimiter: char,
    pub skip_header: bool,
    /// Hash-join result in compare mode.
    pub out_hash: PathBuf,
    /// Pre-aggregate result in compare mode.
    pub out_pre: PathBuf,
    /// Result of a single-strategy run.
    pub out: PathBuf,
    /// Optional JSON run report.
    pub report: Option<PathBuf>,
    /// Render result tables on stdout.
    pub display: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            a_path: PathBuf::from("A.txt"),
            b_path: PathBuf::from("B.txt"),
            mode: RunMode::default(),
            schema: SchemaPreset::default(),
            b_key_position: None,
            delimiter: ',',
            skip_header: false,
            out_hash: PathBuf::from("As.txt"),
            out_pre: PathBuf::from("Bs.txt"),
            out: PathBuf::from("results.txt"),
            report: None,
            display: false,
        }
    }
}

impl RunConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let payload = std::fs::read(path).map_err(|error| {
            GroupJoinError::invalid_config(format!(
                "config file {} unreadable: {error}",
                path.display()
            ))
        })?;
        Self::from_json(&payload).map_err(|error| match error {
            GroupJoinError::InvalidConfig(message) => {
                GroupJoinError::invalid_config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_json(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|error| {
            GroupJoinError::invalid_config(format!("config parse failed: {error}"))
        })
    }

    /// The delimiter as a byte, rejecting anything the loader cannot split on.
    pub fn delimiter_byte(&self) -> Result<u8> {
        let byte = u8::try_from(u32::from(self.delimiter)).map_err(|_| {
            GroupJoinError::invalid_config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            ))
        })?;
        validate_delimiter(byte)?;
        Ok(byte)
    }

    pub fn source_options(&self) -> Result<SourceOptions> {
        Ok(SourceOptions {
            delimiter: self.delimiter_byte()?,
            skip_header: self.skip_header,
        })
    }

    /// The preset with any key-position override applied, validated.
    pub fn schema_config(&self) -> Result<SchemaConfig> {
        let mut schema = self.schema.config();
        if let Some(position) = self.b_key_position {
            schema = schema.with_b_key_position(position);
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Check everything that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        self.schema_config()?;
        if self.mode == RunMode::Compare && self.out_hash == self.out_pre {
            return Err(GroupJoinError::invalid_config(format!(
                "compare mode writes two results; --out-hash and --out-pre both name {}",
                self.out_hash.display()
            )));
        }
        Ok(())
    }
}
