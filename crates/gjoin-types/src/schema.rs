//! Positional schema configuration for the two input relations.
//!
//! Input files come in more than one shape: A with 2 or 4 fields, B with 1 or
//! 5 fields, and B's key at position 0 or 1. The shape is chosen explicitly
//! through a [`SchemaPreset`] or a hand-built [`SchemaConfig`]; it is never
//! inferred from the data.

use std::fmt;
use std::str::FromStr;

use gjoin_error::{GroupJoinError, Result};
use serde::{Deserialize, Serialize};

/// Positions of the fields one relation contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSchema {
    /// Exact field count a record must have. `None` accepts any record wide
    /// enough to hold the positions below; extra trailing fields are ignored.
    pub expected_fields: Option<usize>,
    pub key_position: usize,
    /// Only meaningful for relation A.
    pub value_position: Option<usize>,
}

impl RelationSchema {
    pub const fn keyed(expected_fields: Option<usize>, key_position: usize) -> Self {
        Self {
            expected_fields,
            key_position,
            value_position: None,
        }
    }

    pub const fn keyed_value(
        expected_fields: Option<usize>,
        key_position: usize,
        value_position: usize,
    ) -> Self {
        Self {
            expected_fields,
            key_position,
            value_position: Some(value_position),
        }
    }

    /// Smallest field count that holds every configured position.
    pub fn min_fields(&self) -> usize {
        let key = self.key_position + 1;
        let value = self.value_position.map_or(0, |p| p + 1);
        key.max(value)
    }

    /// Whether a record with `fields` fields has the shape this schema expects.
    pub fn accepts_field_count(&self, fields: usize) -> bool {
        match self.expected_fields {
            Some(expected) => fields == expected,
            None => fields >= self.min_fields(),
        }
    }

    fn validate(&self, relation: &str) -> Result<()> {
        if let Some(expected) = self.expected_fields {
            if self.key_position >= expected {
                return Err(GroupJoinError::invalid_config(format!(
                    "relation {relation}: key position {} is outside {expected} fields",
                    self.key_position
                )));
            }
            if let Some(value) = self.value_position {
                if value >= expected {
                    return Err(GroupJoinError::invalid_config(format!(
                        "relation {relation}: value position {value} is outside {expected} fields"
                    )));
                }
            }
        }
        if self.value_position == Some(self.key_position) {
            return Err(GroupJoinError::invalid_config(format!(
                "relation {relation}: key and value share position {}",
                self.key_position
            )));
        }
        Ok(())
    }
}

/// Named input shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaPreset {
    /// A = `key,value`; B = `key`. The shape the generator writes.
    #[default]
    Narrow,
    /// A = 4 fields (key, value, ...); B = 5 fields with the key first.
    Wide,
    /// A = 4 fields; B = 5 fields with the key in the second position.
    WideShifted,
}

impl SchemaPreset {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Wide => "wide",
            Self::WideShifted => "wide-shifted",
        }
    }

    pub const fn config(self) -> SchemaConfig {
        match self {
            Self::Narrow => SchemaConfig {
                a: RelationSchema::keyed_value(Some(2), 0, 1),
                b: RelationSchema::keyed(Some(1), 0),
            },
            Self::Wide => SchemaConfig {
                a: RelationSchema::keyed_value(Some(4), 0, 1),
                b: RelationSchema::keyed(Some(5), 0),
            },
            Self::WideShifted => SchemaConfig {
                a: RelationSchema::keyed_value(Some(4), 0, 1),
                b: RelationSchema::keyed(Some(5), 1),
            },
        }
    }
}

impl fmt::Display for SchemaPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaPreset {
    type Err = GroupJoinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "narrow" => Ok(Self::Narrow),
            "wide" => Ok(Self::Wide),
            "wide-shifted" | "wide_shifted" => Ok(Self::WideShifted),
            other => Err(GroupJoinError::invalid_config(format!(
                "unknown schema preset `{other}` (expected narrow|wide|wide-shifted)"
            ))),
        }
    }
}

/// Schema for both relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub a: RelationSchema,
    pub b: RelationSchema,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaPreset::default().config()
    }
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.a.value_position.is_none() {
            return Err(GroupJoinError::invalid_config(
                "relation A needs a value position",
            ));
        }
        self.a.validate("A")?;
        self.b.validate("B")
    }

    /// Move B's key to another position, widening nothing.
    pub fn with_b_key_position(mut self, position: usize) -> Self {
        self.b.key_position = position;
        self
    }
}
