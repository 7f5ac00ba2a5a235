//! Seeded synthetic relations for benchmarking.
//!
//! A is written as `key<delim>value` and B as one key per line, which is the
//! narrow schema the loader reads by default.

use std::fmt;
use std::path::PathBuf;

use gjoin_error::{GroupJoinError, Result};
use gjoin_io::{commit_staged, stage_file, validate_delimiter, write_relation_a, write_relation_b};
use gjoin_types::{Key, RowA, RowB, Value};
use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Smallest and largest value written for the bounded distributions.
const VALUE_RANGE: std::ops::RangeInclusive<Value> = 1..=100;

/// How keys are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyDistribution {
    /// One small pool shared by both relations: heavy duplication, large joins.
    Pooled,
    /// Per relation, `floor(rows * ratio)` distinct keys from `[0, 2 * rows]`,
    /// the remainder duplicates of those.
    Uniqueness(f64),
    /// Keys and values over the full `i32` range; joins are nearly empty.
    Random,
}

impl KeyDistribution {
    pub fn validate(self) -> Result<()> {
        if let Self::Uniqueness(ratio) = self {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(GroupJoinError::invalid_config(format!(
                    "uniqueness {ratio} must be within [0.0, 1.0]"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for KeyDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pooled => f.write_str("pooled"),
            Self::Uniqueness(ratio) => write!(f, "uniqueness({ratio})"),
            Self::Random => f.write_str("random"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    pub rows_a: usize,
    pub rows_b: usize,
    pub distribution: KeyDistribution,
    pub seed: u64,
    pub a_path: PathBuf,
    pub b_path: PathBuf,
    pub delimiter: u8,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            rows_a: 10_000,
            rows_b: 10_000,
            distribution: KeyDistribution::Pooled,
            seed: 0,
            a_path: PathBuf::from("A.txt"),
            b_path: PathBuf::from("B.txt"),
            delimiter: b',',
        }
    }
}

/// Generated rows, kept so callers can inspect what was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub a: Vec<RowA>,
    pub b: Vec<RowB>,
}

/// Draw both relations from one seeded generator.
pub fn generate(
    rows_a: usize,
    rows_b: usize,
    distribution: KeyDistribution,
    seed: u64,
) -> Result<Generated> {
    distribution.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);

    let (keys_a, keys_b) = match distribution {
        KeyDistribution::Pooled => {
            let pool = key_pool(&mut rng, rows_a.saturating_add(rows_b))?;
            (
                sample_from(&mut rng, &pool, rows_a),
                sample_from(&mut rng, &pool, rows_b),
            )
        }
        KeyDistribution::Uniqueness(ratio) => (
            unique_keys(&mut rng, rows_a, ratio)?,
            unique_keys(&mut rng, rows_b, ratio)?,
        ),
        KeyDistribution::Random => (
            (0..rows_a).map(|_| rng.gen_range(Key::MIN..=Key::MAX)).collect(),
            (0..rows_b).map(|_| rng.gen_range(Key::MIN..=Key::MAX)).collect(),
        ),
    };

    let a = keys_a
        .into_iter()
        .map(|key| {
            let value = match distribution {
                KeyDistribution::Random => rng.gen_range(Value::MIN..=Value::MAX),
                _ => rng.gen_range(VALUE_RANGE),
            };
            RowA::new(key, value)
        })
        .collect();
    let b = keys_b.into_iter().map(RowB::new).collect();
    Ok(Generated { a, b })
}

/// Generate and write both files.
pub fn write_generated(config: &GenerateConfig) -> Result<Generated> {
    validate_delimiter(config.delimiter)?;
    let generated = generate(config.rows_a, config.rows_b, config.distribution, config.seed)?;

    let a_file = stage_file(&config.a_path, |out| {
        write_relation_a(out, &generated.a, config.delimiter)
    })?;
    let b_file = stage_file(&config.b_path, |out| write_relation_b(out, &generated.b))?;
    commit_staged(vec![a_file, b_file])?;

    info!(
        a = %config.a_path.display(),
        b = %config.b_path.display(),
        rows_a = generated.a.len(),
        rows_b = generated.b.len(),
        distribution = %config.distribution,
        seed = config.seed,
        "relations generated"
    );
    Ok(generated)
}

fn key_bound(value: usize) -> Result<Key> {
    Key::try_from(value).map_err(|_| {
        GroupJoinError::invalid_config(format!(
            "row count too large for a 32-bit key range: {value}"
        ))
    })
}

/// `max(1, total / 20)` keys drawn from `[0, 5 * pool_size]`.
fn key_pool(rng: &mut StdRng, total_rows: usize) -> Result<Vec<Key>> {
    let pool_size = (total_rows / 20).max(1);
    let range_max = key_bound(pool_size.saturating_mul(5))?;
    Ok((0..pool_size).map(|_| rng.gen_range(0..=range_max)).collect())
}

fn sample_from(rng: &mut StdRng, pool: &[Key], rows: usize) -> Vec<Key> {
    (0..rows).map(|_| pool[rng.gen_range(0..pool.len())]).collect()
}

fn unique_keys(rng: &mut StdRng, rows: usize, ratio: f64) -> Result<Vec<Key>> {
    if rows == 0 {
        return Ok(Vec::new());
    }
    let range_max = key_bound(rows.saturating_mul(2))?;
    let distinct = ((rows as f64 * ratio).floor() as usize).clamp(1, rows);

    // Insertion order, not set order, so output depends only on the seed.
    let mut seen = HashSet::with_capacity(distinct);
    let mut keys = Vec::with_capacity(rows);
    while keys.len() < distinct {
        let key = rng.gen_range(0..=range_max);
        if seen.insert(key) {
            keys.push(key);
        }
    }
    for _ in distinct..rows {
        let key = keys[rng.gen_range(0..distinct)];
        keys.push(key);
    }
    keys.shuffle(rng);
    Ok(keys)
}
