//! Delimited-text relation loader.
//!
//! One record per line, fields split on a single-byte delimiter and trimmed
//! of surrounding whitespace. A line with the wrong field count or a
//! non-integer key/value is skipped with a diagnostic; the load continues.
//! Blank lines are not records and are skipped silently.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use gjoin_error::{GroupJoinError, RelationSide, Result};
use gjoin_types::{Relation, RelationSchema, RowA, RowB};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

/// Malformed lines reported individually at `warn`; the rest go to `debug`.
const MALFORMED_WARN_LIMIT: usize = 16;

/// Parsing options shared by both relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Field delimiter. Must be a single ASCII byte; see [`validate_delimiter`].
    pub delimiter: u8,
    /// Ignore the first line of the input.
    pub skip_header: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            skip_header: false,
        }
    }
}

/// Check that `delimiter` can split a line without splitting a UTF-8 sequence,
/// a line ending, or an integer literal.
pub fn validate_delimiter(delimiter: u8) -> Result<()> {
    if !delimiter.is_ascii() || matches!(delimiter, b'\n' | b'\r' | b' ' | 0) {
        return Err(GroupJoinError::invalid_config(format!(
            "delimiter {:?} must be an ASCII character other than space or a line ending",
            char::from(delimiter)
        )));
    }
    if delimiter.is_ascii_digit() || delimiter == b'-' || delimiter == b'+' {
        return Err(GroupJoinError::invalid_config(format!(
            "delimiter {:?} collides with integer syntax",
            char::from(delimiter)
        )));
    }
    Ok(())
}

const fn is_field_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Split one line into trimmed fields.
///
/// A trailing delimiter does not open an extra empty field.
pub fn split_fields(line: &str, delimiter: u8) -> SmallVec<[&str; 8]> {
    let mut fields = SmallVec::new();
    let mut start = 0;
    for pos in memchr::memchr_iter(delimiter, line.as_bytes()) {
        fields.push(line[start..pos].trim_matches(is_field_space));
        start = pos + 1;
    }
    if start < line.len() || fields.is_empty() {
        fields.push(line[start..].trim_matches(is_field_space));
    }
    fields
}

fn parse_int(fields: &[&str], position: usize, what: &str) -> std::result::Result<i32, String> {
    let raw = fields
        .get(position)
        .ok_or_else(|| format!("{what} position {position} missing"))?;
    raw.parse::<i32>()
        .map_err(|err| format!("{what} field `{raw}` is not a 32-bit integer: {err}"))
}

/// A row type that can be built from one delimited record.
pub trait FromRecord: Sized {
    const SIDE: RelationSide;

    fn from_fields(fields: &[&str], schema: &RelationSchema) -> std::result::Result<Self, String>;
}

impl FromRecord for RowA {
    const SIDE: RelationSide = RelationSide::A;

    fn from_fields(fields: &[&str], schema: &RelationSchema) -> std::result::Result<Self, String> {
        let value_position = schema
            .value_position
            .ok_or_else(|| "schema for A has no value position".to_owned())?;
        Ok(Self {
            key: parse_int(fields, schema.key_position, "key")?,
            value: parse_int(fields, value_position, "value")?,
        })
    }
}

impl FromRecord for RowB {
    const SIDE: RelationSide = RelationSide::B;

    fn from_fields(fields: &[&str], schema: &RelationSchema) -> std::result::Result<Self, String> {
        Ok(Self {
            key: parse_int(fields, schema.key_position, "key")?,
        })
    }
}

/// Parse one line. Field count is checked before any integer parsing.
pub fn parse_record<R: FromRecord>(
    line: &str,
    line_no: usize,
    schema: &RelationSchema,
    delimiter: u8,
) -> Result<R> {
    let fields = split_fields(line, delimiter);
    if !schema.accepts_field_count(fields.len()) {
        let expected = schema.expected_fields.map_or_else(
            || format!("at least {}", schema.min_fields()),
            |n| n.to_string(),
        );
        return Err(GroupJoinError::malformed(
            line_no,
            format!("expected {expected} fields, found {}", fields.len()),
        ));
    }
    R::from_fields(&fields, schema).map_err(|reason| GroupJoinError::malformed(line_no, reason))
}

/// Counters from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub lines: usize,
    pub rows: usize,
    pub malformed: usize,
    pub blank: usize,
}

/// A loaded relation with its load counters.
#[derive(Debug, Clone)]
pub struct Loaded<R> {
    pub relation: Relation<R>,
    pub stats: LoadStats,
}

/// Read a relation from any buffered reader.
///
/// `origin` only labels diagnostics. Read failures are returned as plain
/// I/O errors; [`load_relation`] gives them the relation and path.
pub fn read_relation<R: FromRecord, B: BufRead>(
    mut reader: B,
    origin: &str,
    schema: &RelationSchema,
    options: &SourceOptions,
) -> std::io::Result<Loaded<R>> {
    let mut rows = Vec::new();
    let mut stats = LoadStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        stats.lines += 1;
        let line_no = stats.lines;
        if options.skip_header && line_no == 1 {
            continue;
        }

        let parsed = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim_matches(is_field_space).is_empty() => {
                stats.blank += 1;
                continue;
            }
            Ok(line) => {
                let line = line.trim_end_matches(['\n', '\r']);
                parse_record::<R>(line, line_no, schema, options.delimiter)
            }
            Err(err) => Err(GroupJoinError::malformed(
                line_no,
                format!("invalid UTF-8: {err}"),
            )),
        };

        match parsed {
            Ok(row) => {
                rows.push(row);
                stats.rows += 1;
            }
            Err(err) => {
                stats.malformed += 1;
                if stats.malformed <= MALFORMED_WARN_LIMIT {
                    warn!(
                        relation = %R::SIDE,
                        origin,
                        line = line_no,
                        error = %err,
                        "skipping malformed record"
                    );
                } else {
                    debug!(
                        relation = %R::SIDE,
                        origin,
                        line = line_no,
                        error = %err,
                        "skipping malformed record"
                    );
                }
            }
        }
    }

    if stats.malformed > MALFORMED_WARN_LIMIT {
        warn!(
            relation = %R::SIDE,
            origin,
            malformed = stats.malformed,
            reported = MALFORMED_WARN_LIMIT,
            "further malformed records were logged at debug level"
        );
    }

    Ok(Loaded {
        relation: Relation::new(rows),
        stats,
    })
}

/// Open `path` and load it as relation `R`.
///
/// Fails with `SourceUnavailable` only if the file cannot be opened or read.
/// An empty result is returned as-is; whether that is fatal is the caller's call.
pub fn load_relation<R: FromRecord>(
    path: &Path,
    schema: &RelationSchema,
    options: &SourceOptions,
) -> Result<Loaded<R>> {
    let unavailable = |source| GroupJoinError::SourceUnavailable {
        relation: R::SIDE,
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unavailable)?;
    let origin = path.display().to_string();
    let loaded = read_relation::<R, _>(BufReader::new(file), &origin, schema, options)
        .map_err(unavailable)?;

    info!(
        relation = %R::SIDE,
        path = %origin,
        rows = loaded.stats.rows,
        malformed = loaded.stats.malformed,
        "relation loaded"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gjoin_types::SchemaPreset;

    fn narrow() -> (RelationSchema, RelationSchema) {
        let config = SchemaPreset::Narrow.config();
        (config.a, config.b)
    }

    #[test]
    fn split_trims_each_field() {
        let fields = split_fields(" 300 ,\t25 , 'A', 1.5", b',');
        assert_eq!(fields.as_slice(), &["300", "25", "'A'", "1.5"]);
    }

    #[test]
    fn split_ignores_one_trailing_delimiter() {
        assert_eq!(split_fields("1,2,", b',').as_slice(), &["1", "2"]);
        assert_eq!(split_fields("1,,2", b',').as_slice(), &["1", "", "2"]);
        assert_eq!(split_fields("", b',').as_slice(), &[""]);
    }

    #[test]
    fn split_with_other_delimiter() {
        assert_eq!(split_fields("4|5", b'|').as_slice(), &["4", "5"]);
        assert_eq!(split_fields("4,5", b'|').as_slice(), &["4,5"]);
    }

    #[test]
    fn parse_row_a_narrow() {
        let (a, _) = narrow();
        let row: RowA = parse_record("7, -3", 1, &a, b',').unwrap();
        assert_eq!(row, RowA::new(7, -3));
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        let (a, b) = narrow();
        let err = parse_record::<RowA>("7", 4, &a, b',').unwrap_err();
        assert!(matches!(err, GroupJoinError::MalformedRecord { line: 4, .. }));
        assert!(parse_record::<RowB>("1,2", 1, &b, b',').is_err());
    }

    #[test]
    fn parse_rejects_non_integer_and_out_of_range() {
        let (a, _) = narrow();
        assert!(parse_record::<RowA>("x,1", 1, &a, b',').is_err());
        assert!(parse_record::<RowA>("1,2147483648", 1, &a, b',').is_err());
        assert!(parse_record::<RowA>("1,12abc", 1, &a, b',').is_err());
    }

    #[test]
    fn wide_shifted_reads_second_field_as_key() {
        let schema = SchemaPreset::WideShifted.config().b;
        let row: RowB = parse_record("1, 300, 1, 'A', 1.5", 1, &schema, b',').unwrap();
        assert_eq!(row.key, 300);
    }

    #[test]
    fn read_skips_malformed_and_blank_lines() {
        let (a, _) = narrow();
        let input = "1,10\n\nbad,line\n2,20\r\n3\n";
        let loaded: Loaded<RowA> =
            read_relation(input.as_bytes(), "inline", &a, &SourceOptions::default()).unwrap();

        assert_eq!(
            loaded.relation.rows(),
            &[RowA::new(1, 10), RowA::new(2, 20)]
        );
        assert_eq!(
            loaded.stats,
            LoadStats {
                lines: 5,
                rows: 2,
                malformed: 2,
                blank: 1,
            }
        );
    }

    #[test]
    fn read_honours_skip_header() {
        let (_, b) = narrow();
        let options = SourceOptions {
            skip_header: true,
            ..SourceOptions::default()
        };
        let loaded: Loaded<RowB> =
            read_relation("key\n5\n6\n".as_bytes(), "inline", &b, &options).unwrap();
        assert_eq!(loaded.relation.rows(), &[RowB::new(5), RowB::new(6)]);
        assert_eq!(loaded.stats.malformed, 0);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let (_, b) = narrow();
        let input: &[u8] = b"1\n\xff\xfe\n2\n";
        let loaded: Loaded<RowB> =
            read_relation(input, "inline", &b, &SourceOptions::default()).unwrap();
        assert_eq!(loaded.relation.len(), 2);
        assert_eq!(loaded.stats.malformed, 1);
    }

    #[test]
    fn delimiter_validation() {
        validate_delimiter(b',').unwrap();
        validate_delimiter(b'|').unwrap();
        validate_delimiter(b'\t').unwrap();
        assert!(validate_delimiter(b' ').is_err());
        assert!(validate_delimiter(b'\n').is_err());
        assert!(validate_delimiter(b'-').is_err());
        assert!(validate_delimiter(b'5').is_err());
        assert!(validate_delimiter(0xC3).is_err());
    }
}
