//! Result sink: sorted delimited output and a console table.
//!
//! Both writers take an [`AggregatedResult`], which is already ordered
//! ascending by key, so the persisted files diff cleanly across strategies.
//!
//! Files are written in two steps. [`stage_file`] writes a temporary file
//! beside the destination; [`commit_staged`] renames a whole batch into place.
//! A failure while staging leaves every destination untouched.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use gjoin_error::{GroupJoinError, Result};
use gjoin_exec::AggregatedResult;
use gjoin_types::{RowA, RowB};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Output header columns.
pub const RESULT_HEADER: [&str; 2] = ["key", "sum"];

/// Write the header and one `key<delim>sum` line per entry.
pub fn write_result<W: Write>(
    mut out: W,
    result: &AggregatedResult,
    delimiter: u8,
) -> io::Result<()> {
    let delim = char::from(delimiter);
    writeln!(out, "{}{delim}{}", RESULT_HEADER[0], RESULT_HEADER[1])?;
    for row in result {
        writeln!(out, "{}{delim}{}", row.key, row.sum)?;
    }
    out.flush()
}

/// A fully written temporary file waiting to replace its destination.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    temp: NamedTempFile,
}

impl StagedFile {
    /// Final destination.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sink_error(path: &Path, source: io::Error) -> GroupJoinError {
    GroupJoinError::SinkUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

/// Run `write` against a temporary file in `path`'s directory.
///
/// Nothing at `path` changes until the returned file is committed.
pub fn stage_file<F>(path: &Path, write: F) -> Result<StagedFile>
where
    F: FnOnce(BufWriter<&mut File>) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".gjoin-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|source| sink_error(path, source))?;
    write(BufWriter::new(temp.as_file_mut())).map_err(|source| sink_error(path, source))?;
    Ok(StagedFile {
        path: path.to_path_buf(),
        temp,
    })
}

/// Stage `result` for `path`.
///
/// Any failure to create or write the temporary file is `SinkUnavailable`;
/// the caller still owns `result` and can retry elsewhere.
pub fn stage_result(path: &Path, result: &AggregatedResult, delimiter: u8) -> Result<StagedFile> {
    stage_file(path, |out| write_result(out, result, delimiter))
}

/// Move every staged file onto its destination, in order.
///
/// If a rename fails, the files already moved by this call are removed and
/// the remaining temporaries are discarded.
pub fn commit_staged(staged: Vec<StagedFile>) -> Result<()> {
    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for StagedFile { path, temp } in staged {
        if let Err(err) = temp.persist(&path) {
            for done in &committed {
                if let Err(remove) = fs::remove_file(done) {
                    warn!(
                        path = %done.display(),
                        error = %remove,
                        "could not remove committed output"
                    );
                }
            }
            return Err(sink_error(&path, err.error));
        }
        info!(path = %path.display(), "output written");
        committed.push(path);
    }
    Ok(())
}

/// Render a titled, human-readable table.
pub fn render_table<W: Write>(
    mut out: W,
    title: &str,
    result: &AggregatedResult,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "--- {title} ---")?;
    writeln!(out, "{}\t|\t{}", RESULT_HEADER[0], RESULT_HEADER[1])?;
    writeln!(out, "--------------------------------")?;
    for row in result {
        writeln!(out, "{}\t|\t{}", row.key, row.sum)?;
    }
    out.flush()
}

/// Write relation A rows as `key<delim>value` lines.
pub fn write_relation_a<W: Write>(mut out: W, rows: &[RowA], delimiter: u8) -> io::Result<()> {
    let delim = char::from(delimiter);
    for row in rows {
        writeln!(out, "{}{delim}{}", row.key, row.value)?;
    }
    out.flush()
}

/// Write relation B rows as one key per line.
pub fn write_relation_b<W: Write>(mut out: W, rows: &[RowB]) -> io::Result<()> {
    for row in rows {
        writeln!(out, "{}", row.key)?;
    }
    out.flush()
}
