//! Text formats exchanged with external tooling.
//!
//! - state files: one value per line in node order; blank and `#` lines are
//!   skipped when reading, as are lines whose first token is not a number
//! - history files: one per-step mean per line in step order
//! - graph files: `N M` header, then one `u v` edge per line
//!
//! Values are written with the shortest representation that parses back to the
//! same `f64`, so a write/read cycle is exact.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, IoStage, Result};
use crate::graph::InfluenceGraph;
use crate::history::History;

/// Reads exactly `expected` state values from the file at `path`.
///
/// Extra values after the first `expected` are ignored. Fewer values fail with
/// [`Error::StateSizeMismatch`].
pub fn read_states(path: impl AsRef<Path>, expected: usize) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(IoStage::StateOpen, path, e))?;
    states_from(BufReader::new(file), expected, path)
}

/// Reads exactly `expected` state values from any buffered reader.
pub fn read_states_from<R: BufRead>(reader: R, expected: usize) -> Result<Vec<f64>> {
    states_from(reader, expected, Path::new("<reader>"))
}

fn states_from<R: BufRead>(reader: R, expected: usize, origin: &Path) -> Result<Vec<f64>> {
    let values = read_values(reader, Some(expected))
        .map_err(|e| Error::io(IoStage::StateOpen, origin, e))?;
    if values.len() < expected {
        return Err(Error::StateSizeMismatch {
            expected,
            found: values.len(),
        });
    }
    debug!(origin = %origin.display(), values = values.len(), "read states");
    Ok(values)
}

/// Upper bound on the value buffer reserved from a caller-supplied count.
const MAX_RESERVED_VALUES: usize = 1 << 24;

/// Line iterator over raw bytes.
///
/// Unlike [`BufRead::lines`], bytes that are not valid UTF-8 do not fail the
/// read: they are replaced with `U+FFFD`, so such lines end up as comments or
/// unparsable noise. A trailing `\r` is stripped.
pub(crate) struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let mut line: &[u8] = &self.buf;
                if let Some(rest) = line.strip_suffix(b"\n") {
                    line = rest;
                }
                if let Some(rest) = line.strip_suffix(b"\r") {
                    line = rest;
                }
                Some(Ok(String::from_utf8_lossy(line).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Writes one state value per line.
pub fn write_states(path: impl AsRef<Path>, states: &[f64]) -> Result<()> {
    let path = path.as_ref();
    write_file(path, |w| write_values(w, states.iter().copied()))?;
    debug!(path = %path.display(), values = states.len(), "wrote states");
    Ok(())
}

/// Writes one per-step mean per line.
pub fn write_history(path: impl AsRef<Path>, history: &History) -> Result<()> {
    let path = path.as_ref();
    write_file(path, |w| write_values(w, history.iter()))?;
    debug!(path = %path.display(), steps = history.len(), "wrote history");
    Ok(())
}

/// Reads a history file back into a [`History`].
pub fn read_history(path: impl AsRef<Path>) -> Result<History> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(IoStage::HistoryOpen, path, e))?;
    let values = read_values(BufReader::new(file), None)
        .map_err(|e| Error::io(IoStage::HistoryOpen, path, e))?;
    Ok(History::from(values))
}

/// Writes `graph` in the edge-list format accepted by [`GraphLoader`](crate::graph::GraphLoader).
pub fn write_graph(path: impl AsRef<Path>, graph: &InfluenceGraph) -> Result<()> {
    let path = path.as_ref();
    write_file(path, |w| {
        writeln!(w, "{} {}", graph.node_count(), graph.edge_count())?;
        for (u, v) in graph.edges() {
            writeln!(w, "{u} {v}")?;
        }
        Ok(())
    })
}

fn write_file(path: &Path, body: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(IoStage::OutputWrite, path, e))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| Error::io(IoStage::OutputWrite, path, e))
}

/// Writes each value on its own line.
pub fn write_values<W: Write>(writer: &mut W, values: impl IntoIterator<Item = f64>) -> io::Result<()> {
    for value in values {
        writeln!(writer, "{value}")?;
    }
    Ok(())
}

/// Parses the first token of every significant line as `f64`, stopping after `limit` values.
pub fn read_values<R: BufRead>(reader: R, limit: Option<usize>) -> io::Result<Vec<f64>> {
    let mut values = Vec::with_capacity(limit.unwrap_or(0).min(MAX_RESERVED_VALUES));
    if limit == Some(0) {
        return Ok(values);
    }
    for line in LossyLines::new(reader) {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(value) = line.split_whitespace().next().and_then(|t| t.parse::<f64>().ok()) else {
            continue;
        };
        values.push(value);
        if limit == Some(values.len()) {
            break;
        }
    }
    Ok(values)
}
