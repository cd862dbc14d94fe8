//! Error taxonomy for loading, running and persisting a diffusion.
//!
//! Every variant is fatal. Recoverable data-quality problems (edge-count
//! mismatches, out-of-range endpoints) are not errors: they are recorded in
//! [`LoadReport`](crate::graph::LoadReport) and logged as warnings.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which file operation an [`Error::Io`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    /// Opening or reading the graph edge list.
    GraphOpen,
    /// Opening or reading the initial state vector.
    StateOpen,
    /// Opening or reading a history file.
    HistoryOpen,
    /// Opening or reading a JSON run configuration.
    ConfigOpen,
    /// Creating or writing any output file.
    OutputWrite,
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GraphOpen => "cannot read graph file",
            Self::StateOpen => "cannot read state file",
            Self::HistoryOpen => "cannot read history file",
            Self::ConfigOpen => "cannot read config file",
            Self::OutputWrite => "cannot write output file",
        })
    }
}

/// Errors produced by `tonegraph`.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed invocation.
    #[error("usage error: {0}")]
    Usage(String),

    /// A file could not be opened, read or written.
    #[error("{stage} {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        stage: IoStage,
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The graph header is missing, declares no nodes, or an edge was rejected.
    #[error("malformed graph: {0}")]
    GraphFormat(String),

    /// The initial state vector does not cover every node.
    #[error("state vector has {found} values but the graph has {expected} nodes")]
    StateSizeMismatch {
        /// Node count of the graph.
        expected: usize,
        /// Number of values actually available.
        found: usize,
    },

    /// The propagation coefficient lies outside `[0, 1]` or is not finite.
    #[error("propagation coefficient must lie in [0, 1], got {0}")]
    InvalidAlpha(f64),

    /// The worker pool could not be started.
    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A JSON configuration file did not parse.
    #[error("invalid config {}: {source}", path.display())]
    Config {
        /// The offending path.
        path: PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(stage: IoStage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error.
    ///
    /// | code | cause |
    /// |------|-------|
    /// | 1 | bad invocation |
    /// | 2 | graph file cannot be read |
    /// | 3 | state (or history) file cannot be read |
    /// | 4 | too few state values |
    /// | 5 | output cannot be written |
    /// | 6 | missing or invalid graph header |
    /// | 7 | alpha outside `[0, 1]` |
    /// | 8 | config file unreadable or invalid |
    /// | 9 | worker pool failure |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 1,
            Self::Io { stage, .. } => match stage {
                IoStage::GraphOpen => 2,
                IoStage::StateOpen | IoStage::HistoryOpen => 3,
                IoStage::OutputWrite => 5,
                IoStage::ConfigOpen => 8,
            },
            Self::StateSizeMismatch { .. } => 4,
            Self::GraphFormat(_) => 6,
            Self::InvalidAlpha(_) => 7,
            Self::Config { .. } => 8,
            Self::ThreadPool(_) => 9,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_failure_class() {
        let errors = [
            Error::Usage("missing STEPS".into()),
            Error::io(IoStage::GraphOpen, "g.txt", io::ErrorKind::NotFound.into()),
            Error::io(IoStage::StateOpen, "s.txt", io::ErrorKind::NotFound.into()),
            Error::StateSizeMismatch {
                expected: 3,
                found: 2,
            },
            Error::io(IoStage::OutputWrite, "o.txt", io::ErrorKind::PermissionDenied.into()),
            Error::GraphFormat("no header".into()),
            Error::InvalidAlpha(1.5),
        ];
        let mut codes: Vec<u8> = errors.iter().map(Error::exit_code).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn io_error_names_the_path() {
        let err = Error::io(IoStage::GraphOpen, "data/graph.txt", io::ErrorKind::NotFound.into());
        let msg = err.to_string();
        assert!(msg.contains("data/graph.txt"), "{msg}");
        assert!(msg.starts_with("cannot read graph file"), "{msg}");
    }
}
