//! Run configuration: defaults, optional JSON file, environment, CLI flags.
//!
//! Precedence, lowest first: [`RunConfig::default`], a JSON file
//! ([`RunConfig::load`]), the `TONEGRAPH_CHUNK_SIZE` environment variable
//! ([`RunConfig::with_env`]), then explicit command-line values set by the
//! caller.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::engine::{validate_alpha, RunParams, SchedulePolicy, Threads, DEFAULT_ALPHA};
use crate::error::{Error, IoStage, Result};
use crate::graph::OutOfRangePolicy;

/// Environment variable overriding the schedule chunk size.
pub const CHUNK_SIZE_ENV: &str = "TONEGRAPH_CHUNK_SIZE";

/// Tunables shared by every run of a process.
///
/// JSON example:
///
/// ```json
/// { "alpha": 0.25, "threads": 8, "schedule": "dynamic", "chunk_size": 256, "out_of_range": "reject" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Propagation coefficient.
    pub alpha: f64,
    /// Worker count; `None` or `0` selects the platform default.
    pub threads: Option<usize>,
    /// Partitioning policy.
    pub schedule: SchedulePolicy,
    /// Chunk size override for static and dynamic schedules.
    pub chunk_size: Option<NonZeroUsize>,
    /// Handling of edges with an endpoint outside `[0, N)`.
    pub out_of_range: OutOfRangePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            threads: None,
            schedule: SchedulePolicy::Auto,
            chunk_size: None,
            out_of_range: OutOfRangePolicy::Drop,
        }
    }
}

impl RunConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(IoStage::ConfigOpen, path, e))?;
        let config = Self::parse_json(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Parses a JSON configuration; absent fields keep their defaults.
    pub fn parse_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Applies [`CHUNK_SIZE_ENV`] from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_chunk_size_var(std::env::var(CHUNK_SIZE_ENV).ok().as_deref())
    }

    /// Applies a raw chunk-size value; unset, unparsable or zero values are ignored.
    #[must_use]
    pub fn with_chunk_size_var(mut self, raw: Option<&str>) -> Self {
        if let Some(chunk) = raw.and_then(|s| s.trim().parse::<NonZeroUsize>().ok()) {
            self.chunk_size = Some(chunk);
        }
        self
    }

    /// Checks the values that do not depend on the graph.
    pub fn validate(&self) -> Result<()> {
        validate_alpha(self.alpha)
    }

    /// Validated engine parameters for a run of `steps` steps.
    pub fn run_params(&self, steps: usize) -> Result<RunParams> {
        self.validate()?;
        Ok(RunParams::new(steps)
            .alpha(self.alpha)
            .threads(Threads::from_count(self.threads.unwrap_or(0)))
            .schedule(self.schedule)
            .chunk_size(self.chunk_size))
    }
}
