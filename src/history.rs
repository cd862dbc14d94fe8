//! Per-step mean state recorded during a diffusion run.

use core::ops::Index;
use core::slice;

/// Upper bound on the entries reserved up front from a requested step count.
const MAX_RESERVED_STEPS: usize = 1 << 20;

/// Ordered, append-only sequence of per-step state means.
///
/// `history[t]` is the arithmetic mean of the state vector right after step
/// `t`. Only the engine appends; consumers get a read-only, replayable view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    means: Vec<f64>,
}

impl History {
    /// An empty history sized for `steps` entries; very large counts grow on demand.
    pub fn with_capacity(steps: usize) -> Self {
        Self {
            means: Vec::with_capacity(steps.min(MAX_RESERVED_STEPS)),
        }
    }

    pub(crate) fn record(&mut self, mean: f64) {
        self.means.push(mean);
    }

    /// Number of recorded steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.means.len()
    }

    /// `true` when no step has been recorded (e.g. a run with `T = 0`).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Mean after step `step`, if recorded.
    #[inline]
    pub fn get(&self, step: usize) -> Option<f64> {
        self.means.get(step).copied()
    }

    /// Mean after the final step.
    pub fn last(&self) -> Option<f64> {
        self.means.last().copied()
    }

    /// Iterates over the means in step order.
    pub fn iter(&self) -> core::iter::Copied<slice::Iter<'_, f64>> {
        self.means.iter().copied()
    }

    /// The means as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.means
    }

    /// Consumes the history, returning the raw means.
    pub fn into_vec(self) -> Vec<f64> {
        self.means
    }
}

impl From<Vec<f64>> for History {
    fn from(means: Vec<f64>) -> Self {
        Self { means }
    }
}

impl Index<usize> for History {
    type Output = f64;

    fn index(&self, step: usize) -> &f64 {
        &self.means[step]
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = f64;
    type IntoIter = core::iter::Copied<slice::Iter<'a, f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Arithmetic mean of `states`, summed left to right; `0.0` when empty.
pub fn mean(states: &[f64]) -> f64 {
    if states.is_empty() {
        return 0.0;
    }
    states.iter().sum::<f64>() / states.len() as f64
}
