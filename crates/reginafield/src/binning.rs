//! Quantile statistics and quantile binning.
//!
//! Tiers, shells and anomaly bands all share one algorithm:
//! 1. `n + 1` edges at evenly spaced probabilities (linear interpolation),
//! 2. repair so the edges are strictly increasing,
//! 3. place each value in the right-closed bin that contains it, with the
//!    lowest bin closed on both ends.
//!
//! `NaN` values are skipped when computing statistics and never land in a bin.

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

/// Gap enforced between two edges that collapsed onto each other.
pub const EDGE_EPSILON: f64 = 1e-9;

/// Ascending copy of the non-`NaN` values.
pub fn sorted_present(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear-interpolation quantile of an ascending slice.
///
/// Returns `None` for an empty slice. `q` is clamped to `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let (a, b) = (sorted[lo], sorted[hi]);
    let t = pos - lo as f64;
    // Interpolate from the nearer end to keep the result inside [a, b].
    if t < 0.5 {
        Some(a + (b - a) * t)
    } else {
        Some(b - (b - a) * (1.0 - t))
    }
}

/// Linear-interpolation quantile of unsorted values, ignoring `NaN`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted_present(values), q)
}

/// Smallest representable `f64` strictly greater than `x`.
fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Value `EDGE_EPSILON` above `left`, or the next float when the gap rounds away.
fn nudge_above(left: f64) -> f64 {
    let stepped = left + EDGE_EPSILON;
    if stepped > left {
        stepped
    } else {
        next_up(left)
    }
}

/// Strictly increasing bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
    /// How many edges had to be moved to restore strict ordering.
    nudged: usize,
}

impl BinEdges {
    /// Quantile edges for `n_bins` bins over `values`.
    ///
    /// When no value is present the edge set is empty and every value is
    /// unbinned.
    pub fn from_values(values: &[f64], n_bins: usize) -> Result<Self> {
        if n_bins == 0 {
            return Err(FieldError::InvalidParameter(
                "number of bins must be at least 1".to_string(),
            ));
        }
        let sorted = sorted_present(values);
        if sorted.is_empty() {
            return Ok(Self {
                edges: Vec::new(),
                nudged: 0,
            });
        }
        let edges = (0..=n_bins)
            .filter_map(|i| quantile_sorted(&sorted, i as f64 / n_bins as f64))
            .collect();
        Ok(Self::repaired(edges))
    }

    /// Take raw edges and move every non-increasing edge just above its left neighbour.
    pub fn repaired(mut edges: Vec<f64>) -> Self {
        let mut nudged = 0;
        for i in 1..edges.len() {
            if edges[i] <= edges[i - 1] {
                edges[i] = nudge_above(edges[i - 1]);
                nudged += 1;
            }
        }
        Self { edges, nudged }
    }

    /// Edge values, lowest first.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins described by the edges.
    pub fn n_bins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Number of edges moved during repair.
    pub fn nudged(&self) -> usize {
        self.nudged
    }

    /// Whether every edge is strictly greater than the one before it.
    pub fn is_strictly_increasing(&self) -> bool {
        self.edges.windows(2).all(|w| w[0] < w[1])
    }

    /// Bin containing `value`: `(e[i], e[i+1]]`, or `[e[0], e[1]]` for the first bin.
    pub fn bucket(&self, value: f64) -> Option<usize> {
        let (first, last) = match (self.edges.first(), self.edges.last()) {
            (Some(&first), Some(&last)) if self.edges.len() >= 2 => (first, last),
            _ => return None,
        };
        if value.is_nan() || value < first || value > last {
            return None;
        }
        let below = self.edges.partition_point(|&e| e < value);
        Some(below.saturating_sub(1))
    }

    /// Bin of every value, in order.
    pub fn bucketize(&self, values: &[f64]) -> Vec<Option<usize>> {
        values.iter().map(|&v| self.bucket(v)).collect()
    }
}

/// Labels `"{prefix}0" .. "{prefix}{n-1}"`.
pub fn default_labels(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

/// Map bucket indices through `labels`, failing if the label count is not `n_bins`.
pub fn label_buckets(
    buckets: &[Option<usize>],
    labels: &[String],
    n_bins: usize,
) -> Result<Vec<Option<String>>> {
    if labels.len() != n_bins {
        return Err(FieldError::InvalidParameter(format!(
            "expected {} labels, got {}",
            n_bins,
            labels.len()
        )));
    }
    Ok(buckets
        .iter()
        .map(|b| b.and_then(|i| labels.get(i).cloned()))
        .collect())
}
