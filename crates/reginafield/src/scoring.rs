//! Composite structural score and ranking.
//!
//! Each signal is scaled by its largest magnitude so no single column dominates
//! because of its units, then the weighted sum is min-max rescaled to `[0, 1]`.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::table::{Column, Table};

/// Per-signal weights of the composite score.
///
/// Fields missing from a deserialized object are 0, so a supplied weight set
/// only counts the signals it names.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub motif: f64,
    pub entropy: f64,
    pub curvature: f64,
    pub hilbert: f64,
}

impl ScoreWeights {
    /// Weight 1 for every core signal, and for the harmonic one when it is available.
    pub fn uniform(hilbert_present: bool) -> Self {
        Self {
            motif: 1.0,
            entropy: 1.0,
            curvature: 1.0,
            hilbert: if hilbert_present { 1.0 } else { 0.0 },
        }
    }
}

/// `|v / max|v||`, with the divisor taken as 1 when every magnitude is 0 or missing.
fn magnitude_normalized(values: &Array1<f64>) -> Array1<f64> {
    let max_abs = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let divisor = if max_abs == 0.0 { 1.0 } else { max_abs };
    values.mapv(|v| (v / divisor).abs())
}

/// Min-max rescale to `[0, 1]`; a zero (or undefined) range gives 0 everywhere.
fn rescale_unit(values: Array1<f64>) -> Array1<f64> {
    let (lo, hi) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if hi > lo {
        values.mapv(|v| (v - lo) / (hi - lo))
    } else {
        debug!("Composite score has zero range, scoring every row 0");
        Array1::zeros(values.len())
    }
}

/// Add a normalized weighted score of motif, entropy, curvature and, when
/// requested and present, the harmonic magnitude.
///
/// Without explicit `weights` each core signal gets weight 1 and the harmonic
/// signal gets 1 if it takes part. A row with a missing input scores `NaN`.
#[tracing::instrument(skip(table, weights), fields(rows = table.n_rows()))]
pub fn composite_structural_score(
    table: &Table,
    motif_key: &str,
    entropy_key: &str,
    curvature_key: &str,
    hilbert_key: Option<&str>,
    weights: Option<&ScoreWeights>,
    out_key: &str,
) -> Result<Table> {
    let hilbert_key = hilbert_key.filter(|key| table.has_column(key));
    let weights = weights
        .copied()
        .unwrap_or_else(|| ScoreWeights::uniform(hilbert_key.is_some()));

    let mut raw = magnitude_normalized(&table.float_values(motif_key)?) * weights.motif
        + magnitude_normalized(&table.float_values(entropy_key)?) * weights.entropy
        + magnitude_normalized(&table.float_values(curvature_key)?) * weights.curvature;
    if let Some(key) = hilbert_key {
        raw = raw + magnitude_normalized(&table.float_values(key)?) * weights.hilbert;
    }

    table.with_column(out_key, Column::Float(rescale_unit(raw)))
}

/// Rows sorted by `score_key`, highest first unless `ascending`.
///
/// The sort is stable and `NaN` scores go last in either direction.
pub fn rank_by_structural_score(table: &Table, score_key: &str, ascending: bool) -> Result<Table> {
    table.require(&[score_key], "ranking")?;
    let scores = table.float_values(score_key)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (scores[a], scores[b]);
        match (x.is_nan(), y.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) if ascending => x.total_cmp(&y),
            (false, false) => y.total_cmp(&x),
        }
    });
    Ok(table.take(&order))
}
