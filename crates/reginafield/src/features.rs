//! Feature derivation: radius in projected space and quantile tiers.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binning::{default_labels, label_buckets, BinEdges};
use crate::error::Result;
use crate::schema::{CURVATURE, CURVATURE_TIER, ENTROPY, ENTROPY_TIER};
use crate::table::{Column, Table};

/// Transform applied to a column before its quantile tiers are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TierTransform {
    /// Use the raw value.
    #[default]
    Identity,
    /// Use the absolute value.
    Abs,
}

impl TierTransform {
    /// Apply the transform to one value.
    pub fn apply(self, value: f64) -> f64 {
        match self {
            TierTransform::Identity => value,
            TierTransform::Abs => value.abs(),
        }
    }
}

/// Euclidean distance of every `(x, y)` from the origin.
pub(crate) fn radius_of(table: &Table, x_key: &str, y_key: &str) -> Result<Array1<f64>> {
    let x = table.float_values(x_key)?;
    let y = table.float_values(y_key)?;
    Ok((&x * &x + &y * &y).mapv(f64::sqrt))
}

/// Add `out_key = sqrt(x² + y²)`.
pub fn add_radius(table: &Table, x_key: &str, y_key: &str, out_key: &str) -> Result<Table> {
    let radius = radius_of(table, x_key, y_key)?;
    table.with_column(out_key, Column::Float(radius))
}

/// Add an ordinal tier label from quantile bins of `transform(value_key)`.
///
/// `labels` defaults to `T0..T{n_bins-1}` and must hold exactly `n_bins` entries.
#[tracing::instrument(skip(table, labels), fields(rows = table.n_rows()))]
pub fn add_quantile_tier(
    table: &Table,
    value_key: &str,
    n_bins: usize,
    out_key: &str,
    transform: TierTransform,
    labels: Option<&[String]>,
) -> Result<Table> {
    let values: Vec<f64> = table
        .float_values(value_key)?
        .iter()
        .map(|&v| transform.apply(v))
        .collect();

    let edges = BinEdges::from_values(&values, n_bins)?;
    if edges.nudged() > 0 {
        debug!(
            column = value_key,
            nudged = edges.nudged(),
            "Separated collapsed quantile edges"
        );
    }

    let buckets = edges.bucketize(&values);
    let tiers = match labels {
        Some(labels) => label_buckets(&buckets, labels, n_bins)?,
        None => label_buckets(&buckets, &default_labels("T", n_bins), n_bins)?,
    };
    table.with_column(out_key, Column::Label(tiers))
}

/// Quantile tiers of the raw entropy column (labels `T0..`).
pub fn add_entropy_tiers(
    table: &Table,
    entropy_key: &str,
    n_bins: usize,
    out_key: &str,
    labels: Option<&[String]>,
) -> Result<Table> {
    add_quantile_tier(
        table,
        entropy_key,
        n_bins,
        out_key,
        TierTransform::Identity,
        labels,
    )
}

/// Quantile tiers of `|curvature|` (labels `C0..`).
pub fn add_curvature_tiers(
    table: &Table,
    curvature_key: &str,
    n_bins: usize,
    out_key: &str,
    labels: Option<&[String]>,
) -> Result<Table> {
    let default = default_labels("C", n_bins);
    add_quantile_tier(
        table,
        curvature_key,
        n_bins,
        out_key,
        TierTransform::Abs,
        Some(labels.unwrap_or(default.as_slice())),
    )
}

/// Entropy and curvature tiers with the standard keys and four bins each.
pub fn add_standard_tiers(table: &Table) -> Result<Table> {
    let table = add_entropy_tiers(table, ENTROPY, 4, ENTROPY_TIER, None)?;
    add_curvature_tiers(&table, CURVATURE, 4, CURVATURE_TIER, None)
}
