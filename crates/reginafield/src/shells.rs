//! Radial shells in projected space.

use tracing::debug;

use crate::binning::BinEdges;
use crate::error::Result;
use crate::features::radius_of;
use crate::schema::RADIUS;
use crate::table::{Column, Table};

/// Assign each row to one of `n_shells` radius-quantile shells.
///
/// Writes the shell bucket to `out_key` and (re)writes the `Radius` column.
/// When every radius is equal all rows fall into shell 0.
#[tracing::instrument(skip(table), fields(rows = table.n_rows()))]
pub fn add_shell_index(
    table: &Table,
    x_key: &str,
    y_key: &str,
    n_shells: usize,
    out_key: &str,
) -> Result<Table> {
    let radius = radius_of(table, x_key, y_key)?;
    let values = radius.to_vec();

    let edges = BinEdges::from_values(&values, n_shells)?;
    if edges.nudged() > 0 {
        debug!(nudged = edges.nudged(), "Radius distribution has collapsed shells");
    }

    let shells = edges.bucketize(&values);
    table
        .with_column(out_key, Column::Bucket(shells))?
        .with_column(RADIUS, Column::Float(radius))
}
