//! Royal designation and the extremal ray.
//!
//! The extremal ray is the direction from the origin to the centroid of the
//! royal candidates in projected space. Every candidate, royal or not, is then
//! projected onto it to give a single alignment axis.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FieldError, Result};
use crate::table::{Column, Table};

/// Direction of the extremal ray.
///
/// Unit length unless the royal centroid sits exactly on the origin, in which
/// case it is the zero vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayDirection {
    /// x component
    pub dx: f64,
    /// y component
    pub dy: f64,
}

impl RayDirection {
    /// Create a direction from raw components.
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Whether this is the zero-vector fallback.
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

impl From<(f64, f64)> for RayDirection {
    fn from((dx, dy): (f64, f64)) -> Self {
        Self { dx, dy }
    }
}

/// Left-join `royal_table` onto `table` by candidate and flag matched rows.
///
/// The joined index is written to `royal_index_key` (`NaN` where unmatched) and
/// `out_flag_key` is true exactly where that value is present. When the royal
/// table repeats a candidate its first row wins.
#[tracing::instrument(skip(table, royal_table), fields(rows = table.n_rows(), royal_rows = royal_table.n_rows()))]
pub fn attach_royal_status(
    table: &Table,
    royal_table: &Table,
    candidate_key: &str,
    royal_index_key: &str,
    out_flag_key: &str,
) -> Result<Table> {
    table.require(&[candidate_key], "master table")?;
    royal_table.require(&[candidate_key, royal_index_key], "royal table")?;

    let royal_candidates = royal_table.key_values(candidate_key)?;
    let royal_index = royal_table.float_values(royal_index_key)?;
    let mut lookup: HashMap<i64, f64> = HashMap::with_capacity(royal_candidates.len());
    for (candidate, index) in royal_candidates.into_iter().zip(royal_index.iter()) {
        lookup.entry(candidate).or_insert(*index);
    }

    let joined: Vec<f64> = table
        .key_values(candidate_key)?
        .iter()
        .map(|c| lookup.get(c).copied().unwrap_or(f64::NAN))
        .collect();
    let flags: Vec<bool> = joined.iter().map(|v| !v.is_nan()).collect();

    debug!(
        royal = flags.iter().filter(|f| **f).count(),
        "Joined royal designations"
    );

    table
        .with_column(royal_index_key, Column::from(joined))?
        .with_column(out_flag_key, Column::Bool(flags))
}

/// Flag rows whose existing `royal_index_key` value is present.
///
/// Used when the master table already carries the royal index and no join is needed.
pub fn flag_royal_from_index(
    table: &Table,
    royal_index_key: &str,
    out_flag_key: &str,
) -> Result<Table> {
    table.require(&[royal_index_key], "master table")?;
    let flags: Vec<bool> = table
        .float_values(royal_index_key)?
        .iter()
        .map(|v| !v.is_nan())
        .collect();
    table.with_column(out_flag_key, Column::Bool(flags))
}

/// Rows whose `flag_key` is true.
pub fn filter_royal(table: &Table, flag_key: &str) -> Result<Table> {
    table.require(&[flag_key], "royal filter")?;
    let indices: Vec<usize> = table
        .bools(flag_key)?
        .iter()
        .enumerate()
        .filter_map(|(i, &flag)| flag.then_some(i))
        .collect();
    Ok(table.take(&indices))
}

/// Unit vector from the origin toward the mean position of the royal rows.
///
/// Fails with [`FieldError::EmptyInput`] when no row is flagged. A centroid at
/// the origin yields the zero vector instead of dividing by zero.
#[tracing::instrument(skip(table), fields(rows = table.n_rows()))]
pub fn estimate_extremal_ray_direction(
    table: &Table,
    x_key: &str,
    y_key: &str,
    flag_key: &str,
) -> Result<RayDirection> {
    table.require(&[flag_key], "extremal ray estimation")?;
    let flags = table.bools(flag_key)?;
    let x = table.float_values(x_key)?;
    let y = table.float_values(y_key)?;

    let (mut sum_x, mut sum_y, mut count) = (0.0_f64, 0.0_f64, 0usize);
    for ((&flag, &xi), &yi) in flags.iter().zip(x.iter()).zip(y.iter()) {
        if flag {
            sum_x += xi;
            sum_y += yi;
            count += 1;
        }
    }
    if count == 0 {
        return Err(FieldError::EmptyInput(
            "no royal points found to estimate the extremal ray".to_string(),
        ));
    }

    let mean_x = sum_x / count as f64;
    let mean_y = sum_y / count as f64;
    let norm = mean_x.hypot(mean_y);
    let norm = if norm == 0.0 {
        debug!("Royal centroid is at the origin, using zero direction");
        1.0
    } else {
        norm
    };

    Ok(RayDirection::new(mean_x / norm, mean_y / norm))
}

/// Add `out_key = x * dx + y * dy` for every row.
pub fn project_onto_extremal_ray(
    table: &Table,
    direction: RayDirection,
    x_key: &str,
    y_key: &str,
    out_key: &str,
) -> Result<Table> {
    let x = table.float_values(x_key)?;
    let y = table.float_values(y_key)?;
    let projection = x * direction.dx + y * direction.dy;
    table.with_column(out_key, Column::Float(projection))
}
