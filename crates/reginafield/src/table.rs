//! Immutable columnar table of candidate records.
//!
//! A [`Table`] is a value: every derivation returns a new table that shares the
//! untouched columns behind [`Arc`] and owns only what it added. Nothing in the
//! crate mutates a table it was handed.
//!
//! Missing reals are `NaN`, which is what a left join writes for unmatched rows.

use std::sync::Arc;

use ndarray::{Array1, Axis};

use crate::error::{FieldError, Result};

/// One column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Integer values, e.g. the `Candidate` key.
    Int(Vec<i64>),
    /// Real values. `NaN` marks a missing entry.
    Float(Array1<f64>),
    /// Boolean flags, e.g. `IsRoyal`.
    Bool(Vec<bool>),
    /// Categorical labels; `None` when a row fell outside every bin.
    Label(Vec<Option<String>>),
    /// Ordinal bucket indices; `None` when a row fell outside every bin.
    Bucket(Vec<Option<usize>>),
}

impl Column {
    /// Number of rows in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Label(v) => v.len(),
            Column::Bucket(v) => v.len(),
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the column kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Int(_) => "int",
            Column::Float(_) => "float",
            Column::Bool(_) => "bool",
            Column::Label(_) => "label",
            Column::Bucket(_) => "bucket",
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Int(v) => Column::Int(indices.iter().map(|&i| v[i]).collect()),
            Column::Float(v) => Column::Float(v.select(Axis(0), indices)),
            Column::Bool(v) => Column::Bool(indices.iter().map(|&i| v[i]).collect()),
            Column::Label(v) => Column::Label(indices.iter().map(|&i| v[i].clone()).collect()),
            Column::Bucket(v) => Column::Bucket(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float(Array1::from(values))
    }
}

impl From<Array1<f64>> for Column {
    fn from(values: Array1<f64>) -> Self {
        Column::Float(values)
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int(values)
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        Column::Bool(values)
    }
}

/// Ordered set of equally long, string-keyed columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    n_rows: usize,
    columns: Vec<(String, Arc<Column>)>,
}

impl Table {
    /// Create a table with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(key, column)` pairs.
    ///
    /// All columns must have the same length. A repeated key replaces the
    /// earlier column in place.
    pub fn from_columns<I, K>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Column)>,
        K: Into<String>,
    {
        columns
            .into_iter()
            .try_fold(Table::new(), |table, (key, column)| {
                table.with_column(key, column)
            })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Column keys in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(key, _)| key.as_str())
    }

    /// Whether a column with this key exists.
    pub fn has_column(&self, key: &str) -> bool {
        self.columns.iter().any(|(k, _)| k == key)
    }

    /// Look up a column by key.
    pub fn column(&self, key: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, column)| column.as_ref())
            .ok_or_else(|| FieldError::missing(key, "table"))
    }

    /// Fail with a schema error naming every key in `keys` that is absent.
    pub fn require(&self, keys: &[&str], context: &str) -> Result<()> {
        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|key| !self.has_column(key))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FieldError::missing(missing.join(", "), context))
        }
    }

    /// Return a new table with `column` stored under `key`.
    ///
    /// An existing column with the same key is replaced and keeps its position;
    /// otherwise the column is appended. `self` is left untouched.
    pub fn with_column(&self, key: impl Into<String>, column: Column) -> Result<Table> {
        let key = key.into();
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(FieldError::LengthMismatch {
                column: key,
                expected: self.n_rows,
                found: column.len(),
            });
        }

        let mut out = self.clone();
        out.n_rows = column.len();
        let column = Arc::new(column);
        match out.columns.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = column,
            None => out.columns.push((key, column)),
        }
        Ok(out)
    }

    /// Real values of a column; integer columns are widened to `f64`.
    pub fn float_values(&self, key: &str) -> Result<Array1<f64>> {
        match self.column(key)? {
            Column::Float(values) => Ok(values.clone()),
            Column::Int(values) => Ok(values.iter().map(|&v| v as f64).collect()),
            other => Err(type_error(key, "float", other)),
        }
    }

    /// Integer key values; real columns are accepted when every value is integral.
    pub fn key_values(&self, key: &str) -> Result<Vec<i64>> {
        match self.column(key)? {
            Column::Int(values) => Ok(values.clone()),
            Column::Float(values) => values
                .iter()
                .map(|&v| {
                    if v.is_finite() && v.fract() == 0.0 {
                        Ok(v as i64)
                    } else {
                        Err(FieldError::ColumnType {
                            column: key.to_string(),
                            expected: "int",
                            found: "float",
                        })
                    }
                })
                .collect(),
            other => Err(type_error(key, "int", other)),
        }
    }

    /// Boolean values of a flag column.
    pub fn bools(&self, key: &str) -> Result<&[bool]> {
        match self.column(key)? {
            Column::Bool(values) => Ok(values),
            other => Err(type_error(key, "bool", other)),
        }
    }

    /// Categorical labels of a label column.
    pub fn labels(&self, key: &str) -> Result<&[Option<String>]> {
        match self.column(key)? {
            Column::Label(values) => Ok(values),
            other => Err(type_error(key, "label", other)),
        }
    }

    /// Bucket indices of a bucket column.
    pub fn buckets(&self, key: &str) -> Result<&[Option<usize>]> {
        match self.column(key)? {
            Column::Bucket(values) => Ok(values),
            other => Err(type_error(key, "bucket", other)),
        }
    }

    /// New table holding the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds; callers derive indices from this table.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            n_rows: indices.len(),
            columns: self
                .columns
                .iter()
                .map(|(key, column)| (key.clone(), Arc::new(column.take(indices))))
                .collect(),
        }
    }
}

fn type_error(key: &str, expected: &'static str, found: &Column) -> FieldError {
    FieldError::ColumnType {
        column: key.to_string(),
        expected,
        found: found.kind(),
    }
}
