#![forbid(unsafe_code)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tb_columnar::{Column, ColumnError};
use tb_frame::{DataFrame, FrameError, Series};
use tb_index::{Label, RowIndex};
use tb_types::{DType, Scalar};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("duplicate stacked cell for row {row} / column {column}")]
    DuplicateCell { row: Label, column: String },
    #[error("bin edges must be strictly increasing")]
    EdgesNotIncreasing,
    #[error("binning needs at least two edges, got {0}")]
    TooFewEdges(usize),
    #[error("binning requires a numeric column but dtype is {dtype:?}")]
    NonNumericBinInput { dtype: DType },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// One-dimensional view of a two-dimensional frame: values keyed by the
/// (row-label, column-name) pair, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedSeries {
    pairs: Vec<(Label, String)>,
    values: Column,
}

impl StackedSeries {
    #[must_use]
    pub fn pairs(&self) -> &[(Label, String)] {
        &self.pairs
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        self.values.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackOptions {
    /// Keep missing cells as explicit pairs instead of dropping them.
    pub keep_missing: bool,
}

/// Pivot a frame into a stacked series, row-major.
pub fn stack(frame: &DataFrame, options: StackOptions) -> Result<StackedSeries, ReshapeError> {
    let mut pairs = Vec::new();
    let mut values = Vec::new();

    for (row_pos, row_label) in frame.index().labels().iter().enumerate() {
        for (name, column) in frame.columns() {
            let value = column.value(row_pos).cloned().unwrap_or(Scalar::Null);
            if value.is_missing() && !options.keep_missing {
                continue;
            }
            pairs.push((row_label.clone(), name.to_owned()));
            values.push(value);
        }
    }

    Ok(StackedSeries {
        pairs,
        values: Column::from_values(values)?,
    })
}

/// Inverse of `stack`: rows and columns come back in first-appearance order,
/// absent pairs null-fill. Duplicate pairs are an error.
pub fn unstack(stacked: &StackedSeries) -> Result<DataFrame, ReshapeError> {
    let mut row_labels = Vec::<Label>::new();
    let mut column_names = Vec::<String>::new();

    for (row, column) in &stacked.pairs {
        if !row_labels.contains(row) {
            row_labels.push(row.clone());
        }
        if !column_names.iter().any(|name| name == column) {
            column_names.push(column.clone());
        }
    }

    let mut cells: Vec<Vec<Option<Scalar>>> = vec![vec![None; row_labels.len()]; column_names.len()];

    for ((row, column), value) in stacked.pairs.iter().zip(stacked.values()) {
        let row_pos = row_labels
            .iter()
            .position(|label| label == row)
            .unwrap_or_default();
        let col_pos = column_names
            .iter()
            .position(|name| name == column)
            .unwrap_or_default();

        let slot = &mut cells[col_pos][row_pos];
        if slot.is_some() {
            return Err(ReshapeError::DuplicateCell {
                row: row.clone(),
                column: column.clone(),
            });
        }
        *slot = Some(value.clone());
    }

    let mut columns = IndexMap::with_capacity(column_names.len());
    for (name, column_cells) in column_names.into_iter().zip(cells) {
        let values = column_cells
            .into_iter()
            .map(|cell| cell.unwrap_or(Scalar::Null))
            .collect();
        columns.insert(name, Column::from_values(values)?);
    }

    Ok(DataFrame::new(RowIndex::new(row_labels), columns)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutOptions {
    /// Right-closed `(lo, hi]` intervals when true, left-closed `[lo, hi)`
    /// when false.
    pub right_closed: bool,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self { right_closed: true }
    }
}

fn interval_label(lo: f64, hi: f64, right_closed: bool) -> String {
    if right_closed {
        format!("({lo}, {hi}]")
    } else {
        format!("[{lo}, {hi})")
    }
}

/// Assign each numeric value to the half-open interval it falls into.
/// Values outside every bin, and missing values, come back missing.
pub fn cut(column: &Column, edges: &[f64], options: CutOptions) -> Result<Column, ReshapeError> {
    if edges.len() < 2 {
        return Err(ReshapeError::TooFewEdges(edges.len()));
    }
    if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ReshapeError::EdgesNotIncreasing);
    }
    match column.dtype() {
        DType::Int64 | DType::Float64 | DType::Null => {}
        dtype => return Err(ReshapeError::NonNumericBinInput { dtype }),
    }

    let labels = column
        .values()
        .iter()
        .map(|value| {
            if value.is_missing() {
                return Ok(Scalar::Null);
            }
            let x = value.to_f64().map_err(ColumnError::from)?;
            let bin = edges.windows(2).position(|pair| {
                if options.right_closed {
                    x > pair[0] && x <= pair[1]
                } else {
                    x >= pair[0] && x < pair[1]
                }
            });
            Ok(match bin {
                Some(idx) => Scalar::Utf8(interval_label(
                    edges[idx],
                    edges[idx + 1],
                    options.right_closed,
                )),
                None => Scalar::Null,
            })
        })
        .collect::<Result<Vec<_>, ReshapeError>>()?;

    Ok(Column::from_values(labels)?)
}

fn dummy_name(prefix: Option<&str>, value: &Scalar) -> String {
    let rendered = match value {
        Scalar::Bool(v) => v.to_string(),
        Scalar::Int64(v) => v.to_string(),
        Scalar::Float64(v) => v.to_string(),
        Scalar::Utf8(v) => v.clone(),
        Scalar::Null => String::new(),
    };
    match prefix {
        Some(prefix) => format!("{prefix}_{rendered}"),
        None => rendered,
    }
}

/// Binary indicator columns, one per distinct non-missing value in sort
/// order. A row holding a missing value is zero everywhere.
pub fn get_dummies(series: &Series, prefix: Option<&str>) -> Result<DataFrame, ReshapeError> {
    let categories = series.column().distinct_sorted();

    let mut columns = IndexMap::with_capacity(categories.len());
    for category in &categories {
        let indicators = series
            .values()
            .iter()
            .map(|value| Scalar::Int64(i64::from(value.semantic_eq(category))))
            .collect::<Vec<_>>();
        columns.insert(dummy_name(prefix, category), Column::from_values(indicators)?);
    }

    Ok(DataFrame::new(series.index().clone(), columns)?)
}
