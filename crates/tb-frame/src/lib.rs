#![forbid(unsafe_code)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tb_columnar::{Column, ColumnError};
use tb_index::{AlignPolicy, IndexError, Label, RowIndex, align, validate_alignment_plan};
use tb_types::{DType, Scalar};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("index length ({index_len}) does not match column length ({column_len})")]
    LengthMismatch { index_len: usize, column_len: usize },
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("no such column: {0}")]
    MissingColumn(String),
    #[error("cannot build a frame from zero inputs")]
    EmptyInput,
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// A named column paired with a row index of the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    index: RowIndex,
    column: Column,
}

impl Series {
    pub fn new(name: impl Into<String>, index: RowIndex, column: Column) -> Result<Self, FrameError> {
        if index.len() != column.len() {
            return Err(FrameError::LengthMismatch {
                index_len: index.len(),
                column_len: column.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            index,
            column,
        })
    }

    pub fn from_values(
        name: impl Into<String>,
        labels: Vec<Label>,
        values: Vec<Scalar>,
    ) -> Result<Self, FrameError> {
        let index = RowIndex::new(labels);
        let column = Column::from_values(values)?;
        Self::new(name, index, column)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    #[must_use]
    pub fn column(&self) -> &Column {
        &self.column
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        self.column.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.column.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }
}

/// Columns in insertion order over one shared row index. Transformations
/// always build a new frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    index: RowIndex,
    columns: IndexMap<String, Column>,
}

impl DataFrame {
    pub fn new(index: RowIndex, columns: IndexMap<String, Column>) -> Result<Self, FrameError> {
        for column in columns.values() {
            if column.len() != index.len() {
                return Err(FrameError::LengthMismatch {
                    index_len: index.len(),
                    column_len: column.len(),
                });
            }
        }

        Ok(Self { index, columns })
    }

    /// Frame over a fresh 0..n index from equal-length named columns.
    pub fn from_columns(pairs: Vec<(String, Column)>) -> Result<Self, FrameError> {
        let len = pairs.first().map_or(0, |(_, column)| column.len());
        let mut columns = IndexMap::with_capacity(pairs.len());
        for (name, column) in pairs {
            if columns.insert(name.clone(), column).is_some() {
                return Err(FrameError::DuplicateColumn(name));
            }
        }

        Self::new(RowIndex::range(len), columns)
    }

    /// Test/demo convenience mirroring dict-of-lists construction.
    pub fn from_pairs(pairs: Vec<(&str, Vec<Scalar>)>) -> Result<Self, FrameError> {
        let pairs = pairs
            .into_iter()
            .map(|(name, values)| Ok((name.to_owned(), Column::from_values(values)?)))
            .collect::<Result<Vec<_>, ColumnError>>()?;
        Self::from_columns(pairs)
    }

    #[must_use]
    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column names in frame order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column, FrameError> {
        self.column(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_owned()))
    }

    /// New frame with one more column appended on the right.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Self, FrameError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }

        let mut columns = self.columns.clone();
        columns.insert(name, column);
        Self::new(self.index.clone(), columns)
    }

    pub fn series(&self, name: &str) -> Result<Series, FrameError> {
        let column = self.require_column(name)?.clone();
        Series::new(name, self.index.clone(), column)
    }

    /// Cap every numeric column at the signed threshold; other columns and
    /// missing cells pass through untouched.
    pub fn cap_abs(&self, threshold: f64) -> Result<Self, FrameError> {
        let mut columns = IndexMap::with_capacity(self.columns.len());
        for (name, column) in &self.columns {
            let capped = match column.dtype() {
                DType::Int64 | DType::Float64 => column.cap_abs(threshold)?,
                _ => column.clone(),
            };
            columns.insert(name.clone(), capped);
        }
        Self::new(self.index.clone(), columns)
    }
}

/// Row-wise stacking: the output column set is the union in first-appearance
/// order, cells absent from a part null-fill, and the indexes chain.
pub fn concat_rows(parts: &[&DataFrame]) -> Result<DataFrame, FrameError> {
    if parts.is_empty() {
        return Err(FrameError::EmptyInput);
    }

    let mut names = Vec::<String>::new();
    for part in parts {
        for (name, _) in part.columns() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
    }

    let mut columns = IndexMap::with_capacity(names.len());
    for name in names {
        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            match part.column(&name) {
                Some(column) => pieces.push(column.clone()),
                None => pieces.push(Column::from_values(vec![Scalar::Null; part.len()])?),
            }
        }
        let refs = pieces.iter().collect::<Vec<_>>();
        columns.insert(name, Column::concat(&refs)?);
    }

    let indexes = parts.iter().map(|part| part.index()).collect::<Vec<_>>();
    DataFrame::new(RowIndex::chain(&indexes), columns)
}

/// Column-wise concatenation: align the row indexes under `policy`, then
/// lay every input's columns side by side. Duplicate names across inputs
/// are an error.
pub fn concat_columns(parts: &[&DataFrame], policy: AlignPolicy) -> Result<DataFrame, FrameError> {
    let (first, rest) = parts.split_first().ok_or(FrameError::EmptyInput)?;

    let mut out = (*first).clone();
    for part in rest {
        let plan = align(out.index(), part.index(), policy)?;
        validate_alignment_plan(&plan)?;

        let mut columns = IndexMap::with_capacity(out.width() + part.width());
        for (name, column) in out.columns() {
            columns.insert(
                name.to_owned(),
                column.reindex_by_positions(&plan.left_positions)?,
            );
        }
        for (name, column) in part.columns() {
            if columns.contains_key(name) {
                return Err(FrameError::DuplicateColumn(name.to_owned()));
            }
            columns.insert(
                name.to_owned(),
                column.reindex_by_positions(&plan.right_positions)?,
            );
        }

        out = DataFrame::new(plan.index, columns)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use tb_index::{AlignPolicy, Label, RowIndex};
    use tb_types::Scalar;

    use super::{DataFrame, FrameError, Series, concat_columns, concat_rows};

    #[test]
    fn frame_keeps_column_insertion_order() {
        let frame = DataFrame::from_pairs(vec![
            ("zeta", vec![Scalar::Int64(1)]),
            ("alpha", vec![Scalar::Int64(2)]),
        ])
        .expect("frame");

        assert_eq!(frame.column_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn mismatched_column_length_is_rejected() {
        let err = DataFrame::from_pairs(vec![
            ("a", vec![Scalar::Int64(1), Scalar::Int64(2)]),
            ("b", vec![Scalar::Int64(1)]),
        ])
        .expect_err("must fail");
        assert!(matches!(err, FrameError::LengthMismatch { .. }));
    }

    #[test]
    fn concat_rows_unions_columns_and_chains_indexes() {
        let top = DataFrame::from_pairs(vec![
            ("a", vec![Scalar::Int64(1), Scalar::Int64(2)]),
            ("b", vec![Scalar::from("x"), Scalar::from("y")]),
        ])
        .expect("top");
        let bottom = DataFrame::from_pairs(vec![("a", vec![Scalar::Int64(3)])]).expect("bottom");

        let out = concat_rows(&[&top, &bottom]).expect("concat");
        assert_eq!(out.len(), 3);
        assert_eq!(out.column_names(), vec!["a", "b"]);
        assert_eq!(
            out.column("b").expect("b").values(),
            &[Scalar::from("x"), Scalar::from("y"), Scalar::Null]
        );
        assert_eq!(
            out.index().labels(),
            &[
                Label::Int64(0),
                Label::Int64(1),
                Label::Int64(0),
            ]
        );
    }

    #[test]
    fn concat_columns_outer_null_fills_unshared_labels() {
        let left = Series::from_values(
            "a",
            vec!["r1".into(), "r2".into()],
            vec![Scalar::Int64(1), Scalar::Int64(2)],
        )
        .expect("a");
        let left = DataFrame::new(
            left.index().clone(),
            [("a".to_owned(), left.column().clone())].into_iter().collect(),
        )
        .expect("left");

        let right = Series::from_values(
            "b",
            vec!["r2".into(), "r3".into()],
            vec![Scalar::Int64(20), Scalar::Int64(30)],
        )
        .expect("b");
        let right = DataFrame::new(
            right.index().clone(),
            [("b".to_owned(), right.column().clone())].into_iter().collect(),
        )
        .expect("right");

        let outer = concat_columns(&[&left, &right], AlignPolicy::Outer).expect("outer");
        assert_eq!(
            outer.index().labels(),
            &[Label::from("r1"), Label::from("r2"), Label::from("r3")]
        );
        assert_eq!(
            outer.column("a").expect("a").values(),
            &[Scalar::Int64(1), Scalar::Int64(2), Scalar::Null]
        );
        assert_eq!(
            outer.column("b").expect("b").values(),
            &[Scalar::Null, Scalar::Int64(20), Scalar::Int64(30)]
        );

        let inner = concat_columns(&[&left, &right], AlignPolicy::Inner).expect("inner");
        assert_eq!(inner.index().labels(), &[Label::from("r2")]);
        assert_eq!(inner.column("a").expect("a").values(), &[Scalar::Int64(2)]);
    }

    #[test]
    fn concat_columns_rejects_duplicate_names() {
        let a = DataFrame::from_pairs(vec![("a", vec![Scalar::Int64(1)])]).expect("a");
        let b = DataFrame::from_pairs(vec![("a", vec![Scalar::Int64(2)])]).expect("b");
        let err = concat_columns(&[&a, &b], AlignPolicy::Outer).expect_err("must fail");
        assert!(matches!(err, FrameError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn cap_abs_leaves_text_columns_alone() {
        let frame = DataFrame::from_pairs(vec![
            ("v", vec![Scalar::Float64(9.5), Scalar::Float64(-0.5)]),
            ("tag", vec![Scalar::from("hot"), Scalar::from("cold")]),
        ])
        .expect("frame");

        let out = frame.cap_abs(3.0).expect("cap");
        assert_eq!(
            out.column("v").expect("v").values(),
            &[Scalar::Float64(3.0), Scalar::Float64(-0.5)]
        );
        assert_eq!(
            out.column("tag").expect("tag").values(),
            &[Scalar::from("hot"), Scalar::from("cold")]
        );
    }

    #[test]
    fn with_column_appends_on_the_right_and_rejects_clashes() {
        let frame = DataFrame::from_pairs(vec![("a", vec![Scalar::Int64(1)])]).expect("frame");
        let column = frame.column("a").expect("a").clone();

        let wider = frame.with_column("b", column.clone()).expect("widen");
        assert_eq!(wider.column_names(), vec!["a", "b"]);

        let err = wider.with_column("a", column).expect_err("must fail");
        assert!(matches!(err, FrameError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn series_round_trips_through_frame() {
        let frame = DataFrame::from_pairs(vec![("a", vec![Scalar::Int64(1), Scalar::Int64(2)])])
            .expect("frame");
        let series = frame.series("a").expect("series");
        assert_eq!(series.name(), "a");
        assert_eq!(series.values(), &[Scalar::Int64(1), Scalar::Int64(2)]);
        assert_eq!(series.index(), &RowIndex::range(2));
    }
}
