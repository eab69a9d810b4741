#![forbid(unsafe_code)]

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tb_types::{DType, Scalar, TypeError, common_dtype, infer_dtype, widen_scalar};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("cannot concatenate zero columns")]
    EmptyConcat,
    #[error("operation requires a numeric column but dtype is {dtype:?}")]
    NonNumeric { dtype: DType },
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// A dtype-homogeneous sequence of scalars. Every stored value is either
/// missing or of the column dtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
}

impl Column {
    /// Build a column, widening each value into `dtype`.
    pub fn new(dtype: DType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let values = values
            .into_iter()
            .map(|value| widen_scalar(value, dtype))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dtype, values })
    }

    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    #[must_use]
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_missing()).count()
    }

    /// Gather values into a new column; `None` slots become missing.
    pub fn reindex_by_positions(&self, positions: &[Option<usize>]) -> Result<Self, ColumnError> {
        let values = positions
            .iter()
            .map(|slot| match slot {
                Some(idx) => self.values.get(*idx).cloned().unwrap_or(Scalar::Null),
                None => Scalar::Null,
            })
            .collect::<Vec<_>>();

        Self::new(self.dtype, values)
    }

    /// Stack several columns end to end under their common dtype.
    pub fn concat(parts: &[&Self]) -> Result<Self, ColumnError> {
        let mut dtype = match parts.first() {
            Some(first) => first.dtype,
            None => return Err(ColumnError::EmptyConcat),
        };
        for part in &parts[1..] {
            dtype = common_dtype(dtype, part.dtype)?;
        }

        let mut values = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            values.extend(part.values.iter().cloned());
        }

        Self::new(dtype, values)
    }

    /// Clamp every value whose magnitude exceeds `threshold` to the signed
    /// threshold. Missing values pass through. Int64 columns cap to the
    /// truncated threshold so the dtype is preserved.
    pub fn cap_abs(&self, threshold: f64) -> Result<Self, ColumnError> {
        match self.dtype {
            DType::Int64 | DType::Float64 | DType::Null => {}
            dtype => return Err(ColumnError::NonNumeric { dtype }),
        }

        let values = self
            .values
            .iter()
            .map(|value| match value {
                Scalar::Int64(v) => {
                    let cap = threshold.trunc() as i64;
                    if v.unsigned_abs() > cap.unsigned_abs() {
                        Scalar::Int64(if *v < 0 { -cap } else { cap })
                    } else {
                        Scalar::Int64(*v)
                    }
                }
                Scalar::Float64(v) if !v.is_nan() && v.abs() > threshold => {
                    Scalar::Float64(v.signum() * threshold)
                }
                other => other.clone(),
            })
            .collect();

        Self::new(self.dtype, values)
    }

    /// Distinct non-missing values in sort order, as dummy encoding needs.
    #[must_use]
    pub fn distinct_sorted(&self) -> Vec<Scalar> {
        let mut seen = Vec::<Scalar>::new();
        for value in &self.values {
            if value.is_missing() {
                continue;
            }
            if !seen.iter().any(|s| s.semantic_eq(value)) {
                seen.push(value.clone());
            }
        }
        seen.sort_by(compare_scalars);
        seen
    }

    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(left, right)| left.semantic_eq(right))
    }
}

/// Total order over non-missing scalars: booleans, then numerics by value,
/// then strings lexicographically. Missing sorts last.
#[must_use]
pub fn compare_scalars(left: &Scalar, right: &Scalar) -> Ordering {
    fn rank(value: &Scalar) -> u8 {
        match value {
            Scalar::Bool(_) => 0,
            Scalar::Int64(_) | Scalar::Float64(_) => 1,
            Scalar::Utf8(_) => 2,
            Scalar::Null => 3,
        }
    }

    match (left, right) {
        (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
        (Scalar::Utf8(a), Scalar::Utf8(b)) => a.cmp(b),
        (a, b) if rank(a) == 1 && rank(b) == 1 => {
            let (a, b) = match (a.to_f64(), b.to_f64()) {
                (Ok(a), Ok(b)) => (a, b),
                _ => return Ordering::Equal,
            };
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (a, b) => rank(a).cmp(&rank(b)),
    }
}
