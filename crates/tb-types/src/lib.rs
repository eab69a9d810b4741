#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
}

/// A single cell value. `Null` is the one missing marker for every dtype;
/// a `Float64` NaN also counts as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Scalar {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Equality that also treats any two missing values as equal.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        if self.is_missing() || other.is_missing() {
            return self.is_missing() && other.is_missing();
        }
        self == other
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Int64(v) => Ok(*v as f64),
            Self::Float64(v) => Ok(*v),
            Self::Null => Err(TypeError::ValueIsMissing),
            Self::Utf8(v) => Err(TypeError::NonNumericValue {
                value: v.clone(),
                dtype: DType::Utf8,
            }),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("dtype coercion from {left:?} to {right:?} has no compatible common type")]
    IncompatibleDtypes { left: DType, right: DType },
    #[error("cannot widen scalar of dtype {from:?} to {to:?}")]
    InvalidWiden { from: DType, to: DType },
    #[error("value {value:?} has non-numeric dtype {dtype:?}")]
    NonNumericValue { value: String, dtype: DType },
    #[error("value is missing")]
    ValueIsMissing,
}

/// Smallest dtype both inputs widen into: Null absorbs into anything,
/// Bool < Int64 < Float64, and Utf8 mixes only with Utf8.
pub fn common_dtype(left: DType, right: DType) -> Result<DType, TypeError> {
    use DType::{Bool, Float64, Int64, Null, Utf8};

    let out = match (left, right) {
        (a, b) if a == b => a,
        (Null, other) | (other, Null) => other,
        (Bool, Int64) | (Int64, Bool) => Int64,
        (Bool, Float64) | (Float64, Bool) => Float64,
        (Int64, Float64) | (Float64, Int64) => Float64,
        (Utf8, _) | (_, Utf8) => return Err(TypeError::IncompatibleDtypes { left, right }),
        (Bool, Bool) => Bool,
        (Int64, Int64) => Int64,
        (Float64, Float64) => Float64,
    };

    Ok(out)
}

pub fn infer_dtype(values: &[Scalar]) -> Result<DType, TypeError> {
    let mut current = DType::Null;
    for value in values {
        current = common_dtype(current, value.dtype())?;
    }
    Ok(current)
}

/// Widen a scalar into `target`. Only lossless lattice moves are allowed;
/// narrowing is never performed here.
pub fn widen_scalar(value: Scalar, target: DType) -> Result<Scalar, TypeError> {
    let from = value.dtype();
    if from == target || matches!(value, Scalar::Null) {
        return Ok(value);
    }

    match (value, target) {
        (Scalar::Bool(v), DType::Int64) => Ok(Scalar::Int64(i64::from(v))),
        (Scalar::Bool(v), DType::Float64) => Ok(Scalar::Float64(if v { 1.0 } else { 0.0 })),
        (Scalar::Int64(v), DType::Float64) => Ok(Scalar::Float64(v as f64)),
        (_, _) => Err(TypeError::InvalidWiden { from, to: target }),
    }
}

#[cfg(test)]
mod tests {
    use super::{DType, Scalar, TypeError, common_dtype, infer_dtype, widen_scalar};

    #[test]
    fn dtype_inference_widens_mixed_numerics() {
        let values = vec![Scalar::Bool(true), Scalar::Int64(7), Scalar::Float64(3.5)];
        assert_eq!(
            infer_dtype(&values).expect("dtype should infer"),
            DType::Float64
        );
    }

    #[test]
    fn null_widen_is_identity_for_any_target() {
        let out = widen_scalar(Scalar::Null, DType::Float64).expect("null widens");
        assert_eq!(out, Scalar::Null);
    }

    #[test]
    fn semantic_eq_treats_nan_as_missing() {
        let left = Scalar::Float64(f64::NAN);
        assert!(left.is_missing());
        assert!(left.semantic_eq(&Scalar::Null));
        assert!(!left.semantic_eq(&Scalar::Float64(1.0)));
    }

    #[test]
    fn common_dtype_rejects_string_numeric_mix() {
        let err = common_dtype(DType::Utf8, DType::Int64).expect_err("must fail");
        assert!(matches!(err, TypeError::IncompatibleDtypes { .. }));
    }

    #[test]
    fn widen_rejects_float_to_int() {
        let err = widen_scalar(Scalar::Float64(1.5), DType::Int64).expect_err("must fail");
        assert!(matches!(
            err,
            TypeError::InvalidWiden {
                from: DType::Float64,
                to: DType::Int64
            }
        ));
    }
}
