#![forbid(unsafe_code)]

use std::collections::HashMap;

use indexmap::IndexMap;
use tb_columnar::{Column, ColumnError};
use tb_frame::{DataFrame, FrameError};
use tb_index::{Label, RowIndex};
use tb_types::Scalar;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinHow {
    Inner,
    Left,
    Right,
    Outer,
}

/// Which field on one side supplies the join key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelect {
    Column(String),
    Index,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeSpec {
    pub how: JoinHow,
    pub left_key: KeySelect,
    pub right_key: KeySelect,
    pub suffixes: (String, String),
}

impl MergeSpec {
    /// Same-named key column on both sides.
    #[must_use]
    pub fn on(how: JoinHow, key: &str) -> Self {
        Self {
            how,
            left_key: KeySelect::Column(key.to_owned()),
            right_key: KeySelect::Column(key.to_owned()),
            suffixes: default_suffixes(),
        }
    }

    /// Differently named key columns per side.
    #[must_use]
    pub fn on_columns(how: JoinHow, left_on: &str, right_on: &str) -> Self {
        Self {
            how,
            left_key: KeySelect::Column(left_on.to_owned()),
            right_key: KeySelect::Column(right_on.to_owned()),
            suffixes: default_suffixes(),
        }
    }

    #[must_use]
    pub fn with_suffixes(mut self, left: &str, right: &str) -> Self {
        self.suffixes = (left.to_owned(), right.to_owned());
        self
    }
}

fn default_suffixes() -> (String, String) {
    ("_x".to_owned(), "_y".to_owned())
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// Hashable view of a key scalar. Variant-exact: an Int64 key never matches
/// a Float64 key, matching column dtype discipline upstream.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum KeyValue {
    Bool(bool),
    Int64(i64),
    FloatBits(u64),
    Utf8(String),
}

impl KeyValue {
    /// Missing keys have no hashable form; they never match anything.
    fn from_scalar(key: &Scalar) -> Option<Self> {
        match key {
            _ if key.is_missing() => None,
            Scalar::Bool(v) => Some(Self::Bool(*v)),
            Scalar::Int64(v) => Some(Self::Int64(*v)),
            Scalar::Float64(v) => Some(Self::FloatBits(v.to_bits())),
            Scalar::Utf8(v) => Some(Self::Utf8(v.clone())),
            Scalar::Null => None,
        }
    }
}

fn key_scalars(frame: &DataFrame, select: &KeySelect) -> Result<Vec<Scalar>, JoinError> {
    match select {
        KeySelect::Column(name) => Ok(frame.require_column(name)?.values().to_vec()),
        KeySelect::Index => Ok(frame
            .index()
            .labels()
            .iter()
            .map(|label| match label {
                Label::Int64(v) => Scalar::Int64(*v),
                Label::Utf8(v) => Scalar::Utf8(v.clone()),
            })
            .collect()),
    }
}

/// Row pairing produced by the probe phase: per output row, the source
/// position on each side (`None` meaning null-fill).
struct RowPlan {
    left: Vec<Option<usize>>,
    right: Vec<Option<usize>>,
}

fn build_map(keys: &[Scalar]) -> HashMap<KeyValue, Vec<usize>> {
    let mut map = HashMap::<KeyValue, Vec<usize>>::new();
    for (pos, key) in keys.iter().enumerate() {
        if let Some(value) = KeyValue::from_scalar(key) {
            map.entry(value).or_default().push(pos);
        }
    }
    map
}

fn plan_rows(left_keys: &[Scalar], right_keys: &[Scalar], how: JoinHow) -> RowPlan {
    let mut plan = RowPlan {
        left: Vec::new(),
        right: Vec::new(),
    };

    if matches!(how, JoinHow::Right) {
        // Same pairing rule with the sides swapped: every right row is
        // retained in right-input order.
        let left_map = build_map(left_keys);
        for (right_pos, key) in right_keys.iter().enumerate() {
            let matches = KeyValue::from_scalar(key).and_then(|value| left_map.get(&value));
            match matches {
                Some(positions) => {
                    for left_pos in positions {
                        plan.left.push(Some(*left_pos));
                        plan.right.push(Some(right_pos));
                    }
                }
                None => {
                    plan.left.push(None);
                    plan.right.push(Some(right_pos));
                }
            }
        }
        return plan;
    }

    let right_map = build_map(right_keys);
    let mut right_matched = vec![false; right_keys.len()];

    for (left_pos, key) in left_keys.iter().enumerate() {
        let matches = KeyValue::from_scalar(key).and_then(|value| right_map.get(&value));
        match matches {
            Some(positions) => {
                for right_pos in positions {
                    right_matched[*right_pos] = true;
                    plan.left.push(Some(left_pos));
                    plan.right.push(Some(*right_pos));
                }
            }
            None => {
                if matches!(how, JoinHow::Left | JoinHow::Outer) {
                    plan.left.push(Some(left_pos));
                    plan.right.push(None);
                }
            }
        }
    }

    if matches!(how, JoinHow::Outer) {
        for (right_pos, matched) in right_matched.iter().enumerate() {
            if !matched {
                plan.left.push(None);
                plan.right.push(Some(right_pos));
            }
        }
    }

    plan
}

/// Relational merge of two frames.
///
/// Cardinality follows the multiset cross-product rule: a key value with p
/// occurrences on the left and q on the right contributes p*q output rows.
/// The output gets a fresh 0..n index; a same-named key column is emitted
/// once, coalesced across sides; clashing non-key names take the configured
/// suffixes.
pub fn merge(left: &DataFrame, right: &DataFrame, spec: &MergeSpec) -> Result<DataFrame, JoinError> {
    let left_keys = key_scalars(left, &spec.left_key)?;
    let right_keys = key_scalars(right, &spec.right_key)?;

    let plan = plan_rows(&left_keys, &right_keys, spec.how);

    let shared_key_name = match (&spec.left_key, &spec.right_key) {
        (KeySelect::Column(a), KeySelect::Column(b)) if a == b => Some(a.as_str()),
        _ => None,
    };

    let left_names = left.column_names();
    let right_names = right.column_names();
    let collides = |name: &str| -> bool {
        Some(name) != shared_key_name
            && left_names.contains(&name)
            && right_names.contains(&name)
    };

    let mut columns = IndexMap::new();

    for (name, column) in left.columns() {
        if Some(name) == shared_key_name {
            // Coalesce: unmatched right-side rows still carry their key.
            let values = plan
                .left
                .iter()
                .zip(&plan.right)
                .map(|(left_slot, right_slot)| match (left_slot, right_slot) {
                    (Some(pos), _) => left_keys.get(*pos).cloned().unwrap_or(Scalar::Null),
                    (None, Some(pos)) => right_keys.get(*pos).cloned().unwrap_or(Scalar::Null),
                    (None, None) => Scalar::Null,
                })
                .collect::<Vec<_>>();
            columns.insert(name.to_owned(), Column::from_values(values)?);
            continue;
        }

        let out_name = if collides(name) {
            format!("{name}{}", spec.suffixes.0)
        } else {
            name.to_owned()
        };
        columns.insert(out_name, column.reindex_by_positions(&plan.left)?);
    }

    for (name, column) in right.columns() {
        if Some(name) == shared_key_name {
            continue;
        }

        let out_name = if collides(name) {
            format!("{name}{}", spec.suffixes.1)
        } else {
            name.to_owned()
        };
        columns.insert(out_name, column.reindex_by_positions(&plan.right)?);
    }

    let index = RowIndex::range(plan.left.len());
    Ok(DataFrame::new(index, columns)?)
}
