#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Label {
    Int64(i64),
    Utf8(String),
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

/// Ordered row labels. Duplicates are representable; operations that cannot
/// handle them check with `has_duplicates` and fail loudly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIndex {
    labels: Vec<Label>,
}

impl RowIndex {
    #[must_use]
    pub fn new(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// Fresh default index 0..n, the shape every loader and merge output uses.
    #[must_use]
    pub fn range(len: usize) -> Self {
        Self::new((0..len as i64).map(Label::from).collect())
    }

    #[must_use]
    pub fn from_utf8(values: Vec<String>) -> Self {
        Self::new(values.into_iter().map(Label::from).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.labels.len());
        self.labels.iter().any(|label| !seen.insert(label))
    }

    /// First position of each label; duplicates keep their first slot.
    #[must_use]
    pub fn first_positions(&self) -> HashMap<Label, usize> {
        let mut positions = HashMap::with_capacity(self.labels.len());
        for (idx, label) in self.labels.iter().enumerate() {
            positions.entry(label.clone()).or_insert(idx);
        }
        positions
    }

    /// Chain several indexes end to end, as row-wise concatenation does.
    #[must_use]
    pub fn chain(parts: &[&Self]) -> Self {
        let mut labels = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            labels.extend_from_slice(part.labels());
        }
        Self::new(labels)
    }
}

/// How column-wise alignment treats labels present on only one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignPolicy {
    /// Keep only labels present on every side.
    Inner,
    /// Keep every label; absent positions null-fill downstream.
    Outer,
}

/// Output of alignment planning: the shared index plus, per side, where each
/// output row comes from (`None` meaning "fill with missing").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentPlan {
    pub index: RowIndex,
    pub left_positions: Vec<Option<usize>>,
    pub right_positions: Vec<Option<usize>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("alignment vectors must have equal lengths")]
    InvalidAlignmentVectors,
    #[error("alignment requires duplicate-free indexes on both sides")]
    DuplicateLabels,
}

fn plan_for(labels: Vec<Label>, left: &RowIndex, right: &RowIndex) -> AlignmentPlan {
    let left_map = left.first_positions();
    let right_map = right.first_positions();

    let left_positions = labels
        .iter()
        .map(|label| left_map.get(label).copied())
        .collect();
    let right_positions = labels
        .iter()
        .map(|label| right_map.get(label).copied())
        .collect();

    AlignmentPlan {
        index: RowIndex::new(labels),
        left_positions,
        right_positions,
    }
}

/// Union alignment: left labels in order, then right labels not seen on the
/// left, in right order.
pub fn align_union(left: &RowIndex, right: &RowIndex) -> Result<AlignmentPlan, IndexError> {
    if left.has_duplicates() || right.has_duplicates() {
        return Err(IndexError::DuplicateLabels);
    }

    let left_set = left.first_positions();
    let mut labels = left.labels.clone();
    for label in &right.labels {
        if !left_set.contains_key(label) {
            labels.push(label.clone());
        }
    }

    Ok(plan_for(labels, left, right))
}

/// Intersection alignment: left-order labels that also appear on the right.
pub fn align_intersection(left: &RowIndex, right: &RowIndex) -> Result<AlignmentPlan, IndexError> {
    if left.has_duplicates() || right.has_duplicates() {
        return Err(IndexError::DuplicateLabels);
    }

    let right_set = right.first_positions();
    let labels = left
        .labels
        .iter()
        .filter(|label| right_set.contains_key(*label))
        .cloned()
        .collect();

    Ok(plan_for(labels, left, right))
}

pub fn align(
    left: &RowIndex,
    right: &RowIndex,
    policy: AlignPolicy,
) -> Result<AlignmentPlan, IndexError> {
    match policy {
        AlignPolicy::Inner => align_intersection(left, right),
        AlignPolicy::Outer => align_union(left, right),
    }
}

pub fn validate_alignment_plan(plan: &AlignmentPlan) -> Result<(), IndexError> {
    if plan.left_positions.len() != plan.right_positions.len()
        || plan.left_positions.len() != plan.index.len()
    {
        return Err(IndexError::InvalidAlignmentVectors);
    }

    Ok(())
}
