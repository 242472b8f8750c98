//! Categorical encoding: string indexing and one-hot vectors.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unseen label '{label}' in column {column}")]
    UnseenLabel { column: String, label: String },

    #[error("index {index} out of range for {categories} categories")]
    IndexOutOfRange { index: usize, categories: usize },
}

/// How labels are ordered when assigning indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StringOrder {
    /// Most frequent label first; ties are broken alphabetically.
    #[default]
    FrequencyDesc,
    FrequencyAsc,
    AlphabetDesc,
    AlphabetAsc,
}

/// What to do with a label that was not seen during fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HandleInvalid {
    #[default]
    Error,
    /// Map unseen labels to an extra index, one past the last fitted label.
    Keep,
}

/// A fitted mapping from the string values of a column to dense integer codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringIndexer {
    pub column: String,
    pub labels: Vec<String>,
    pub handle_invalid: HandleInvalid,
    #[serde(skip)]
    lookup: FxHashMap<String, usize>,
}
impl StringIndexer {
    pub fn fit<'a>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = &'a str>,
        order: StringOrder,
        handle_invalid: HandleInvalid,
    ) -> Self {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
        }
        let mut counted: Vec<_> = counts.into_iter().collect();
        counted.sort_by(|(a_label, a_count), (b_label, b_count)| match order {
            StringOrder::FrequencyDesc => b_count.cmp(a_count).then_with(|| a_label.cmp(b_label)),
            StringOrder::FrequencyAsc => a_count.cmp(b_count).then_with(|| a_label.cmp(b_label)),
            StringOrder::AlphabetDesc => b_label.cmp(a_label),
            StringOrder::AlphabetAsc => a_label.cmp(b_label),
        });
        let labels = counted
            .into_iter()
            .map(|(label, _)| label.to_string())
            .collect();
        Self::with_labels(column, labels, handle_invalid)
    }

    /// Reconstitutes an indexer from a previously fitted vocabulary.
    pub fn with_labels(
        column: impl Into<String>,
        labels: Vec<String>,
        handle_invalid: HandleInvalid,
    ) -> Self {
        let lookup = labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.clone(), index))
            .collect();
        Self {
            column: column.into(),
            labels,
            handle_invalid,
            lookup,
        }
    }

    /// Rebuilds the lookup table after deserialisation.
    pub(crate) fn reindex(self) -> Self {
        Self::with_labels(self.column, self.labels, self.handle_invalid)
    }

    /// Number of distinct indices this indexer can emit.
    pub fn categories(&self) -> usize {
        match self.handle_invalid {
            HandleInvalid::Error => self.labels.len(),
            HandleInvalid::Keep => self.labels.len() + 1,
        }
    }

    pub fn transform(&self, label: &str) -> Result<usize, EncodeError> {
        match (self.lookup.get(label), self.handle_invalid) {
            (Some(&index), _) => Ok(index),
            (None, HandleInvalid::Keep) => Ok(self.labels.len()),
            (None, HandleInvalid::Error) => Err(EncodeError::UnseenLabel {
                column: self.column.clone(),
                label: label.to_string(),
            }),
        }
    }

    /// The label for a given index, or `None` for the unseen-label bucket.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// A vector holding only its non-zero entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    pub size: usize,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}
impl SparseVector {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn unit(size: usize, index: usize) -> Self {
        debug_assert!(index < size);
        Self {
            size,
            indices: vec![index],
            values: vec![1.0],
        }
    }

    /// Writes the entries of this vector into `dense`, which must be `size` elements long.
    pub fn scatter(&self, dense: &mut [f64]) {
        debug_assert_eq!(self.size, dense.len());
        for (&index, &value) in self.indices.iter().zip(&self.values) {
            dense[index] = value;
        }
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.size];
        self.scatter(&mut dense);
        dense
    }
}

/// Maps category indices to indicator vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Omit the last category, which then encodes as the all-zero vector. This keeps the
    /// encoded columns linearly independent of an intercept.
    pub drop_last: bool,
}
impl Default for OneHotEncoder {
    fn default() -> Self {
        Self { drop_last: true }
    }
}
impl OneHotEncoder {
    pub fn size(&self, categories: usize) -> usize {
        if self.drop_last {
            categories.saturating_sub(1)
        } else {
            categories
        }
    }

    pub fn encode(&self, index: usize, categories: usize) -> Result<SparseVector, EncodeError> {
        if index >= categories {
            return Err(EncodeError::IndexOutOfRange { index, categories });
        }
        let size = self.size(categories);
        match index.cmp(&size) {
            Ordering::Less => Ok(SparseVector::unit(size, index)),
            _ => Ok(SparseVector::zeros(size)),
        }
    }
}
