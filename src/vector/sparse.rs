use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Fixed-width sparse term-weight vector.
///
/// `indices` is strictly ascending and every stored value is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    width: usize,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    pub fn zeros(width: usize) -> Self {
        SparseVector {
            width,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds from unordered (column, weight) pairs; duplicate columns are summed
    pub fn from_pairs(width: usize, pairs: impl IntoIterator<Item = (u32, f32)>) -> Result<Self> {
        let mut pairs: Vec<(u32, f32)> = pairs.into_iter().collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let mut indices = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());

        for (idx, value) in pairs {
            if idx as usize >= width {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("Column {} outside vector width {}", idx, width),
                ));
            }
            if indices.last() == Some(&idx) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
            } else {
                indices.push(idx);
                values.push(value);
            }
        }

        let mut vector = SparseVector { width, indices, values };
        vector.drop_zeros();
        Ok(vector)
    }

    pub fn from_dense(dense: &[f32]) -> Self {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (i, &v) in dense.iter().enumerate() {
            if v != 0.0 {
                indices.push(i as u32);
                values.push(v);
            }
        }
        SparseVector {
            width: dense.len(),
            indices,
            values,
        }
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.width];
        for (idx, value) in self.iter() {
            dense[idx as usize] = value;
        }
        dense
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(&self, idx: u32) -> f32 {
        match self.indices.binary_search(&idx) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Scale to unit length; a zero vector stays zero
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let mut sum = 0.0;
        let (mut i, mut j) = (0, 0);

        while i < self.indices.len() && j < other.indices.len() {
            let (a, b) = (self.indices[i], other.indices[j]);
            if a == b {
                sum += self.values[i] * other.values[j];
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }

        sum
    }

    /// Cosine similarity; 0.0 when either side is zero or the widths differ
    pub fn cosine(&self, other: &SparseVector) -> f32 {
        if self.width != other.width {
            return 0.0;
        }
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        self.dot(other) / denom
    }

    /// Fraction of this vector's weight sitting on columns `other` also has.
    ///
    /// NaN when this vector has no weight at all, so callers can discard it.
    pub fn completeness(&self, other: &SparseVector) -> f32 {
        let total = self.sum();
        let mut matched = 0.0;
        let (mut i, mut j) = (0, 0);

        while i < self.indices.len() && j < other.indices.len() {
            let (a, b) = (self.indices[i], other.indices[j]);
            if a == b {
                matched += self.values[i];
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }

        if total == 0.0 {
            return f32::NAN;
        }
        matched / total
    }

    /// Element-wise sum, used for pod aggregates
    pub fn add(&self, other: &SparseVector) -> Result<SparseVector> {
        if self.width != other.width {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Cannot add vectors of width {} and {}", self.width, other.width),
            ));
        }

        let mut indices = Vec::with_capacity(self.nnz() + other.nnz());
        let mut values = Vec::with_capacity(self.nnz() + other.nnz());
        let (mut i, mut j) = (0, 0);

        while i < self.indices.len() || j < other.indices.len() {
            let a = self.indices.get(i).copied().unwrap_or(u32::MAX);
            let b = other.indices.get(j).copied().unwrap_or(u32::MAX);
            if a == b {
                indices.push(a);
                values.push(self.values[i] + other.values[j]);
                i += 1;
                j += 1;
            } else if a < b {
                indices.push(a);
                values.push(self.values[i]);
                i += 1;
            } else {
                indices.push(b);
                values.push(other.values[j]);
                j += 1;
            }
        }

        let mut sum = SparseVector { width: self.width, indices, values };
        sum.drop_zeros();
        Ok(sum)
    }

    fn drop_zeros(&mut self) {
        if self.values.iter().all(|&v| v != 0.0) {
            return;
        }
        let (indices, values) = self.indices.iter().copied()
            .zip(self.values.iter().copied())
            .filter(|&(_, v)| v != 0.0)
            .unzip();
        self.indices = indices;
        self.values = values;
    }
}
