//! The feature-sequence container shared by the MFCC pipeline, the DTW
//! aligner, and the distance kernels.

use crate::error::AlignError;

/// An ordered sequence of fixed-width feature vectors. `dim()` is
/// constant for the life of the matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f32>>,
    dim: usize,
}

impl FeatureMatrix {
    /// Build a matrix from rows, checking all rows share one dimension.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, AlignError> {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        for (i, r) in rows.iter().enumerate() {
            if r.len() != dim {
                return Err(AlignError::InvalidDimension(format!(
                    "row {i} has width {}, expected {dim}",
                    r.len()
                )));
            }
        }
        Ok(Self { rows, dim })
    }

    /// An empty matrix of the given dimension.
    pub fn empty(dim: usize) -> Self {
        Self {
            rows: Vec::new(),
            dim,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.rows[i]
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Vec<f32>) -> Result<(), AlignError> {
        if self.rows.is_empty() && self.dim == 0 {
            self.dim = row.len();
        } else if row.len() != self.dim {
            return Err(AlignError::InvalidDimension(format!(
                "row has width {}, expected {}",
                row.len(),
                self.dim
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Per-coefficient mean across all rows (used by MFCC normalization).
    pub fn column_means(&self) -> Vec<f32> {
        let mut means = vec![0.0f32; self.dim];
        if self.rows.is_empty() {
            return means;
        }
        for row in &self.rows {
            for (m, &v) in means.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= self.rows.len() as f32;
        }
        means
    }

    /// Per-coefficient standard deviation across all rows.
    pub fn column_stddevs(&self, means: &[f32]) -> Vec<f32> {
        let mut vars = vec![0.0f32; self.dim];
        if self.rows.is_empty() {
            return vars;
        }
        for row in &self.rows {
            for ((v, &x), &mean) in vars.iter_mut().zip(row.iter()).zip(means.iter()) {
                *v += (x - mean).powi(2);
            }
        }
        for v in &mut vars {
            *v = (*v / self.rows.len() as f32).sqrt();
        }
        vars
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.rows[i]
    }
}
