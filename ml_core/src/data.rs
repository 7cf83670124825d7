use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::MlError;

/// A dense supervised dataset: one feature row per target value.
///
/// The feature matrix is row-major with shape `(rows, features)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Dataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Errors
    /// Returns `MlError::ShapeMismatch` if `x` and `y` disagree on the row count.
    pub fn new(x: Array2<f64>, y: Array1<f64>) -> Result<Self, MlError> {
        if x.nrows() != y.len() {
            return Err(MlError::ShapeMismatch {
                what: "targets",
                got: y.len(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    /// Builds a dataset from per-row feature vectors.
    ///
    /// # Errors
    /// Returns `MlError::ShapeMismatch` if rows have different widths or the
    /// number of rows differs from the number of targets.
    pub fn from_rows(rows: &[Vec<f64>], y: Vec<f64>) -> Result<Self, MlError> {
        let width = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * width);

        for row in rows {
            if row.len() != width {
                return Err(MlError::ShapeMismatch {
                    what: "feature row",
                    got: row.len(),
                    expected: width,
                });
            }
            flat.extend_from_slice(row);
        }

        let x = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|_| MlError::InvalidInput("feature rows do not form a matrix"))?;

        Self::new(x, Array1::from_vec(y))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    #[inline]
    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    #[inline]
    pub fn y(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    /// Returns a new dataset holding the rows at `indices`, in that order.
    ///
    /// # Panics
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }
}
