use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::MlError;

/// A supervised regression model.
///
/// A `Regressor` owns its fitted parameters. It does not:
/// - load or split data,
/// - compute evaluation metrics,
/// - persist itself anywhere.
pub trait Regressor: Send + Sync {
    /// Fits the model on a feature matrix of shape `(rows, features)` and its targets.
    ///
    /// # Errors
    /// Returns `MlError` if the shapes disagree or there is nothing to fit on.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), MlError>;

    /// Predicts one target per row of `x`.
    ///
    /// # Errors
    /// Returns `MlError::NotFitted` before `fit`, or `MlError::ShapeMismatch`
    /// when `x` does not have the fitted number of features.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, MlError>;
}
