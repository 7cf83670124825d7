//! Regression metrics over paired target/prediction vectors.

use ndarray::ArrayView1;

use crate::MlError;

fn check(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<(), MlError> {
    if y_true.len() != y_pred.len() {
        return Err(MlError::ShapeMismatch {
            what: "predictions",
            got: y_pred.len(),
            expected: y_true.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MlError::NotEnoughRows { needed: 1, got: 0 });
    }
    Ok(())
}

/// Mean squared error.
///
/// # Errors
/// Returns `MlError` if the inputs are empty or of different lengths.
pub fn mean_squared_error(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> Result<f64, MlError> {
    check(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Root mean squared error, in the unit of the target.
///
/// # Errors
/// Returns `MlError` if the inputs are empty or of different lengths.
pub fn root_mean_squared_error(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> Result<f64, MlError> {
    mean_squared_error(y_true, y_pred).map(f64::sqrt)
}

/// Mean absolute error.
///
/// # Errors
/// Returns `MlError` if the inputs are empty or of different lengths.
pub fn mean_absolute_error(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> Result<f64, MlError> {
    check(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Coefficient of determination.
///
/// A constant `y_true` yields `1.0` for a perfect prediction and `0.0`
/// otherwise, so the result is always finite.
///
/// # Errors
/// Returns `MlError` if the inputs are empty or of different lengths.
pub fn r2_score(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64, MlError> {
    check(y_true, y_pred)?;
    let mean = y_true.sum() / y_true.len() as f64;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}
