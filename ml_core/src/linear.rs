use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

use crate::{MlError, Regressor};

/// Ordinary least-squares linear regression with an intercept.
///
/// The intercept is recovered from the column means, so the least-squares
/// problem is solved on centered data. Rank-deficient designs (e.g. perfectly
/// collinear columns) are handled by a column-pivoted Householder QR: columns
/// found to be linearly dependent get a zero coefficient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a fitted model from known parameters.
    pub fn from_parts(coefficients: Array1<f64>, intercept: f64) -> Self {
        Self {
            coefficients: Some(coefficients),
            intercept,
        }
    }

    /// The fitted weights, one per feature, or `None` before `fit`.
    pub fn coefficients(&self) -> Option<ArrayView1<'_, f64>> {
        self.coefficients.as_ref().map(|c| c.view())
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), MlError> {
        if x.nrows() != y.len() {
            return Err(MlError::ShapeMismatch {
                what: "targets",
                got: y.len(),
                expected: x.nrows(),
            });
        }
        if x.nrows() == 0 {
            return Err(MlError::NotEnoughRows { needed: 1, got: 0 });
        }
        if x.ncols() == 0 {
            return Err(MlError::InvalidInput("at least one feature is required"));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(MlError::InvalidInput("features and targets must be finite"));
        }

        // nrows > 0 so the means exist.
        let x_mean = x.mean_axis(Axis(0)).ok_or(MlError::NotEnoughRows { needed: 1, got: 0 })?;
        let y_mean = y.mean().ok_or(MlError::NotEnoughRows { needed: 1, got: 0 })?;

        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let coefficients = least_squares(xc, yc);
        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, MlError> {
        let coefficients = self.coefficients.as_ref().ok_or(MlError::NotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(MlError::ShapeMismatch {
                what: "features",
                got: x.ncols(),
                expected: coefficients.len(),
            });
        }

        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// Minimizes `||a·w - b||²` with a column-pivoted Householder QR.
///
/// Returns the basic solution: coefficients of columns beyond the numerical
/// rank are zero.
fn least_squares(mut a: Array2<f64>, mut b: Array1<f64>) -> Array1<f64> {
    let (n, p) = a.dim();
    let mut perm: Vec<usize> = (0..p).collect();
    let mut norms: Vec<f64> = a.columns().into_iter().map(|c| c.dot(&c)).collect();

    let scale = norms.iter().copied().fold(0.0_f64, f64::max).sqrt();
    let tol = scale * f64::EPSILON * n.max(p) as f64;

    let mut rank = 0;
    for k in 0..n.min(p) {
        let pivot = (k..p).fold(k, |best, j| if norms[j] > norms[best] { j } else { best });
        if pivot != k {
            for i in 0..n {
                a.swap([i, k], [i, pivot]);
            }
            perm.swap(k, pivot);
            norms.swap(k, pivot);
        }

        let mut v = a.slice(s![k.., k]).to_owned();
        let col_norm = v.dot(&v).sqrt();
        if col_norm <= tol {
            break;
        }

        let alpha = if v[0] > 0.0 { -col_norm } else { col_norm };
        v[0] -= alpha;
        let v_norm2 = v.dot(&v);

        if v_norm2 > 0.0 {
            for j in k..p {
                let mut col = a.slice_mut(s![k.., j]);
                let f = 2.0 * v.dot(&col) / v_norm2;
                col.scaled_add(-f, &v);
            }
            let mut tail = b.slice_mut(s![k..]);
            let f = 2.0 * v.dot(&tail) / v_norm2;
            tail.scaled_add(-f, &v);
        }

        // Recomputed instead of downdated to avoid cancellation.
        for j in k + 1..p {
            let rest = a.slice(s![k + 1.., j]);
            norms[j] = rest.dot(&rest);
        }

        rank = k + 1;
    }

    let mut z = vec![0.0; rank];
    for i in (0..rank).rev() {
        let acc = (i + 1..rank).fold(b[i], |acc, j| acc - a[[i, j]] * z[j]);
        z[i] = acc / a[[i, i]];
    }

    let mut w = Array1::zeros(p);
    for (i, zi) in z.into_iter().enumerate() {
        w[perm[i]] = zi;
    }
    w
}
