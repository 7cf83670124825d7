use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::MlError;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of test rows for `n` rows and a test fraction.
///
/// Properties:
/// - equals `round(test_size * n)`, halves rounding away from zero,
/// - clamped to `[1, n - 1]` so neither side is empty.
pub fn test_len(n: usize, test_size: f64) -> usize {
    let raw = (test_size * n as f64).round() as usize;
    raw.clamp(1, n.saturating_sub(1).max(1))
}

/// Shuffles `0..n` with a seeded generator and cuts it in two.
///
/// The first `test_len(n, test_size)` shuffled indices form the test side and
/// the rest the train side. The same `(n, test_size, seed)` always yields the
/// same partition.
///
/// # Errors
/// - `MlError::InvalidInput` if `test_size` is not in the open interval (0, 1).
/// - `MlError::NotEnoughRows` if `n < 2`.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit, MlError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(MlError::InvalidInput("test_size must be in (0, 1)"));
    }
    if n < 2 {
        return Err(MlError::NotEnoughRows { needed: 2, got: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(test_len(n, test_size));
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}
