use std::fmt;

/// Errors produced by the numeric routines when inputs are invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum MlError {
    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),

    /// A shape invariant was violated (e.g. mismatched lengths).
    ShapeMismatch {
        /// Human-readable context for the mismatch (e.g. "targets", "features").
        what: &'static str,
        /// Observed value.
        got: usize,
        /// Expected value.
        expected: usize,
    },

    /// An operation that needs at least `needed` rows received `got`.
    NotEnoughRows { needed: usize, got: usize },

    /// `predict` was called before `fit`.
    NotFitted,
}

impl fmt::Display for MlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            MlError::NotEnoughRows { needed, got } => {
                write!(f, "not enough rows: got {got}, need at least {needed}")
            }
            MlError::NotFitted => write!(f, "model has not been fitted"),
        }
    }
}

impl std::error::Error for MlError {}
