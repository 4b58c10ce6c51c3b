use thiserror::Error;

/// Errors caused by bad input, detected before any index work begins.
///
/// Violations of the index invariants (asking for more neighbors than there
/// are active points, removing a point twice) are bugs in the caller and
/// are not represented here: the index panics on them.
#[derive(Debug, Error, PartialEq)]
pub enum TwinningError {
    #[error("invalid value {value} for parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: usize,
        reason: String,
    },
    #[error("buffer of length {len} cannot hold a {rows}x{cols} matrix")]
    ShapeMismatch { len: usize, rows: usize, cols: usize },
    #[error("dimension mismatch: expected {expected} columns, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("non finite value at row {row}, column {col}")]
    NonFinite { row: usize, col: usize },
    #[error("the dataset has no points")]
    EmptyDataset,
}

impl TwinningError {
    pub fn invalid<S: Into<String>>(name: &'static str, value: usize, reason: S) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }
}
