pub mod algorithm;
pub mod dataset;
pub mod error;
pub mod perf_counters;
pub mod pointset;
pub mod standardize;
pub mod types;

pub use error::TwinningError;
pub use pointset::{MatrixView, PointSet};
pub use types::Matrix;
