use crate::{error::TwinningError, pointset::PointSet, types::Matrix};
use log::{debug, warn};

/// Column scaling learned from a reference dataset.
///
/// Constant columns carry no information about the distribution and are
/// dropped; every other column is shifted to zero mean and scaled to unit
/// (population) standard deviation.
#[derive(Debug, Clone)]
pub struct Standardizer {
    input_dims: usize,
    keep: Vec<usize>,
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Standardizer {
    pub fn fit<P: PointSet + ?Sized>(data: &P) -> Result<Self, TwinningError> {
        if data.is_empty() {
            return Err(TwinningError::EmptyDataset);
        }
        let n = data.len() as f64;
        let first = data.point(0);
        let mut keep = Vec::new();
        let mut mean = Vec::new();
        let mut std = Vec::new();
        for col in 0..data.dims() {
            let constant = (1..data.len()).all(|i| data.point(i)[col] == first[col]);
            if constant {
                debug!("dropping constant column {}", col);
                continue;
            }
            let m = (0..data.len()).map(|i| data.point(i)[col]).sum::<f64>() / n;
            let var = (0..data.len())
                .map(|i| {
                    let d = data.point(i)[col] - m;
                    d * d
                })
                .sum::<f64>()
                / n;
            keep.push(col);
            mean.push(m);
            std.push(var.sqrt());
        }
        if keep.is_empty() {
            warn!("all the columns of the dataset are constant");
        }
        Ok(Self {
            input_dims: data.dims(),
            keep,
            mean,
            std,
        })
    }

    /// Number of columns of the standardized output.
    pub fn output_dims(&self) -> usize {
        self.keep.len()
    }

    pub fn transform<P: PointSet + ?Sized>(&self, points: &P) -> Result<Matrix, TwinningError> {
        if points.dims() != self.input_dims {
            return Err(TwinningError::DimensionMismatch {
                expected: self.input_dims,
                got: points.dims(),
            });
        }
        let mut data = Vec::with_capacity(points.len() * self.keep.len());
        for i in 0..points.len() {
            let p = points.point(i);
            for (j, &col) in self.keep.iter().enumerate() {
                data.push((p[col] - self.mean[j]) / self.std[j]);
            }
        }
        Matrix::new(data, points.len(), self.keep.len())
    }
}

/// Fits a [`Standardizer`] on `data` and applies it to `data` itself.
pub fn standardize<P: PointSet + ?Sized>(data: &P) -> Result<Matrix, TwinningError> {
    Standardizer::fit(data)?.transform(data)
}
