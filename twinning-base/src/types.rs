use crate::{
    error::TwinningError,
    pointset::{MatrixView, PointSet},
};
use serde::Deserialize;

pub trait Distance {
    fn squared_distance(&self, other: &Self) -> f64;

    fn distance(&self, other: &Self) -> f64 {
        self.squared_distance(other).sqrt()
    }
}

impl Distance for [f64] {
    fn squared_distance(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        self.iter()
            .zip(other.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }
}

/// A dense, row-major matrix of points, owning its data.
///
/// This is what datasets are loaded into; algorithms only see it through
/// [`PointSet`].
///
/// We manually implement deserialize in order to check that all the rows
/// have the same length while reading them.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl<'de> Deserialize<'de> for Matrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows: Vec<Vec<f64>> = Vec::deserialize(deserializer)?;
        Self::from_rows(rows).map_err(serde::de::Error::custom)
    }
}

impl Matrix {
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, TwinningError> {
        MatrixView::new(&data, rows, cols)?;
        Ok(Self { data, rows, cols })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TwinningError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows.iter() {
            if row.len() != cols {
                return Err(TwinningError::DimensionMismatch {
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    pub fn view(&self) -> MatrixView<'_> {
        MatrixView::new(&self.data, self.rows, self.cols)
            .expect("matrix shape is checked on construction")
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    /// Copies the given rows of `points`, in the given order, into a new matrix.
    pub fn from_selection<P: PointSet + ?Sized>(points: &P, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * points.dims());
        for &i in rows {
            data.extend_from_slice(points.point(i));
        }
        Self {
            data,
            rows: rows.len(),
            cols: points.dims(),
        }
    }
}

impl PointSet for Matrix {
    fn len(&self) -> usize {
        self.rows
    }

    fn dims(&self) -> usize {
        self.cols
    }

    fn point(&self, i: usize) -> &[f64] {
        assert!(i < self.rows, "point {} out of range ({} points)", i, self.rows);
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

#[test]
fn test_distance() {
    let a: &[f64] = &[0.0, 0.0];
    let b: &[f64] = &[3.0, 4.0];
    assert_eq!(a.squared_distance(b), 25.0);
    assert_eq!(a.distance(b), 5.0);
    assert_eq!(b.distance(b), 0.0);
}

#[test]
fn test_ragged_rows() {
    let res = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
    assert_eq!(
        res,
        Err(TwinningError::DimensionMismatch {
            expected: 2,
            got: 1
        })
    );
}

#[test]
fn test_from_selection() {
    let m = Matrix::from_rows(vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]]).unwrap();
    let s = Matrix::from_selection(&m.view(), &[2, 0]);
    assert_eq!(s.num_rows(), 2);
    assert_eq!(s.point(0), &[4.0, 5.0]);
    assert_eq!(s.point(1), &[0.0, 1.0]);
}
