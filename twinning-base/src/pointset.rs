use crate::error::TwinningError;

/// Read-only access to a set of points in a `dims()`-dimensional space.
///
/// Points are identified by their zero-based row index. Indexes and
/// evaluators only depend on this trait, never on how the points are stored.
pub trait PointSet {
    fn len(&self) -> usize;

    fn dims(&self) -> usize;

    /// Coordinates of the `i`-th point. Panics if `i >= self.len()`.
    fn point(&self, i: usize) -> &[f64];

    /// Per-dimension `(min, max)` of the points, if the implementor
    /// already knows it. Indexes use it to skip a pass over the data.
    fn bounding_box(&self) -> Option<Vec<(f64, f64)>> {
        None
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A borrowed, row-major `rows x cols` matrix.
///
/// The view never copies nor mutates the buffer, which must outlive it.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a> {
    data: &'a [f64],
    rows: usize,
    cols: usize,
}

impl<'a> MatrixView<'a> {
    pub fn new(data: &'a [f64], rows: usize, cols: usize) -> Result<Self, TwinningError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(TwinningError::ShapeMismatch {
                len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Self { data, rows, cols })
    }
}

impl<'a> PointSet for MatrixView<'a> {
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

/// Rejects points with NaN or infinite coordinates.
pub fn check_finite<P: PointSet + ?Sized>(points: &P) -> Result<(), TwinningError> {
    for row in 0..points.len() {
        if let Some(col) = points.point(row).iter().position(|x| !x.is_finite()) {
            return Err(TwinningError::NonFinite { row, col });
        }
    }
    Ok(())
}

/// Computes the per-dimension `(min, max)` of a non-empty point set.
pub fn bounding_box<P: PointSet + ?Sized>(points: &P) -> Vec<(f64, f64)> {
    let mut bbox = vec![(std::f64::INFINITY, std::f64::NEG_INFINITY); points.dims()];
    for i in 0..points.len() {
        for (b, &x) in bbox.iter_mut().zip(points.point(i)) {
            if x < b.0 {
                b.0 = x;
            }
            if x > b.1 {
                b.1 = x;
            }
        }
    }
    bbox
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_view_shape() {
        let data = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let view = MatrixView::new(&data, 3, 2).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.dims(), 2);
        assert_eq!(view.point(1), &[2.0, 3.0]);

        assert_eq!(
            MatrixView::new(&data, 4, 2).unwrap_err(),
            TwinningError::ShapeMismatch {
                len: 6,
                rows: 4,
                cols: 2
            }
        );
    }

    #[test]
    #[should_panic]
    fn test_view_out_of_range() {
        let data = vec![0.0, 1.0];
        let view = MatrixView::new(&data, 2, 1).unwrap();
        view.point(2);
    }

    #[test]
    fn test_check_finite() {
        let data = vec![0.0, 1.0, 2.0, std::f64::NAN];
        let view = MatrixView::new(&data, 2, 2).unwrap();
        assert_eq!(
            check_finite(&view),
            Err(TwinningError::NonFinite { row: 1, col: 1 })
        );
        let data = vec![0.0, 1.0];
        assert!(check_finite(&MatrixView::new(&data, 1, 2).unwrap()).is_ok());
    }

    #[test]
    fn test_bounding_box() {
        let data = vec![0.0, 5.0, -1.0, 2.0, 3.0, 4.0];
        let view = MatrixView::new(&data, 3, 2).unwrap();
        assert_eq!(bounding_box(&view), vec![(-1.0, 3.0), (2.0, 5.0)]);
    }
}
