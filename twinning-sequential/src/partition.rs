//! Partition of a dataset into bins of mutually close points.
//!
//! Both procedures walk the dataset greedily: starting from a point, the
//! `r` active points closest to it form a bin and are removed from the
//! index; the walk then jumps to the active point closest to the last point
//! of the bin, and the next bin is built around it. Each iteration depends
//! on the removals of the previous one, so the walk is inherently
//! sequential.
use crate::{
    index::{NeighborIndex, Neighbors},
    kdtree::KdTree,
};
use log::{debug, info};
use twinning_base::{pointset::check_finite, PointSet, TwinningError};

/// Validated parameters of a partition of `points`.
pub struct Partitioner<'a, P: PointSet + ?Sized> {
    points: &'a P,
    r: usize,
    u1: usize,
    leaf_size: usize,
}

impl<'a, P: PointSet + ?Sized> Partitioner<'a, P> {
    /// Checks that `1 <= r <= N`, `u1 < N` and `leaf_size > 0`, and that
    /// all the coordinates are finite.
    pub fn new(points: &'a P, r: usize, u1: usize, leaf_size: usize) -> Result<Self, TwinningError> {
        let n = points.len();
        if n == 0 {
            return Err(TwinningError::EmptyDataset);
        }
        if r == 0 || r > n {
            return Err(TwinningError::invalid(
                "r",
                r,
                format!("should be between 1 and the number of points ({})", n),
            ));
        }
        if u1 >= n {
            return Err(TwinningError::invalid(
                "u1",
                u1,
                format!("should be a point index smaller than {}", n),
            ));
        }
        if leaf_size == 0 {
            return Err(TwinningError::invalid("leaf_size", 0, "should be positive"));
        }
        check_finite(points)?;
        Ok(Self {
            points,
            r,
            u1,
            leaf_size,
        })
    }

    pub fn twin(&self) -> Vec<usize> {
        self.twin_with(KdTree::new(self.points, self.leaf_size))
    }

    pub fn sequence(&self) -> Vec<usize> {
        self.sequence_with(KdTree::new(self.points, self.leaf_size))
    }

    /// Picks one representative per bin: the point closest to each bin's
    /// starting point. The last representative is the starting point of the
    /// final bin, which is not consumed. Returns `ceil(N / r)` ids.
    pub fn twin_with<I: NeighborIndex>(&self, mut index: I) -> Vec<usize> {
        let n = self.points.len();
        let r = self.r;
        assert_eq!(index.num_active(), n, "the index should start full");

        let mut bin = Neighbors::new(r);
        let mut probe = Neighbors::new(1);
        let mut selected = Vec::with_capacity(n / r + 1);
        let mut position = self.u1;
        let mut consumed = 0;

        loop {
            index.k_nearest(self.points.point(position), r, &mut bin);
            selected.push(bin.ids()[0]);
            for &id in bin.ids() {
                index.remove(id);
            }
            consumed += r;
            if consumed == n {
                break;
            }

            let last = bin.ids()[r - 1];
            index.k_nearest(self.points.point(last), 1, &mut probe);
            position = probe.ids()[0];
            debug!("bin {} done, jumping to {}", selected.len(), position);

            if n - consumed <= r {
                selected.push(position);
                break;
            }
        }

        info!("selected {} points out of {}", selected.len(), n);
        selected
    }

    /// Orders all the points bin by bin, each bin sorted by distance from
    /// its starting point. The final bin holds the points left over, and no
    /// jump follows it. Returns a permutation of `0..N`.
    pub fn sequence_with<I: NeighborIndex>(&self, mut index: I) -> Vec<usize> {
        let n = self.points.len();
        let r = self.r;
        assert_eq!(index.num_active(), n, "the index should start full");

        let mut bin = Neighbors::new(r);
        let mut probe = Neighbors::new(1);
        let mut sequence = Vec::with_capacity(n);
        let mut position = self.u1;

        while sequence.len() < n {
            let remaining = n - sequence.len();
            let k = std::cmp::min(r, remaining);
            index.k_nearest(self.points.point(position), k, &mut bin);
            for &id in bin.ids() {
                sequence.push(id);
                index.remove(id);
            }
            if remaining <= r {
                break;
            }

            let last = bin.ids()[r - 1];
            index.k_nearest(self.points.point(last), 1, &mut probe);
            position = probe.ids()[0];
            debug!("{} points sequenced, jumping to {}", sequence.len(), position);
        }

        info!("sequenced {} points in bins of {}", sequence.len(), r);
        sequence
    }
}

/// Selects `ceil(N / r)` representative points of `points`, starting the
/// walk from point `u1`.
pub fn twin<P: PointSet + ?Sized>(
    points: &P,
    r: usize,
    u1: usize,
    leaf_size: usize,
) -> Result<Vec<usize>, TwinningError> {
    Ok(Partitioner::new(points, r, u1, leaf_size)?.twin())
}

/// Orders all the points of `points` into consecutive bins of `r` points,
/// starting the walk from point `u1`.
pub fn get_sequence<P: PointSet + ?Sized>(
    points: &P,
    r: usize,
    u1: usize,
    leaf_size: usize,
) -> Result<Vec<usize>, TwinningError> {
    Ok(Partitioner::new(points, r, u1, leaf_size)?.sequence())
}
