use twinning_base::{perf_counters, types::Distance, PointSet};

/// A nearest neighbor index over a fixed set of points, from which points
/// can be removed one at a time.
///
/// Removal is one way: a removed point never comes back. Implementations
/// panic when asked for more neighbors than there are active points, and
/// when a point is removed twice, since both are bugs in the caller.
pub trait NeighborIndex {
    /// Number of points that have not been removed yet.
    fn num_active(&self) -> usize;

    /// Fills `out` with the `k` active points closest to `query`, sorted by
    /// increasing distance. Ties go to the smaller id, so the answer does
    /// not depend on the order in which candidates are visited.
    fn k_nearest(&self, query: &[f64], k: usize, out: &mut Neighbors);

    fn remove(&mut self, id: usize);
}

/// Bounded, sorted buffer of `(id, squared distance)` pairs.
///
/// It is allocated once with the largest `k` it will ever be asked for,
/// and reused across queries.
#[derive(Debug, Clone)]
pub struct Neighbors {
    max_k: usize,
    k: usize,
    ids: Vec<usize>,
    distances: Vec<f64>,
}

impl Neighbors {
    pub fn new(max_k: usize) -> Self {
        Self {
            max_k,
            k: max_k,
            ids: Vec::with_capacity(max_k + 1),
            distances: Vec::with_capacity(max_k + 1),
        }
    }

    /// Clears the buffer and sets up a query for `k` neighbors.
    pub fn init(&mut self, k: usize) {
        assert!(
            k > 0 && k <= self.max_k,
            "asked for {} neighbors, the buffer holds at most {}",
            k,
            self.max_k
        );
        self.k = k;
        self.ids.clear();
        self.distances.clear();
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() == self.k
    }

    /// The squared distance a candidate has to reach to enter the buffer.
    /// A candidate at exactly this distance enters only if its id is smaller
    /// than the one of the last entry.
    pub fn worst(&self) -> f64 {
        if self.is_full() {
            self.distances[self.k - 1]
        } else {
            std::f64::INFINITY
        }
    }

    /// Candidates are ordered by `(squared_distance, id)`.
    pub fn add(&mut self, id: usize, squared_distance: f64) {
        let key = (squared_distance, id);
        if self.is_full() && key >= (self.distances[self.k - 1], self.ids[self.k - 1]) {
            return;
        }
        let (mut lo, mut hi) = (0, self.ids.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if (self.distances[mid], self.ids[mid]) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let pos = lo;
        self.ids.insert(pos, id);
        self.distances.insert(pos, squared_distance);
        self.ids.truncate(self.k);
        self.distances.truncate(self.k);
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn squared_distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Linear scan over the active points, in id order.
pub struct BruteForce<'a, P: PointSet + ?Sized> {
    points: &'a P,
    active: Vec<bool>,
    num_active: usize,
}

impl<'a, P: PointSet + ?Sized> BruteForce<'a, P> {
    pub fn new(points: &'a P) -> Self {
        Self {
            points,
            active: vec![true; points.len()],
            num_active: points.len(),
        }
    }
}

impl<'a, P: PointSet + ?Sized> NeighborIndex for BruteForce<'a, P> {
    fn num_active(&self) -> usize {
        self.num_active
    }

    fn k_nearest(&self, query: &[f64], k: usize, out: &mut Neighbors) {
        assert!(
            k <= self.num_active,
            "asked for {} neighbors, only {} points are active",
            k,
            self.num_active
        );
        out.init(k);
        for (id, _) in self.active.iter().enumerate().filter(|(_, a)| **a) {
            out.add(id, query.squared_distance(self.points.point(id)));
        }
        perf_counters::add_distance_count(self.num_active as u64);
    }

    fn remove(&mut self, id: usize) {
        assert!(self.active[id], "point {} removed twice", id);
        self.active[id] = false;
        self.num_active -= 1;
    }
}
