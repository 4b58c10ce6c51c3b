use crate::index::{NeighborIndex, Neighbors};
use log::debug;
use twinning_base::{perf_counters, pointset, types::Distance, PointSet};

/// A kd-tree built once over a point set, supporting the logical removal
/// of points.
///
/// Each node keeps the number of active points below it, so that subtrees
/// whose points have all been removed are skipped by queries. Removing a
/// point costs the depth of the tree; the structure is never rebuilt.
pub struct KdTree<'a, P: PointSet + ?Sized> {
    points: &'a P,
    /// Permutation of the point ids: each leaf owns a contiguous range.
    ids: Vec<usize>,
    nodes: Vec<Node>,
    /// For each point, the leaf it lives in.
    leaf_of: Vec<usize>,
    active: Vec<bool>,
    num_active: usize,
}

struct Node {
    /// Per-dimension bounds containing every point below the node.
    bbox: Vec<(f64, f64)>,
    parent: Option<usize>,
    active: usize,
    kind: NodeKind,
}

enum NodeKind {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        axis: usize,
        value: f64,
        left: usize,
        right: usize,
    },
}

impl<'a, P: PointSet + ?Sized> KdTree<'a, P> {
    /// Builds the tree with leaves of at most `leaf_size` points. The leaf
    /// size affects performance only.
    pub fn new(points: &'a P, leaf_size: usize) -> Self {
        assert!(leaf_size > 0, "leaf size should be positive");
        let n = points.len();
        let mut tree = Self {
            points,
            ids: (0..n).collect(),
            nodes: Vec::with_capacity(2 * (n / leaf_size + 1)),
            leaf_of: vec![0; n],
            active: vec![true; n],
            num_active: n,
        };
        if n > 0 {
            let bbox = points
                .bounding_box()
                .unwrap_or_else(|| pointset::bounding_box(points));
            tree.build(0, n, None, bbox, leaf_size);
        }
        debug!(
            "built kd-tree over {} points with {} nodes (leaf size {})",
            n,
            tree.nodes.len(),
            leaf_size
        );
        tree
    }

    fn build(
        &mut self,
        start: usize,
        end: usize,
        parent: Option<usize>,
        bbox: Vec<(f64, f64)>,
        leaf_size: usize,
    ) -> usize {
        let node_idx = self.nodes.len();
        let dims = self.points.dims();
        if end - start <= leaf_size || dims == 0 {
            for &id in &self.ids[start..end] {
                self.leaf_of[id] = node_idx;
            }
            self.nodes.push(Node {
                bbox,
                parent,
                active: end - start,
                kind: NodeKind::Leaf { start, end },
            });
            return node_idx;
        }

        // Split along the widest side of the bounding box, at the median
        let axis = (0..dims)
            .max_by(|&a, &b| {
                let wa = bbox[a].1 - bbox[a].0;
                let wb = bbox[b].1 - bbox[b].0;
                wa.total_cmp(&wb)
            })
            .unwrap_or(0);
        let mid = start + (end - start) / 2;
        let points = self.points;
        self.ids[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            points.point(a)[axis].total_cmp(&points.point(b)[axis])
        });
        let value = points.point(self.ids[mid])[axis];

        let mut left_bbox = bbox.clone();
        left_bbox[axis].1 = value;
        let mut right_bbox = bbox.clone();
        right_bbox[axis].0 = value;

        // Push a placeholder, the children are filled in below
        self.nodes.push(Node {
            bbox,
            parent,
            active: end - start,
            kind: NodeKind::Leaf { start, end },
        });
        let left = self.build(start, mid, Some(node_idx), left_bbox, leaf_size);
        let right = self.build(mid, end, Some(node_idx), right_bbox, leaf_size);
        self.nodes[node_idx].kind = NodeKind::Split {
            axis,
            value,
            left,
            right,
        };
        node_idx
    }

    fn search(&self, node_idx: usize, query: &[f64], out: &mut Neighbors, evals: &mut u64) {
        let node = &self.nodes[node_idx];
        if node.active == 0 {
            return;
        }
        // A box at exactly the worst distance may still hold a smaller id
        if out.is_full() && min_squared_distance(query, &node.bbox) > out.worst() {
            return;
        }
        match node.kind {
            NodeKind::Leaf { start, end } => {
                for &id in &self.ids[start..end] {
                    if self.active[id] {
                        *evals += 1;
                        out.add(id, query.squared_distance(self.points.point(id)));
                    }
                }
            }
            NodeKind::Split {
                axis,
                value,
                left,
                right,
            } => {
                let (first, second) = if query[axis] < value {
                    (left, right)
                } else {
                    (right, left)
                };
                self.search(first, query, out, evals);
                self.search(second, query, out, evals);
            }
        }
    }
}

/// Squared distance between `query` and the closest point of the box.
fn min_squared_distance(query: &[f64], bbox: &[(f64, f64)]) -> f64 {
    query
        .iter()
        .zip(bbox.iter())
        .map(|(&q, &(lo, hi))| {
            if q < lo {
                (lo - q) * (lo - q)
            } else if q > hi {
                (q - hi) * (q - hi)
            } else {
                0.0
            }
        })
        .sum()
}

impl<'a, P: PointSet + ?Sized> NeighborIndex for KdTree<'a, P> {
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
        let mut evals = 0u64;
        self.search(0, query, out, &mut evals);
        perf_counters::add_distance_count(evals);
        debug_assert_eq!(out.len(), k);
    }

    fn remove(&mut self, id: usize) {
        assert!(self.active[id], "point {} removed twice", id);
        self.active[id] = false;
        self.num_active -= 1;
        let mut node = Some(self.leaf_of[id]);
        while let Some(idx) = node {
            self.nodes[idx].active -= 1;
            node = self.nodes[idx].parent;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::BruteForce;
    use rand::prelude::*;
    use rand_xorshift::XorShiftRng;
    use twinning_base::{Matrix, MatrixView};

    fn random_matrix(rng: &mut XorShiftRng, n: usize, dims: usize) -> Matrix {
        let data: Vec<f64> = (0..n * dims).map(|_| rng.gen::<f64>()).collect();
        Matrix::new(data, n, dims).unwrap()
    }

    #[test]
    fn test_same_as_brute_force() {
        let mut rng = XorShiftRng::seed_from_u64(1234);
        for &(n, dims, leaf_size, k) in &[
            (100, 1, 1, 3),
            (200, 2, 4, 5),
            (500, 3, 8, 10),
            (300, 5, 16, 1),
        ] {
            let data = random_matrix(&mut rng, n, dims);
            let mut tree = KdTree::new(&data, leaf_size);
            let mut brute = BruteForce::new(&data);
            let mut from_tree = Neighbors::new(k);
            let mut from_brute = Neighbors::new(k);

            // Remove half the points while querying
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut rng);
            for &id in order.iter().take(n / 2) {
                let query = data.point(id).to_vec();
                tree.k_nearest(&query, k, &mut from_tree);
                brute.k_nearest(&query, k, &mut from_brute);
                assert_eq!(from_tree.ids(), from_brute.ids());
                assert_eq!(from_tree.squared_distances(), from_brute.squared_distances());
                tree.remove(id);
                brute.remove(id);
                assert_eq!(tree.num_active(), brute.num_active());
            }
        }
    }

    /// Reports a bounding box larger than the points actually need.
    struct WithHint<'a>(&'a Matrix, Vec<(f64, f64)>);

    impl<'a> PointSet for WithHint<'a> {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn dims(&self) -> usize {
            self.0.dims()
        }

        fn point(&self, i: usize) -> &[f64] {
            self.0.point(i)
        }

        fn bounding_box(&self) -> Option<Vec<(f64, f64)>> {
            Some(self.1.clone())
        }
    }

    #[test]
    fn test_bounding_box_hint() {
        let mut rng = XorShiftRng::seed_from_u64(31);
        let data = random_matrix(&mut rng, 200, 2);
        let hinted = WithHint(&data, vec![(-1.0, 2.0), (-5.0, 5.0)]);
        let tree = KdTree::new(&hinted, 4);
        let brute = BruteForce::new(&data);
        let mut from_tree = Neighbors::new(6);
        let mut from_brute = Neighbors::new(6);
        for query in &[[0.5, 0.5], [-3.0, 0.2], [1.5, 4.0]] {
            tree.k_nearest(query, 6, &mut from_tree);
            brute.k_nearest(query, 6, &mut from_brute);
            assert_eq!(from_tree.ids(), from_brute.ids());
        }
    }

    #[test]
    fn test_removed_points_are_not_returned() {
        let data = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let view = MatrixView::new(&data, 8, 1).unwrap();
        let mut tree = KdTree::new(&view, 2);
        let mut nn = Neighbors::new(8);
        for id in &[3, 4, 2] {
            tree.remove(*id);
        }
        tree.k_nearest(&[3.5], 5, &mut nn);
        assert_eq!(nn.ids(), &[5, 1, 6, 0, 7]);
        assert_eq!(nn.squared_distances(), &[2.25, 6.25, 6.25, 12.25, 12.25]);
    }

    #[test]
    fn test_ties_independent_of_leaf_size() {
        // Integer coordinates on a grid produce many equal distances
        let rows: Vec<Vec<f64>> = (0..64)
            .map(|i| vec![(i % 8) as f64, (i / 8) as f64])
            .collect();
        let data = Matrix::from_rows(rows).unwrap();
        let brute = BruteForce::new(&data);
        let mut from_tree = Neighbors::new(9);
        let mut from_brute = Neighbors::new(9);
        for &leaf_size in &[1, 2, 3, 5, 8, 64] {
            let tree = KdTree::new(&data, leaf_size);
            for query in &[[3.0, 3.0], [0.0, 0.0], [3.5, 4.0], [7.0, 2.0]] {
                for k in 1..=9 {
                    tree.k_nearest(query, k, &mut from_tree);
                    brute.k_nearest(query, k, &mut from_brute);
                    assert_eq!(
                        from_tree.ids(),
                        from_brute.ids(),
                        "leaf_size={} query={:?} k={}",
                        leaf_size,
                        query,
                        k
                    );
                }
            }
        }
    }

    #[test]
    fn test_all_points_removed_from_a_leaf() {
        let data = Matrix::from_rows((0..20).map(|i| vec![i as f64, 0.0]).collect()).unwrap();
        let mut tree = KdTree::new(&data, 3);
        for id in 0..19 {
            tree.remove(id);
        }
        let mut nn = Neighbors::new(1);
        tree.k_nearest(&[0.0, 0.0], 1, &mut nn);
        assert_eq!(nn.ids(), &[19]);
    }

    #[test]
    fn test_duplicates_and_constant_axis() {
        let data = Matrix::from_rows(vec![vec![1.0, 1.0]; 30]).unwrap();
        let tree = KdTree::new(&data, 4);
        let mut nn = Neighbors::new(30);
        tree.k_nearest(&[1.0, 1.0], 30, &mut nn);
        let mut ids = nn.ids().to_vec();
        ids.sort_unstable();
        assert_eq!(ids, (0..30).collect::<Vec<usize>>());
    }

    #[test]
    #[should_panic]
    fn test_too_many_neighbors() {
        let data = Matrix::from_rows(vec![vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let mut tree = KdTree::new(&data, 1);
        tree.remove(0);
        let mut nn = Neighbors::new(3);
        tree.k_nearest(&[0.0], 3, &mut nn);
    }
}
