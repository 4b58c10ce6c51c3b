//! Energy distance between a dataset and a candidate set of points.
//!
//! The smaller the score, the more the points are distributed like the
//! dataset. Distances among the points of the dataset are the same for any
//! candidate, hence they are left out.
use crate::ParallelAlgorithm;
use anyhow::Context;
use log::info;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::{Duration, Instant};
use twinning_base::{
    algorithm::Algorithm, perf_counters, pointset::check_finite, standardize::Standardizer,
    types::Distance, MatrixView, PointSet, TwinningError,
};

/// Computes
///
/// ```text
/// 2 / (N n) * sum_i sum_j |s_i - x_j|  -  1 / n^2 * sum_i sum_{j != i} |s_i - s_j|
/// ```
///
/// where `x` are the `N` points of `full` and `s` the `n` points of `subset`.
/// The sums for each point of `subset` are computed in parallel on the
/// current rayon pool, and then added up sequentially in point order, so
/// that the result does not depend on the number of threads.
pub fn energy_distance<P, Q>(full: &P, subset: &Q) -> Result<f64, TwinningError>
where
    P: PointSet + Sync + ?Sized,
    Q: PointSet + Sync + ?Sized,
{
    if full.is_empty() || subset.is_empty() {
        return Err(TwinningError::EmptyDataset);
    }
    if full.dims() != subset.dims() {
        return Err(TwinningError::DimensionMismatch {
            expected: full.dims(),
            got: subset.dims(),
        });
    }
    check_finite(full)?;
    check_finite(subset)?;
    let big_n = full.len();
    let n = subset.len();

    let partial: Vec<(f64, f64)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let p = subset.point(i);
            let ed_1: f64 = (0..big_n).map(|j| p.distance(full.point(j))).sum();
            let ed_2: f64 = (0..n)
                .filter(|&j| j != i)
                .map(|j| p.distance(subset.point(j)))
                .sum();
            (ed_1, ed_2)
        })
        .collect();
    perf_counters::add_distance_count((n * (big_n + n - 1)) as u64);

    let (sum_1, sum_2) = partial
        .iter()
        .fold((0.0f64, 0.0f64), |(a, b), (ed_1, ed_2)| (a + ed_1, b + ed_2));
    Ok(2.0 * sum_1 / (big_n as f64 * n as f64) - sum_2 / (n as f64 * n as f64))
}

/// Energy distance after scaling both inputs with the column statistics of
/// `data`. Columns that are constant in `data` are ignored.
pub fn standardized_energy_distance<P, Q>(data: &P, points: &Q) -> Result<f64, TwinningError>
where
    P: PointSet + Sync + ?Sized,
    Q: PointSet + Sync + ?Sized,
{
    if data.dims() != points.dims() {
        return Err(TwinningError::DimensionMismatch {
            expected: data.dims(),
            got: points.dims(),
        });
    }
    let scaler = Standardizer::fit(data)?;
    let data = scaler.transform(data)?;
    let points = scaler.transform(points)?;
    energy_distance(&data, &points)
}

pub struct Energy {
    pub standardize: bool,
    pool: Option<ThreadPool>,
    profile: Option<Duration>,
    counters: Option<u64>,
}

impl Energy {
    /// With `threads == None` the global rayon pool is used, which has
    /// one thread per core.
    pub fn new(standardize: bool, threads: Option<usize>) -> anyhow::Result<Self> {
        let pool = match threads {
            Some(threads) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("building the thread pool")?,
            ),
            None => None,
        };
        Ok(Self {
            standardize,
            pool,
            profile: None,
            counters: None,
        })
    }
}

impl Algorithm for Energy {
    fn version(&self) -> u32 {
        1
    }

    fn name(&self) -> String {
        String::from("Energy")
    }

    fn parameters(&self) -> String {
        format!(
            r#"{{ "standardize": {}, "threads": {} }}"#,
            self.standardize,
            self.pool
                .as_ref()
                .map(|p| p.current_num_threads())
                .unwrap_or_else(rayon::current_num_threads)
        )
    }

    fn time_profile(&self) -> Duration {
        self.profile.unwrap_or_default()
    }

    fn counters(&self) -> u64 {
        self.counters.unwrap_or_default()
    }
}

impl ParallelAlgorithm for Energy {
    fn parallel_run(
        &mut self,
        dataset: &MatrixView<'_>,
        points: &MatrixView<'_>,
    ) -> anyhow::Result<f64> {
        let start = Instant::now();
        let standardize = self.standardize;
        let compute = || {
            if standardize {
                standardized_energy_distance(dataset, points)
            } else {
                energy_distance(dataset, points)
            }
        };
        let score = match self.pool.as_ref() {
            Some(pool) => pool.install(compute),
            None => compute(),
        }
        .context("computing the energy distance")?;
        let elapsed = start.elapsed();
        info!(
            "energy distance of {} points to {} points is {} ({:?})",
            points.len(),
            dataset.len(),
            score,
            elapsed
        );
        self.profile.replace(elapsed);
        self.counters.replace(perf_counters::distance_count());
        Ok(score)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand_xorshift::XorShiftRng;
    use twinning_base::Matrix;

    fn line(values: &[f64]) -> Matrix {
        Matrix::from_rows(values.iter().map(|&x| vec![x]).collect()).unwrap()
    }

    #[test]
    fn test_whole_set() {
        let mut rng = XorShiftRng::seed_from_u64(10);
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|_| (0..3).map(|_| rng.gen::<f64>()).collect())
            .collect();
        let data = Matrix::from_rows(rows).unwrap();
        let n = data.num_rows();

        let mut pairwise = 0.0;
        for i in 0..n {
            for j in 0..n {
                pairwise += data.point(i).distance(data.point(j));
            }
        }
        let expected = pairwise / (n * n) as f64;
        let score = energy_distance(&data, &data).unwrap();
        assert!((score - expected).abs() < 1e-9, "{} != {}", score, expected);
    }

    #[test]
    fn test_small_example() {
        // full = {0, 2}, subset = {1}
        // ed_1 = 1 + 1 = 2, ed_2 = 0
        let score = energy_distance(&line(&[0.0, 2.0]), &line(&[1.0])).unwrap();
        assert!((score - 2.0).abs() < 1e-12);

        // full = {0, 1, 2, 3}, subset = {0, 3}
        // ed_1 = (0+1+2+3) + (3+2+1+0) = 12, ed_2 = 3 + 3 = 6
        // 2 * 12 / 8 - 6 / 4 = 1.5
        let score = energy_distance(&line(&[0.0, 1.0, 2.0, 3.0]), &line(&[0.0, 3.0])).unwrap();
        assert!((score - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_spread_subset_beats_clumped_subset() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let data = line(&values);
        let spread: Vec<f64> = (0..10).map(|i| 5.0 + 10.0 * i as f64).collect();
        let clumped: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let spread = energy_distance(&data, &line(&spread)).unwrap();
        let clumped = energy_distance(&data, &line(&clumped)).unwrap();
        assert!(spread >= 0.0);
        assert!(spread < clumped, "{} >= {}", spread, clumped);
    }

    #[test]
    fn test_non_negative_on_random_subsets() {
        let mut rng = XorShiftRng::seed_from_u64(123);
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|_| (0..3).map(|_| rng.gen::<f64>()).collect())
            .collect();
        let data = Matrix::from_rows(rows).unwrap();
        for &n in &[1usize, 5, 20, 199] {
            let selected: Vec<usize> = (0..200).choose_multiple(&mut rng, n);
            let subset = Matrix::from_selection(&data, &selected);
            let score = energy_distance(&data, &subset).unwrap();
            assert!(score >= 0.0, "negative score {} for {} points", score, n);
        }
    }

    #[test]
    fn test_independent_of_threads() {
        let mut rng = XorShiftRng::seed_from_u64(77);
        let data: Vec<f64> = (0..400 * 2).map(|_| rng.gen::<f64>()).collect();
        let points: Vec<f64> = (0..40 * 2).map(|_| rng.gen::<f64>()).collect();
        let data = MatrixView::new(&data, 400, 2).unwrap();
        let points = MatrixView::new(&points, 40, 2).unwrap();

        let mut single = Energy::new(false, Some(1)).unwrap();
        let mut many = Energy::new(false, Some(4)).unwrap();
        let a = single.parallel_run(&data, &points).unwrap();
        let b = many.parallel_run(&data, &points).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, energy_distance(&data, &points).unwrap());
    }

    #[test]
    fn test_standardized() {
        // Scaling a column of both inputs by the same factor does not change
        // the standardized score
        let data = Matrix::from_rows(vec![
            vec![0.0, 1.0, 5.0],
            vec![1.0, 3.0, 5.0],
            vec![2.0, 2.0, 5.0],
            vec![3.0, 0.0, 5.0],
        ])
        .unwrap();
        let points = Matrix::from_rows(vec![vec![0.5, 1.0, 5.0], vec![2.5, 2.5, 5.0]]).unwrap();
        let scaled_data = Matrix::from_rows(vec![
            vec![0.0, 100.0, 5.0],
            vec![1.0, 300.0, 5.0],
            vec![2.0, 200.0, 5.0],
            vec![3.0, 0.0, 5.0],
        ])
        .unwrap();
        let scaled_points =
            Matrix::from_rows(vec![vec![0.5, 100.0, 5.0], vec![2.5, 250.0, 5.0]]).unwrap();
        let a = standardized_energy_distance(&data, &points).unwrap();
        let b = standardized_energy_distance(&scaled_data, &scaled_points).unwrap();
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_mismatched_inputs() {
        let data = Matrix::from_rows(vec![vec![0.0, 1.0]]).unwrap();
        let points = line(&[0.0]);
        assert_eq!(
            energy_distance(&data, &points),
            Err(TwinningError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
        let nan = Matrix::from_rows(vec![vec![0.0, std::f64::NAN]]).unwrap();
        assert_eq!(
            energy_distance(&data, &nan),
            Err(TwinningError::NonFinite { row: 0, col: 1 })
        );
        assert_eq!(
            energy_distance(&nan, &data),
            Err(TwinningError::NonFinite { row: 0, col: 1 })
        );
        let empty = Matrix::from_rows(Vec::new()).unwrap();
        assert_eq!(
            energy_distance(&data, &empty),
            Err(TwinningError::EmptyDataset)
        );
    }
}
