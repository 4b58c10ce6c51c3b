//! Partition of a dataset into `k` disjoint folds that are each distributed
//! like the whole dataset.
use crate::{
    partition::{get_sequence, twin},
    SequentialAlgorithm,
};
use anyhow::Context;
use log::{debug, info};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use std::time::{Duration, Instant};
use twinning_base::{
    algorithm::{Algorithm, Output},
    perf_counters, Matrix, MatrixView, PointSet, TwinningError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Twin off one fold at a time, with decreasing bin sizes.
    RepeatedTwinning,
    /// Split into two twins recursively. Requires `k` to be a power of two.
    RecursiveHalving,
    /// Sequence the dataset in bins of `k`, and deal each bin across the folds.
    SequenceStriping,
}

impl Strategy {
    /// Strategies are numbered from 1 to 3, in declaration order.
    pub fn from_number(n: usize) -> Result<Self, TwinningError> {
        match n {
            1 => Ok(Self::RepeatedTwinning),
            2 => Ok(Self::RecursiveHalving),
            3 => Ok(Self::SequenceStriping),
            n => Err(TwinningError::invalid("strategy", n, "should be 1, 2, or 3")),
        }
    }

    pub fn number(&self) -> usize {
        match self {
            Self::RepeatedTwinning => 1,
            Self::RecursiveHalving => 2,
            Self::SequenceStriping => 3,
        }
    }
}

/// Assigns each point of `data` to one of `k` folds, returning the fold of
/// every point. Starting points are drawn from `rng`.
pub fn multiplet<P: PointSet + ?Sized, R: Rng>(
    data: &P,
    k: usize,
    strategy: Strategy,
    leaf_size: usize,
    rng: &mut R,
) -> Result<Vec<usize>, TwinningError> {
    let n = data.len();
    if n == 0 {
        return Err(TwinningError::EmptyDataset);
    }
    if k < 2 || k > n / 2 {
        return Err(TwinningError::invalid(
            "k",
            k,
            format!("should be between 2 and half the number of points ({})", n / 2),
        ));
    }
    match strategy {
        Strategy::RepeatedTwinning => repeated_twinning(data, k, leaf_size, rng),
        Strategy::RecursiveHalving => {
            if !k.is_power_of_two() {
                return Err(TwinningError::invalid(
                    "k",
                    k,
                    "recursive halving requires a power of two",
                ));
            }
            let mut folds = vec![0; n];
            let mut next_fold = 0;
            let limit = (n + k - 1) / k;
            recursive_halving(
                data,
                (0..n).collect(),
                limit,
                leaf_size,
                rng,
                &mut next_fold,
                &mut folds,
            )?;
            Ok(folds)
        }
        Strategy::SequenceStriping => {
            let u1 = rng.gen_range(0..n);
            let sequence = get_sequence(data, k, u1, leaf_size)?;
            let mut folds = vec![0; n];
            for (j, id) in sequence.into_iter().enumerate() {
                folds[id] = j % k;
            }
            Ok(folds)
        }
    }
}

fn repeated_twinning<P: PointSet + ?Sized, R: Rng>(
    data: &P,
    k: usize,
    leaf_size: usize,
    rng: &mut R,
) -> Result<Vec<usize>, TwinningError> {
    let n = data.len();
    let mut folds = vec![0; n];
    // Rows of `data` not assigned to a fold yet
    let mut rows: Vec<usize> = (0..n).collect();
    let mut fold = 0;
    loop {
        let current = Matrix::from_selection(data, &rows);
        let u1 = rng.gen_range(0..rows.len());
        let selected = twin(&current, k - fold, u1, leaf_size)?;
        let mut taken = vec![false; rows.len()];
        for i in selected {
            folds[rows[i]] = fold;
            taken[i] = true;
        }
        rows = rows
            .into_iter()
            .zip(taken)
            .filter(|(_, taken)| !taken)
            .map(|(row, _)| row)
            .collect();
        debug!("fold {} done, {} rows left", fold, rows.len());

        if rows.len() as f64 <= n as f64 / k as f64 {
            for &row in &rows {
                folds[row] = fold + 1;
            }
            return Ok(folds);
        }
        fold += 1;
    }
}

fn recursive_halving<P: PointSet + ?Sized, R: Rng>(
    data: &P,
    rows: Vec<usize>,
    limit: usize,
    leaf_size: usize,
    rng: &mut R,
    next_fold: &mut usize,
    folds: &mut [usize],
) -> Result<(), TwinningError> {
    if rows.len() <= limit {
        for &row in &rows {
            folds[row] = *next_fold;
        }
        *next_fold += 1;
        return Ok(());
    }
    let current = Matrix::from_selection(data, &rows);
    let u1 = rng.gen_range(0..rows.len());
    let mut taken = vec![false; rows.len()];
    for i in twin(&current, 2, u1, leaf_size)? {
        taken[i] = true;
    }
    let (selected, rest): (Vec<(usize, bool)>, Vec<(usize, bool)>) =
        rows.into_iter().zip(taken).partition(|(_, taken)| *taken);
    let selected = selected.into_iter().map(|(row, _)| row).collect();
    let rest = rest.into_iter().map(|(row, _)| row).collect();
    recursive_halving(data, rest, limit, leaf_size, rng, next_fold, folds)?;
    recursive_halving(data, selected, limit, leaf_size, rng, next_fold, folds)
}

pub struct Multiplet {
    pub k: usize,
    pub strategy: Strategy,
    pub leaf_size: usize,
    pub seed: u64,
    profile: Option<Duration>,
    counters: Option<u64>,
}

impl Multiplet {
    pub fn new(k: usize, strategy: Strategy, leaf_size: usize, seed: u64) -> Self {
        Self {
            k,
            strategy,
            leaf_size,
            seed,
            profile: None,
            counters: None,
        }
    }
}

impl Algorithm for Multiplet {
    fn version(&self) -> u32 {
        1
    }

    fn name(&self) -> String {
        String::from("Multiplet")
    }

    fn parameters(&self) -> String {
        format!(
            r#"{{ "k": {}, "strategy": {}, "seed": {}, "leaf_size": {} }}"#,
            self.k,
            self.strategy.number(),
            self.seed,
            self.leaf_size
        )
    }

    fn time_profile(&self) -> Duration {
        self.profile.unwrap_or_default()
    }

    fn counters(&self) -> u64 {
        self.counters.unwrap_or_default()
    }
}

impl SequentialAlgorithm for Multiplet {
    fn sequential_run(&mut self, dataset: &MatrixView<'_>) -> anyhow::Result<Output> {
        let mut rng = XorShiftRng::seed_from_u64(self.seed);
        let start = Instant::now();
        let folds = multiplet(dataset, self.k, self.strategy, self.leaf_size, &mut rng)
            .context("multiplet parameters")?;
        let elapsed = start.elapsed();
        info!("{} folds found in {:?}", self.k, elapsed);
        self.profile.replace(elapsed);
        self.counters.replace(perf_counters::distance_count());
        Ok(Output::Folds(folds))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn random_matrix(rng: &mut XorShiftRng, n: usize, dims: usize) -> Matrix {
        let data: Vec<f64> = (0..n * dims).map(|_| rng.gen::<f64>()).collect();
        Matrix::new(data, n, dims).unwrap()
    }

    fn fold_sizes(folds: &[usize], k: usize) -> Vec<usize> {
        let mut sizes = vec![0; k];
        for &f in folds {
            assert!(f < k, "fold {} out of range", f);
            sizes[f] += 1;
        }
        sizes
    }

    #[test]
    fn test_strategies_cover_all_folds() {
        let mut rng = XorShiftRng::seed_from_u64(2021);
        for &n in &[20usize, 101, 256] {
            let data = random_matrix(&mut rng, n, 3);
            for &k in &[2usize, 4, 8] {
                for &strategy in &[
                    Strategy::RepeatedTwinning,
                    Strategy::RecursiveHalving,
                    Strategy::SequenceStriping,
                ] {
                    let folds = multiplet(&data, k, strategy, 8, &mut rng).unwrap();
                    assert_eq!(folds.len(), n);
                    let sizes = fold_sizes(&folds, k);
                    assert!(
                        sizes.iter().all(|&s| s > 0),
                        "empty fold with n={} k={} {:?}: {:?}",
                        n,
                        k,
                        strategy,
                        sizes
                    );
                    assert_eq!(sizes.iter().sum::<usize>(), n);
                }
            }
        }
    }

    #[test]
    fn test_sequence_striping_balanced() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let data = random_matrix(&mut rng, 103, 2);
        let folds = multiplet(&data, 5, Strategy::SequenceStriping, 8, &mut rng).unwrap();
        assert_eq!(fold_sizes(&folds, 5), vec![21, 21, 21, 20, 20]);
    }

    #[test]
    fn test_recursive_halving_balanced() {
        let mut rng = XorShiftRng::seed_from_u64(4);
        let data = random_matrix(&mut rng, 64, 2);
        let folds = multiplet(&data, 4, Strategy::RecursiveHalving, 8, &mut rng).unwrap();
        assert_eq!(fold_sizes(&folds, 4), vec![16, 16, 16, 16]);
    }

    #[test]
    fn test_invalid_k() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        let data = random_matrix(&mut rng, 10, 2);
        for &k in &[0usize, 1, 6] {
            assert!(matches!(
                multiplet(&data, k, Strategy::RepeatedTwinning, 8, &mut rng),
                Err(TwinningError::InvalidParameter { name: "k", .. })
            ));
        }
        assert!(matches!(
            multiplet(&data, 3, Strategy::RecursiveHalving, 8, &mut rng),
            Err(TwinningError::InvalidParameter { name: "k", .. })
        ));
        assert!(Strategy::from_number(4).is_err());
        assert_eq!(Strategy::from_number(2), Ok(Strategy::RecursiveHalving));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut rng = XorShiftRng::seed_from_u64(8);
        let data = random_matrix(&mut rng, 80, 3);
        let view = data.view();
        let mut a = Multiplet::new(4, Strategy::RepeatedTwinning, 8, 11);
        let mut b = Multiplet::new(4, Strategy::RepeatedTwinning, 8, 11);
        assert_eq!(
            a.sequential_run(&view).unwrap(),
            b.sequential_run(&view).unwrap()
        );
    }
}
