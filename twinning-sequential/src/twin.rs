use crate::{partition::Partitioner, SequentialAlgorithm};
use anyhow::Context;
use log::info;
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use std::time::{Duration, Instant};
use twinning_base::{
    algorithm::{Algorithm, Output},
    perf_counters, MatrixView, PointSet,
};

/// The fixed starting point if given, otherwise one drawn at random.
pub fn starting_point(u1: Option<usize>, seed: u64, n: usize) -> usize {
    match u1 {
        Some(u1) => u1,
        None if n == 0 => 0,
        None => XorShiftRng::seed_from_u64(seed).gen_range(0..n),
    }
}

/// Selection of one representative out of every `r` points.
pub struct Twin {
    pub r: usize,
    pub u1: Option<usize>,
    pub leaf_size: usize,
    pub seed: u64,
    profile: Option<Duration>,
    counters: Option<u64>,
}

impl Twin {
    pub fn new(r: usize, u1: Option<usize>, leaf_size: usize, seed: u64) -> Self {
        Self {
            r,
            u1,
            leaf_size,
            seed,
            profile: None,
            counters: None,
        }
    }
}

impl Algorithm for Twin {
    fn version(&self) -> u32 {
        1
    }

    fn name(&self) -> String {
        String::from("Twin")
    }

    fn parameters(&self) -> String {
        match self.u1 {
            Some(u1) => format!(
                r#"{{ "r": {}, "u1": {}, "leaf_size": {} }}"#,
                self.r, u1, self.leaf_size
            ),
            None => format!(
                r#"{{ "r": {}, "seed": {}, "leaf_size": {} }}"#,
                self.r, self.seed, self.leaf_size
            ),
        }
    }

    fn time_profile(&self) -> Duration {
        self.profile.unwrap_or_default()
    }

    fn counters(&self) -> u64 {
        self.counters.unwrap_or_default()
    }
}

impl SequentialAlgorithm for Twin {
    fn sequential_run(&mut self, dataset: &MatrixView<'_>) -> anyhow::Result<Output> {
        let u1 = starting_point(self.u1, self.seed, dataset.len());
        let start = Instant::now();
        let partitioner =
            Partitioner::new(dataset, self.r, u1, self.leaf_size).context("twin parameters")?;
        let selected = partitioner.twin();
        let elapsed = start.elapsed();
        info!("twin of {} points found in {:?}", selected.len(), elapsed);
        self.profile.replace(elapsed);
        self.counters.replace(perf_counters::distance_count());
        Ok(Output::Subset(selected))
    }
}

/// Full traversal of the dataset in bins of `r` points.
pub struct Sequence {
    pub r: usize,
    pub u1: Option<usize>,
    pub leaf_size: usize,
    pub seed: u64,
    profile: Option<Duration>,
    counters: Option<u64>,
}

impl Sequence {
    pub fn new(r: usize, u1: Option<usize>, leaf_size: usize, seed: u64) -> Self {
        Self {
            r,
            u1,
            leaf_size,
            seed,
            profile: None,
            counters: None,
        }
    }
}

impl Algorithm for Sequence {
    fn version(&self) -> u32 {
        1
    }

    fn name(&self) -> String {
        String::from("Sequence")
    }

    fn parameters(&self) -> String {
        match self.u1 {
            Some(u1) => format!(
                r#"{{ "r": {}, "u1": {}, "leaf_size": {} }}"#,
                self.r, u1, self.leaf_size
            ),
            None => format!(
                r#"{{ "r": {}, "seed": {}, "leaf_size": {} }}"#,
                self.r, self.seed, self.leaf_size
            ),
        }
    }

    fn time_profile(&self) -> Duration {
        self.profile.unwrap_or_default()
    }

    fn counters(&self) -> u64 {
        self.counters.unwrap_or_default()
    }
}

impl SequentialAlgorithm for Sequence {
    fn sequential_run(&mut self, dataset: &MatrixView<'_>) -> anyhow::Result<Output> {
        let u1 = starting_point(self.u1, self.seed, dataset.len());
        let start = Instant::now();
        let partitioner = Partitioner::new(dataset, self.r, u1, self.leaf_size)
            .context("sequence parameters")?;
        let sequence = partitioner.sequence();
        let elapsed = start.elapsed();
        info!("sequence of {} points found in {:?}", sequence.len(), elapsed);
        self.profile.replace(elapsed);
        self.counters.replace(perf_counters::distance_count());
        Ok(Output::Sequence(sequence))
    }
}
