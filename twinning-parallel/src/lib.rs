use twinning_base::{algorithm::Algorithm, MatrixView};

pub mod energy;

pub trait ParallelAlgorithm: Algorithm {
    /// Scores `points` against `dataset`.
    fn parallel_run(&mut self, dataset: &MatrixView<'_>, points: &MatrixView<'_>)
        -> anyhow::Result<f64>;
}
