use twinning_base::{
    algorithm::{Algorithm, Output},
    MatrixView,
};

pub mod index;
pub mod kdtree;
pub mod multiplet;
pub mod partition;
pub mod twin;

pub trait SequentialAlgorithm: Algorithm {
    fn sequential_run(&mut self, dataset: &MatrixView<'_>) -> anyhow::Result<Output>;
}
