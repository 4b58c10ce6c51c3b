use std::time::Duration;

/// What a run produces, indexed by row of the input dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Row ids of the selected representatives, in selection order.
    Subset(Vec<usize>),
    /// All the row ids, in traversal order.
    Sequence(Vec<usize>),
    /// For each row, the label of the fold it is assigned to.
    Folds(Vec<usize>),
}

impl Output {
    pub fn values(&self) -> &[usize] {
        match self {
            Self::Subset(v) | Self::Sequence(v) | Self::Folds(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

pub trait Algorithm {
    fn version(&self) -> u32;
    fn name(&self) -> String;
    fn parameters(&self) -> String;
    /// How long the last run took, excluding data preparation.
    fn time_profile(&self) -> Duration;
    /// Number of distance evaluations of the last run.
    fn counters(&self) -> u64;
}
