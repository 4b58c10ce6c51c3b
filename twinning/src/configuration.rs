use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::path::PathBuf;
use twinning_parallel::{energy::Energy, ParallelAlgorithm};
use twinning_sequential::{
    multiplet::{Multiplet, Strategy},
    twin::{Sequence, Twin},
    SequentialAlgorithm,
};

pub trait Sha {
    fn update_sha<D: Digest>(&self, sha: &mut D);

    fn sha(&self) -> Result<String> {
        let mut sha = sha2::Sha256::new();
        self.update_sha(&mut sha);
        Ok(format!("{:x}", sha.result()))
    }
}

impl<T: Sha> Sha for Option<T> {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        match self {
            Some(x) => {
                sha.input("some");
                x.update_sha(sha);
            }
            None => sha.input("none"),
        }
    }
}

impl Sha for usize {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        sha.input(self.to_le_bytes());
    }
}

impl Sha for u64 {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        sha.input(self.to_le_bytes());
    }
}

impl Sha for bool {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        sha.input([*self as u8]);
    }
}

impl Sha for PathBuf {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        sha.input(self.to_string_lossy().as_bytes());
    }
}

fn default_leaf_size() -> usize {
    8
}

fn default_strategy() -> usize {
    1
}

fn default_standardize() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AlgorithmConfig {
    Twin {
        r: usize,
        #[serde(default)]
        u1: Option<usize>,
        #[serde(default = "default_leaf_size")]
        leaf_size: usize,
    },
    Sequence {
        r: usize,
        #[serde(default)]
        u1: Option<usize>,
        #[serde(default = "default_leaf_size")]
        leaf_size: usize,
    },
    Multiplet {
        k: usize,
        #[serde(default = "default_strategy")]
        strategy: usize,
        #[serde(default = "default_leaf_size")]
        leaf_size: usize,
    },
    /// Scores the points stored in another file against the dataset.
    Energy { points: PathBuf },
}

impl AlgorithmConfig {
    pub fn is_sequential(&self) -> bool {
        !matches!(self, Self::Energy { .. })
    }
}

impl Sha for AlgorithmConfig {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        match self {
            AlgorithmConfig::Twin { r, u1, leaf_size } => {
                sha.input("twin");
                r.update_sha(sha);
                u1.update_sha(sha);
                leaf_size.update_sha(sha);
            }
            AlgorithmConfig::Sequence { r, u1, leaf_size } => {
                sha.input("sequence");
                r.update_sha(sha);
                u1.update_sha(sha);
                leaf_size.update_sha(sha);
            }
            AlgorithmConfig::Multiplet {
                k,
                strategy,
                leaf_size,
            } => {
                sha.input("multiplet");
                k.update_sha(sha);
                strategy.update_sha(sha);
                leaf_size.update_sha(sha);
            }
            AlgorithmConfig::Energy { points } => {
                sha.input("energy");
                points.update_sha(sha);
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParallelConfiguration {
    pub threads: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Configuration {
    pub dataset: PathBuf,
    pub algorithm: AlgorithmConfig,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_standardize")]
    pub standardize: bool,
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Compute the energy distance of the selected twin.
    #[serde(default)]
    pub evaluate: bool,
    #[serde(default)]
    pub parallel: Option<ParallelConfiguration>,
}

impl Sha for Configuration {
    fn update_sha<D: Digest>(&self, sha: &mut D) {
        // The output path and the number of threads do not change results
        self.dataset.update_sha(sha);
        self.algorithm.update_sha(sha);
        self.seed.update_sha(sha);
        self.standardize.update_sha(sha);
        self.evaluate.update_sha(sha);
    }
}

impl Configuration {
    /// `spec` is either the path to a JSON file, or the JSON itself encoded
    /// as base64.
    pub fn load(spec: String) -> Result<Self> {
        let path = PathBuf::from(&spec);
        let config: Configuration = if path.is_file() {
            serde_json::from_reader(std::fs::File::open(&path)?)
                .with_context(|| format!("parsing configuration file {:?}", path))?
        } else {
            let decoded_str = String::from_utf8(
                base64::decode(&spec).context("configuration is neither a file nor base64")?,
            )?;
            serde_json::from_str(&decoded_str).context("parsing configuration")?
        };

        if let AlgorithmConfig::Multiplet { strategy, .. } = config.algorithm {
            Strategy::from_number(strategy)?;
        }
        if let Some(parallel) = &config.parallel {
            if parallel.threads == 0 {
                anyhow::bail!("the number of threads should be positive");
            }
        }

        Ok(config)
    }

    pub fn threads(&self) -> Option<usize> {
        self.parallel.as_ref().map(|p| p.threads)
    }

    pub fn configure_sequential_algorithm(&self) -> Result<Box<dyn SequentialAlgorithm>> {
        let algorithm: Box<dyn SequentialAlgorithm> = match self.algorithm {
            AlgorithmConfig::Twin { r, u1, leaf_size } => {
                Box::new(Twin::new(r, u1, leaf_size, self.seed))
            }
            AlgorithmConfig::Sequence { r, u1, leaf_size } => {
                Box::new(Sequence::new(r, u1, leaf_size, self.seed))
            }
            AlgorithmConfig::Multiplet {
                k,
                strategy,
                leaf_size,
            } => Box::new(Multiplet::new(
                k,
                Strategy::from_number(strategy)?,
                leaf_size,
                self.seed,
            )),
            AlgorithmConfig::Energy { .. } => {
                anyhow::bail!("energy evaluation is not a sequential algorithm")
            }
        };
        Ok(algorithm)
    }

    pub fn configure_parallel_algorithm(&self) -> Result<Box<dyn ParallelAlgorithm>> {
        Ok(Box::new(Energy::new(self.standardize, self.threads())?))
    }
}
