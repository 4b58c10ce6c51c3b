use crate::configuration::{Configuration, Sha};
use anyhow::{Context, Result};
use chrono::prelude::*;
use flate2::{write::GzEncoder, Compression};
use log::info;
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

struct AlgorithmInfo {
    name: String,
    version: u32,
    parameters: String,
}

struct Outcome {
    total_time: Duration,
    output_len: usize,
}

struct Evaluation {
    energy: f64,
    time: Duration,
}

pub struct Reporter {
    date: DateTime<Utc>,
    config: Configuration,
    shape: Option<(usize, usize)>,
    algorithm: Option<AlgorithmInfo>,
    outcome: Option<Outcome>,
    distance_cnt: Option<u64>,
    evaluation: Option<Evaluation>,
}

impl Reporter {
    pub fn from_config(config: Configuration) -> Self {
        Self {
            date: Utc::now(),
            config,
            shape: None,
            algorithm: None,
            outcome: None,
            distance_cnt: None,
            evaluation: None,
        }
    }

    pub fn set_shape(&mut self, rows: usize, cols: usize) {
        self.shape.replace((rows, cols));
    }

    pub fn set_algorithm(&mut self, name: String, version: u32, parameters: String) {
        self.algorithm.replace(AlgorithmInfo {
            name,
            version,
            parameters,
        });
    }

    pub fn set_outcome(&mut self, total_time: Duration, output_len: usize) {
        self.outcome.replace(Outcome {
            total_time,
            output_len,
        });
    }

    pub fn set_counters(&mut self, distance: u64) {
        self.distance_cnt.replace(distance);
    }

    pub fn set_evaluation(&mut self, energy: f64, time: Duration) {
        self.evaluation.replace(Evaluation { energy, time });
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        let algorithm = self
            .algorithm
            .as_ref()
            .context("missing algorithm information")?;
        let outcome = self.outcome.as_ref().context("missing outcome")?;
        let parameters: serde_json::Value = serde_json::from_str(&algorithm.parameters)
            .context("algorithm parameters are not valid json")?;
        Ok(json!({
            "code_version": env!("VERGEN_GIT_SHA"),
            "date": self.date.to_rfc3339(),
            "params_sha": self.config.sha()?,
            "dataset": self.config.dataset,
            "rows": self.shape.map(|s| s.0),
            "cols": self.shape.map(|s| s.1),
            "standardize": self.config.standardize,
            "algorithm": algorithm.name,
            "algorithm_version": algorithm.version,
            "algorithm_params": parameters,
            "total_time_ms": outcome.total_time.as_millis() as u64,
            "distance_cnt": self.distance_cnt,
            "output_len": outcome.output_len,
            "energy": self.evaluation.as_ref().map(|e| e.energy),
            "evaluation_time_ms": self.evaluation.as_ref().map(|e| e.time.as_millis() as u64),
        }))
    }

    /// Prints the report as a single line of JSON on standard output.
    pub fn report(&self) -> Result<()> {
        let report = self.to_json()?;
        println!("{}", serde_json::to_string(&report)?);
        Ok(())
    }
}

/// Writes one value per line, compressing when the file name ends in `.gz`.
pub fn write_output(path: &Path, values: &[usize]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut out: Box<dyn Write> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(GzEncoder::new(file, Compression::best()))
    } else {
        Box::new(BufWriter::new(file))
    };
    let mut pl = progress_logger::ProgressLogger::builder().start();
    for v in values {
        writeln!(out, "{}", v)?;
        pl.update_light(1u64);
    }
    pl.stop();
    out.flush()?;
    info!("written {} values to {:?}", values.len(), path);
    Ok(())
}
