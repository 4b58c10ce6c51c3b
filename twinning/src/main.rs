mod configuration;
mod reporter;

use anyhow::{Context, Result};
use configuration::*;
use log::{info, warn};
use reporter::{write_output, Reporter};
use std::time::Instant;
use twinning_base::{
    algorithm::{Algorithm, Output},
    dataset::Dataset,
    standardize::standardize,
    Matrix,
};

fn run_sequential(config: &Configuration, data: &Matrix, reporter: &mut Reporter) -> Result<()> {
    let standardized;
    let view = if config.standardize {
        let timer = Instant::now();
        standardized = standardize(data)?;
        info!(
            "standardized {} columns into {} in {:?}",
            data.num_cols(),
            standardized.num_cols(),
            timer.elapsed()
        );
        standardized.view()
    } else {
        data.view()
    };

    let mut algorithm = config.configure_sequential_algorithm()?;
    let timer = Instant::now();
    let output = algorithm.sequential_run(&view)?;
    let elapsed = timer.elapsed();
    info!(
        "{} produced {} values in {:?}",
        algorithm.name(),
        output.len(),
        elapsed
    );

    reporter.set_algorithm(algorithm.name(), algorithm.version(), algorithm.parameters());
    reporter.set_outcome(elapsed, output.len());
    reporter.set_counters(algorithm.counters());

    if let Some(path) = &config.output {
        write_output(path, output.values())?;
    }

    if config.evaluate {
        match &output {
            Output::Subset(selected) => {
                let points = Matrix::from_selection(data, selected);
                let mut energy = config.configure_parallel_algorithm()?;
                let score = energy.parallel_run(&data.view(), &points.view())?;
                reporter.set_evaluation(score, energy.time_profile());
            }
            _ => warn!("only twins can be evaluated, skipping the evaluation"),
        }
    }
    Ok(())
}

fn run_energy(config: &Configuration, data: &Matrix, reporter: &mut Reporter) -> Result<()> {
    let points_path = match &config.algorithm {
        AlgorithmConfig::Energy { points } => points,
        _ => anyhow::bail!("not an energy configuration"),
    };
    let points = Dataset::new(points_path).to_matrix()?;

    let mut energy = config.configure_parallel_algorithm()?;
    let score = energy.parallel_run(&data.view(), &points.view())?;

    reporter.set_algorithm(energy.name(), energy.version(), energy.parameters());
    reporter.set_outcome(energy.time_profile(), points.num_rows());
    reporter.set_counters(energy.counters());
    reporter.set_evaluation(score, energy.time_profile());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let config_spec = std::env::args()
        .nth(1)
        .context("provide the specification of the configuration, either a file path or a json object encoded as base64")?;
    let config = Configuration::load(config_spec)?;
    let mut reporter = Reporter::from_config(config.clone());

    let start = Instant::now();
    let data = Dataset::new(&config.dataset).to_matrix()?;
    info!(
        "loaded {} x {} dataset in {:?}",
        data.num_rows(),
        data.num_cols(),
        start.elapsed()
    );
    reporter.set_shape(data.num_rows(), data.num_cols());

    if config.algorithm.is_sequential() {
        run_sequential(&config, &data, &mut reporter)?;
    } else {
        run_energy(&config, &data, &mut reporter)?;
    }

    reporter.report()?;
    Ok(())
}
