// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Library for a highway on-ramp merge scenario: road layout, vehicle population, reward and
//! termination, exposed through a `reset` / `step` / `configure` interface.
#![doc(html_no_source)]

pub mod evaluation;
pub mod geometry;
pub mod io;
pub mod logging;
pub mod network;
pub mod parameters;
pub mod road;
pub mod scenario;
pub mod time_limit;
pub mod units;
pub mod vehicle;

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

// Re-exports.
pub use scenario::{MergeEnv, StepInfo, StepResult};
pub use time_limit::TimeLimit;
pub use vehicle::MetaAction;

// Dependencies only used in the bins.
use clap as _;

/// Name of the file storing the results of an evaluation run.
pub const RESULTS_FILENAME: &str = "evaluation_results";

/// Deserializes the parameters of an evaluation run, runs the test episodes and stores the
/// results to the output directory.
///
/// This function takes as argument the path to the `parameters.json` file.
pub fn run_evaluation(path: &Path) -> Result<()> {
    // Read parameters.
    let parameters = io::json::get_parameters_from_json(path)?;

    // Create output directory if it does not exists yet.
    std::fs::create_dir_all(&parameters.output_directory).with_context(|| {
        format!(
            "Failed to create output directory `{:?}`",
            parameters.output_directory
        )
    })?;

    logging::initialize_logging(&parameters.output_directory)?;

    let filename = parameters
        .output_directory
        .join(format!("{RESULTS_FILENAME}.json"));
    if filename.is_file() {
        warn!("Removing already existing file `{filename:?}`");
        std::fs::remove_file(&filename)
            .with_context(|| format!("Failed to remove file: `{filename:?}`"))?;
    }

    let seeds = parameters.evaluation.episode_seeds();
    info!(
        "Evaluating policy {:?} on {} episodes",
        parameters.evaluation.policy,
        seeds.len()
    );
    let mut policy = parameters.evaluation.policy.build();
    let results = evaluation::run_episodes(&parameters.scenario, policy.as_mut(), &seeds)?;
    io::json::write_json(&results, &parameters.output_directory, RESULTS_FILENAME)
}
