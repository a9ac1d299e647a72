// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Binary to evaluate a policy on the merge scenario from a parameters file.
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Runs test episodes of the highway merge scenario and reports the collision rate.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON file with the parameters
    #[arg(required = true)]
    parameters: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    merge_env::run_evaluation(&args.parameters)
}
