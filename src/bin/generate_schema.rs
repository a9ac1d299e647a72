// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use merge_env::evaluation::EvaluationResults;
use merge_env::parameters::Parameters;
use schemars::gen::SchemaSettings;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Generate the JSON Schemas for the input and output files of the merge evaluation
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The directory where the JSON Schemas should be stored
    path: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logging")?;

    info!("Generating JSON Schemas");
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
    });
    let gen = settings.into_generator();

    // Parameters.
    let schema = gen.clone().into_root_schema_for::<Parameters>();
    let filename = args.path.join("schema-parameters.json");
    let mut file = File::create(filename)?;
    write!(file, "{}", serde_json::to_string_pretty(&schema)?)?;

    // Evaluation results.
    let schema = gen.into_root_schema_for::<EvaluationResults>();
    let filename = args.path.join("schema-evaluation-results.json");
    let mut file = File::create(filename)?;
    write!(file, "{}", serde_json::to_string_pretty(&schema)?)?;

    info!("Done");

    Ok(())
}
