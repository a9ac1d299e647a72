// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Imports / exports through JSON files.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::parameters::Parameters;

/// Deserializes the parameters of an evaluation run from a JSON file.
pub fn get_parameters_from_json(path: &Path) -> Result<Parameters> {
    info!("Reading parameters from `{path:?}`");
    let parameters: Parameters = read_json(path)?;
    parameters
        .scenario
        .validate()
        .with_context(|| format!("Invalid scenario parameters in `{path:?}`"))?;
    Ok(parameters)
}

/// Reads some deserializable data from a JSON file.
pub fn read_json<D: DeserializeOwned>(filename: &Path) -> Result<D> {
    let reader = BufReader::new(
        File::open(filename).with_context(|| format!("Unable to open file `{filename:?}`"))?,
    );
    let data = serde_json::from_reader(reader)
        .with_context(|| format!("Unable to parse file `{filename:?}`"))?;
    Ok(data)
}

/// Writes some serializable data as a pretty-printed JSON file.
///
/// The file is stored in the given directory, with filename "{name}.json".
pub fn write_json<D: Serialize>(data: &D, output_dir: &Path, name: &str) -> Result<()> {
    let filename = output_dir.join(format!("{name}.json"));
    let mut writer = File::create(&filename)
        .with_context(|| format!("Unable to create file `{filename:?}`"))?;
    let buffer = serde_json::to_vec_pretty(data)?;
    writer.write_all(&buffer)?;
    Ok(())
}
