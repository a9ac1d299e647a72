// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Everything related to logging.
//!
//! Episode summaries go to the terminal. The log file in the output directory also receives the
//! per-step and per-vehicle debug messages of the scenario.
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Name of the log file written in the output directory.
pub const LOG_FILENAME: &str = "log.txt";

/// Level of the messages written to the terminal.
const TERMINAL_LEVEL: LevelFilter = LevelFilter::Info;
/// Level of the messages written to the log file.
const FILE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Returns the path of the log file for a given output directory.
pub fn log_path(output: &Path) -> PathBuf {
    output.join(LOG_FILENAME)
}

/// Configuration of the log file: messages of this crate only, with their target.
fn file_config() -> Config {
    ConfigBuilder::new()
        .add_filter_allow_str("merge_env")
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Debug)
        .build()
}

/// Initializes logging to the terminal and to [LOG_FILENAME] in the output directory.
pub fn initialize_logging(output: &Path) -> Result<()> {
    let log_filename = log_path(output);
    let log_file = File::create(&log_filename)
        .with_context(|| format!("Failed to create log file `{log_filename:?}`"))?;
    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(
            TERMINAL_LEVEL,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(FILE_LEVEL, file_config(), log_file),
    ];
    CombinedLogger::init(loggers).context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_test() {
        let path = log_path(Path::new("output"));
        assert_eq!(path, Path::new("output").join("log.txt"));
    }
}
