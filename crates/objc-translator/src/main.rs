// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::*;
use colored::Colorize;
use config::DriverConfig;
use log::debug;
use simplelog::{Config, TermLogger, TerminalMode};
use translate::{execute, settings, GeneralConfig, OutputConfig, Summary};

mod config;
mod translate;
mod unit_files;

#[derive(Parser)]
#[clap(
    name = env!("CARGO_BIN_NAME"),
    about = "Translates resolved compilation units, serialized as JSON, into Objective-C interface and implementation files",
    rename_all = "kebab-case",
    author,
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Args {
    /// Unit files, or directories searched for `*.json` unit files
    #[clap(required = true)]
    pub inputs: Vec<PathBuf>,

    /// TOML file with `[translation]` and `[emit]` tables
    #[clap(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// General options
    #[clap(flatten)]
    pub general_config: GeneralConfig,

    /// Output options
    #[clap(flatten)]
    pub output_config: OutputConfig,
}

fn run(args: Args) -> anyhow::Result<Summary> {
    let config = match &args.config {
        Some(path) => DriverConfig::load(path)?,
        None => DriverConfig::default(),
    };
    let settings = settings(config, &args.general_config, &args.output_config)?;
    // fails only if a logger is already installed
    let _ = TermLogger::init(settings.translation.verbosity_level, Config::default(), TerminalMode::Stderr);
    debug!("objc-translator version: {}", env!("CARGO_PKG_VERSION"));
    execute(&args.inputs, &settings)
}

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    match run(args) {
        Ok(summary) => {
            let line = format!(
                "translated {} units, wrote {} files ({} errors, {} warnings)",
                summary.units, summary.written, summary.tally.errors, summary.tally.warnings
            );
            if summary.failed {
                println!("{}", line.bold().red());
                std::process::exit(1);
            }
            println!("{}", line.green());
        }
        Err(err) => {
            let err = format!("{:?}", err);
            println!("{}", err.bold().red());
            std::process::exit(1);
        }
    }
}
