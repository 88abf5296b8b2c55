// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::config::DriverConfig;
use crate::unit_files::UnitFiles;
use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use log::{info, LevelFilter};
use objc_backend::{run_translation, write_artifacts, EmitOptions};
use source_to_objc::{report_diagnostics, FileNaming, OutputStyle, Tally, TranslationOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// General options
#[derive(Args, Default)]
#[clap(next_help_heading = "General Options")]
pub struct GeneralConfig {
    /// Directory the artifacts are written to (default: current directory)
    #[clap(long = "output-dir", short = 'd')]
    pub output_dir: Option<PathBuf>,

    /// Display detailed translation progress
    #[clap(long, short = 'v')]
    pub verbose: bool,

    /// Worker threads translating units
    #[clap(long = "max-concurrency", short = 'j')]
    pub max_concurrency: Option<usize>,

    /// Units handed to the front-end at once
    #[clap(long = "batch-size")]
    pub batch_size: Option<usize>,

    /// Number of errors tolerated before the run fails
    #[clap(long = "error-threshold")]
    pub error_threshold: Option<usize>,

    /// Stop translating once the error threshold is crossed
    #[clap(long = "abort-on-threshold")]
    pub abort_on_threshold: bool,
}

/// Output layout options
#[derive(Args, Default)]
#[clap(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Write all units into one artifact pair with this name
    #[clap(long = "combined", value_name = "NAME")]
    pub combined: Option<String>,

    /// How per-unit artifacts are named
    #[clap(long = "file-naming", value_enum)]
    pub file_naming: Option<NamingArg>,

    /// Leave out reflection metadata
    #[clap(long = "no-metadata")]
    pub no_metadata: bool,

    /// Package prefix, as `package=PREFIX` (`package.*` matches subpackages)
    #[clap(long = "prefix", value_name = "PACKAGE=PREFIX")]
    pub prefixes: Vec<String>,

    /// Header declaring the runtime support types
    #[clap(long = "runtime-header")]
    pub runtime_header: Option<String>,
}

#[derive(ValueEnum, Clone, Copy)]
pub enum NamingArg {
    Identifier,
    PackageDirectories,
    SourceRelative,
}

impl From<NamingArg> for FileNaming {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::Identifier => FileNaming::Identifier,
            NamingArg::PackageDirectories => FileNaming::PackageDirectories,
            NamingArg::SourceRelative => FileNaming::SourceRelative,
        }
    }
}

/// Options of a run after the command line is applied over the config file
pub struct Settings {
    pub output_dir: PathBuf,
    pub translation: TranslationOptions,
    pub emit: EmitOptions,
}

pub fn settings(config: DriverConfig, general: &GeneralConfig, output: &OutputConfig) -> anyhow::Result<Settings> {
    let mut translation = config.translation;
    let mut emit = config.emit;
    if general.verbose {
        translation.verbosity_level = LevelFilter::Debug;
    }
    if let Some(n) = general.max_concurrency {
        translation.max_concurrency = n;
    }
    if let Some(n) = general.batch_size {
        translation.batch_size = n;
    }
    if let Some(n) = general.error_threshold {
        translation.error_threshold = n;
    }
    translation.abort_on_threshold |= general.abort_on_threshold;
    if let Some(name) = &output.combined {
        translation.output_style = OutputStyle::Combined;
        translation.combined_name = name.clone();
    }
    if let Some(naming) = output.file_naming {
        translation.file_naming = naming.into();
    }
    if output.no_metadata {
        translation.emit_metadata = false;
    }
    for prefix in &output.prefixes {
        let Some((package, short)) = prefix.split_once('=') else {
            bail!("invalid prefix `{}`: expected PACKAGE=PREFIX", prefix);
        };
        translation
            .prefixes
            .packages
            .insert(package.trim().to_string(), short.trim().to_string());
    }
    if let Some(header) = &output.runtime_header {
        emit.runtime_header = header.clone();
    }
    let output_dir = general
        .output_dir
        .clone()
        .or(config.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(Settings {
        output_dir,
        translation,
        emit,
    })
}

/// What a finished run reports back to the command line
pub struct Summary {
    pub units: usize,
    pub written: usize,
    pub tally: Tally,
    pub failed: bool,
}

pub fn execute(inputs: &[PathBuf], settings: &Settings) -> anyhow::Result<Summary> {
    let mut front_end = UnitFiles::discover(inputs)?;
    if front_end.is_empty() {
        bail!("no compilation units given");
    }
    info!("translating {} unit files", front_end.len());
    let output = run_translation(&mut front_end, &mut [], &settings.translation, &settings.emit);

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    report_diagnostics(&mut stderr, &output.diagnostics, |unit| {
        fs::read_to_string(Path::new(unit)).ok()
    })
    .context("cannot report diagnostics")?;

    let written = write_artifacts(&output.artifacts, &settings.output_dir)?;
    Ok(Summary {
        units: front_end.len(),
        written: written.len(),
        tally: output.tally,
        failed: output.failed,
    })
}
