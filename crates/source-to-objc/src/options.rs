// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How translated units are grouped into artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputStyle {
    /// One interface/implementation pair per compilation unit
    PerUnit,
    /// One pair for every unit of the run
    Combined,
}

/// How per-unit artifacts are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileNaming {
    /// `ComGoogleTestExample.h`
    Identifier,
    /// `com/google/test/Example.h`
    PackageDirectories,
    /// Next to the source path the unit came from
    SourceRelative,
}

/// Package prefix configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefixOptions {
    /// Package (or `package.*` wildcard) to short code, e.g. `com.google.test = "CBT"`
    pub packages: BTreeMap<String, String>,
    /// Prepended to every generated type identifier
    pub global: Option<String>,
}

/// Options consumed by the translation core. Usually read from the `[translation]`
/// table of the driver's TOML configuration; command line flags override them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationOptions {
    /// Maximum units handed to the front-end per invocation. Scheduling only.
    pub batch_size: usize,
    pub output_style: OutputStyle,
    pub file_naming: FileNaming,
    /// Artifact stem in combined mode
    pub combined_name: String,
    /// Worker threads used for translation; 1 translates sequentially
    pub max_concurrency: usize,
    /// The run fails when more errors than this are reported
    pub error_threshold: usize,
    /// Stop starting new units once the threshold is crossed
    pub abort_on_threshold: bool,
    /// Emit reflection metadata tables
    pub emit_metadata: bool,
    /// First line of every artifact
    pub banner: String,
    /// Passed through to the front-end untouched
    pub classpath: Vec<String>,
    /// Verbosity level for logging.
    pub verbosity_level: LevelFilter,

    /// BEGIN OF STRUCTURED OPTIONS. DO NOT ADD VALUE FIELDS AFTER THIS
    pub prefixes: PrefixOptions,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            output_style: OutputStyle::PerUnit,
            file_naming: FileNaming::Identifier,
            combined_name: "combined".to_string(),
            max_concurrency: 1,
            error_threshold: 0,
            abort_on_threshold: false,
            emit_metadata: true,
            banner: "Generated by the ObjC translator.".to_string(),
            classpath: vec![],
            verbosity_level: LevelFilter::Info,
            prefixes: PrefixOptions::default(),
        }
    }
}

impl TranslationOptions {
    pub fn is_combined(&self) -> bool {
        self.output_style == OutputStyle::Combined
    }
}
