// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use objc_backend::EmitOptions;
use serde::{Deserialize, Serialize};
use source_to_objc::TranslationOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of the driver's TOML configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Where artifacts are written, relative to the working directory
    pub output_dir: Option<PathBuf>,
    pub translation: TranslationOptions,
    pub emit: EmitOptions,
}

impl DriverConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
}
