// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Front-end reading resolved units serialized as JSON, one unit per file

use anyhow::Context;
use log::debug;
use source_model::CompilationUnit;
use source_to_objc::{FrontEnd, FrontEndFailure};
use std::fs;
use std::path::{Path, PathBuf};

pub struct UnitFiles {
    paths: Vec<PathBuf>,
}

impl UnitFiles {
    /// Files are taken as given; directories contribute every `*.json` below
    /// them in sorted order
    pub fn discover(inputs: &[PathBuf]) -> anyhow::Result<Self> {
        let mut paths = vec![];
        for input in inputs {
            if input.is_dir() {
                let pattern = format!("{}/**/*.json", input.display());
                let mut found = glob::glob(&pattern)
                    .with_context(|| format!("cannot search {}", input.display()))?
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("cannot search {}", input.display()))?;
                found.sort();
                debug!("{} unit files below {}", found.len(), input.display());
                paths.extend(found);
            } else {
                paths.push(input.clone());
            }
        }
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn load(path: &Path) -> anyhow::Result<CompilationUnit> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a compilation unit", path.display()))
}

impl FrontEnd for UnitFiles {
    fn sources(&self) -> Vec<String> {
        self.paths.iter().map(|p| p.display().to_string()).collect()
    }

    fn resolve(&mut self, batch: &[String]) -> Vec<Result<CompilationUnit, FrontEndFailure>> {
        batch
            .iter()
            .map(|source| {
                load(Path::new(source)).map_err(|e| FrontEndFailure {
                    source: source.clone(),
                    message: format!("{:#}", e),
                })
            })
            .collect()
    }
}
