// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! A whole run: front-end, translation, emission, and writing to disk

use crate::artifacts::ArtifactPair;
use crate::emitter::emit;
use crate::options::EmitOptions;
use anyhow::Context;
use log::{debug, info};
use source_to_objc::{collect_units, translate, AnnotationProcessor, Diagnostic, FrontEnd, Tally, TranslationOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// What a run produced
#[derive(Debug)]
pub struct RunOutput {
    /// Pairs of the units that translated, in input order
    pub artifacts: Vec<ArtifactPair>,
    pub diagnostics: Vec<Diagnostic>,
    pub tally: Tally,
    /// More errors than the threshold were reported
    pub failed: bool,
}

/// Resolve, translate and render every source of `front_end`
pub fn run_translation(
    front_end: &mut dyn FrontEnd,
    processors: &mut [Box<dyn AnnotationProcessor>],
    options: &TranslationOptions,
    emit_options: &EmitOptions,
) -> RunOutput {
    let collected = collect_units(front_end, processors, options.batch_size);
    debug!(
        "front-end produced {} units and {} diagnostics",
        collected.units.len(),
        collected.diagnostics.len()
    );
    let translation = translate(collected.units, collected.diagnostics, options);
    let artifacts = emit(&translation, emit_options);
    let tally = translation.tally();
    RunOutput {
        artifacts,
        failed: translation.failed(),
        diagnostics: translation.diagnostics,
        tally,
    }
}

/// Write artifacts below `output_dir`, creating directories as needed.
/// Returns the written paths in artifact order.
pub fn write_artifacts(artifacts: &[ArtifactPair], output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;
    let mut written = vec![];
    for artifact in artifacts.iter().flat_map(ArtifactPair::iter) {
        let path = output_dir.join(&artifact.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("cannot create directory {}", parent.display()))?;
        }
        fs::write(&path, &artifact.contents).with_context(|| format!("cannot write {}", path.display()))?;
        written.push(path);
    }
    info!("wrote {} files to {}", written.len(), output_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::Artifact;

    fn pair(stem: &str) -> ArtifactPair {
        ArtifactPair {
            interface: Artifact {
                path: PathBuf::from(format!("{}.h", stem)),
                contents: format!("// {}.h\n", stem),
            },
            implementation: Artifact {
                path: PathBuf::from(format!("{}.m", stem)),
                contents: format!("// {}.m\n", stem),
            },
        }
    }

    #[test]
    fn writes_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_artifacts(&[pair("a/b/C"), pair("D")], dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(fs::read_to_string(dir.path().join("a/b/C.m")).unwrap(), "// a/b/C.m\n");
        assert_eq!(written[3], dir.path().join("D.m"));
    }
}
