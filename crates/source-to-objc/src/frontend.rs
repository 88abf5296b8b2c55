// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Collaborators supplying compilation units
//!
//! Parsing, type checking and annotation processing are not done here. A
//! [`FrontEnd`] resolves sources in batches; [`AnnotationProcessor`]s may
//! inject further units, which are tagged with a generated provenance.

use crate::diagnostics::{Diagnostic, TranslationError};
use log::{debug, info};
use source_model::{CompilationUnit, Provenance};

/// A source the front-end could not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontEndFailure {
    /// Source path as the front-end names it
    pub source: String,
    pub message: String,
}

pub trait FrontEnd {
    /// Sources of the run, in input order
    fn sources(&self) -> Vec<String>;

    /// Resolve one batch. Entries answer the batch's sources in order.
    fn resolve(&mut self, batch: &[String]) -> Vec<Result<CompilationUnit, FrontEndFailure>>;
}

pub trait AnnotationProcessor {
    fn name(&self) -> &str;

    /// Units generated from the resolved units of the run
    fn process(&mut self, units: &[CompilationUnit]) -> Vec<CompilationUnit>;
}

/// Units already resolved, handed over as they are
#[derive(Debug, Clone, Default)]
pub struct ResolvedUnits {
    units: Vec<CompilationUnit>,
}

impl ResolvedUnits {
    pub fn new(units: Vec<CompilationUnit>) -> Self {
        Self { units }
    }
}

impl FrontEnd for ResolvedUnits {
    fn sources(&self) -> Vec<String> {
        self.units.iter().map(|u| u.provenance.to_string()).collect()
    }

    fn resolve(&mut self, batch: &[String]) -> Vec<Result<CompilationUnit, FrontEndFailure>> {
        batch
            .iter()
            .map(|source| {
                self.units
                    .iter()
                    .find(|u| &u.provenance.to_string() == source)
                    .cloned()
                    .ok_or_else(|| FrontEndFailure {
                        source: source.clone(),
                        message: "no such unit".to_string(),
                    })
            })
            .collect()
    }
}

/// Units of a run with the diagnostics raised while collecting them
#[derive(Debug, Default)]
pub struct CollectedUnits {
    pub units: Vec<CompilationUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve every source in batches of `batch_size`, then run the
/// processors over the result. The batch size never changes which units
/// are produced nor their order.
pub fn collect_units(
    front_end: &mut dyn FrontEnd,
    processors: &mut [Box<dyn AnnotationProcessor>],
    batch_size: usize,
) -> CollectedUnits {
    let sources = front_end.sources();
    let mut collected = CollectedUnits::default();
    for batch in sources.chunks(batch_size.max(1)) {
        debug!("resolving a batch of {} sources", batch.len());
        for result in front_end.resolve(batch) {
            match result {
                Ok(unit) => collected.units.push(unit),
                Err(failure) => {
                    let unit = Provenance::File { path: failure.source };
                    let error = TranslationError::FrontEndFailure {
                        message: failure.message,
                    };
                    collected.diagnostics.push(Diagnostic::error(Some(&unit), &error));
                }
            }
        }
    }

    for processor in processors.iter_mut() {
        let generated = processor.process(&collected.units);
        if generated.is_empty() || generated.iter().all(|u| u.types.is_empty()) {
            collected.diagnostics.push(Diagnostic::warning(
                None,
                format!("annotation processor `{}` produced no types", processor.name()),
            ));
            continue;
        }
        info!("annotation processor `{}` injected {} units", processor.name(), generated.len());
        collected.units.extend(generated.into_iter().map(mark_generated));
    }
    collected
}

fn mark_generated(mut unit: CompilationUnit) -> CompilationUnit {
    if !matches!(unit.provenance, Provenance::Generated { .. }) {
        unit.provenance = Provenance::Generated {
            origin: unit.provenance.source_path().to_string(),
        };
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use source_model::{NameKind, QualifiedName, TypeDeclaration, TypeKind};

    fn unit(path: &str, binary: &str) -> CompilationUnit {
        let mut unit = CompilationUnit::new(Provenance::File { path: path.to_string() }, &["a"]);
        unit.types.push(TypeDeclaration::new(
            QualifiedName::from_binary_name(binary, NameKind::Class),
            TypeKind::Class,
        ));
        unit
    }

    /// Resolves everything but sources named `Broken`, counting invocations
    struct Counting {
        inner: ResolvedUnits,
        calls: usize,
    }

    impl FrontEnd for Counting {
        fn sources(&self) -> Vec<String> {
            let mut sources = self.inner.sources();
            sources.insert(1, "a/Broken.java".to_string());
            sources
        }

        fn resolve(&mut self, batch: &[String]) -> Vec<Result<CompilationUnit, FrontEndFailure>> {
            self.calls += 1;
            self.inner.resolve(batch)
        }
    }

    struct Generator;

    impl AnnotationProcessor for Generator {
        fn name(&self) -> &str {
            "generator"
        }

        fn process(&mut self, units: &[CompilationUnit]) -> Vec<CompilationUnit> {
            vec![unit("gen/a/Holder_Factory.java", &format!("a.Holder_Factory{}", units.len()))]
        }
    }

    struct Silent;

    impl AnnotationProcessor for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn process(&mut self, _: &[CompilationUnit]) -> Vec<CompilationUnit> {
            vec![]
        }
    }

    #[test]
    fn batch_size_only_changes_invocations() {
        let units = vec![unit("a/A.java", "a.A"), unit("a/B.java", "a.B"), unit("a/C.java", "a.C")];
        let mut outcomes = vec![];
        for batch_size in [1, 2, 10] {
            let mut front_end = Counting {
                inner: ResolvedUnits::new(units.clone()),
                calls: 0,
            };
            let collected = collect_units(&mut front_end, &mut [], batch_size);
            outcomes.push((collected.units, collected.diagnostics));
            assert_eq!(front_end.calls, (4 + batch_size - 1) / batch_size);
        }
        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[1], outcomes[2]);
        let (units, diagnostics) = &outcomes[0];
        assert_eq!(units.len(), 3);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, "FrontEndFailure");
        assert_eq!(diagnostics[0].unit.as_deref(), Some("a/Broken.java"));
    }

    #[test]
    fn injected_units_carry_generated_provenance() {
        let mut front_end = ResolvedUnits::new(vec![unit("a/A.java", "a.A")]);
        let mut processors: Vec<Box<dyn AnnotationProcessor>> = vec![Box::new(Generator), Box::new(Silent)];
        let collected = collect_units(&mut front_end, &mut processors, 100);

        assert_eq!(collected.units.len(), 2);
        assert_eq!(
            collected.units[1].provenance,
            Provenance::Generated {
                origin: "gen/a/Holder_Factory.java".to_string()
            }
        );
        assert_eq!(collected.units[1].file_stem(), "Holder_Factory");
        assert_eq!(collected.diagnostics.len(), 1);
        assert_eq!(collected.diagnostics[0].severity, Severity::Warning);
    }
}
