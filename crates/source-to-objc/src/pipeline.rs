// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The translation run
//!
//! 1. desugar every unit
//! 2. scan every unit into the registry, then freeze it; a collision stops
//!    the run here
//! 3. index the declared types of the run
//! 4. rewrite units on a pool of `max_concurrency` threads and synthesize
//!    their metadata
//!
//! Results are kept by unit index, so the outcome never depends on
//! scheduling. Once more errors than the threshold are recorded and early
//! abort is enabled, units not yet started are skipped; units already
//! running finish. A failed unit contributes diagnostics only.

use crate::class_index::ClassIndex;
use crate::diagnostics::{Diagnostic, Tally, TranslationError};
use crate::metadata::synthesize_tree;
use crate::naming::{NameRegistry, RegistryBuilder};
use crate::options::TranslationOptions;
use crate::scan::scan_unit;
use crate::translation::{desugar_unit, rewrite_unit};
use crate::type_mapper::{implicit_names, TypeMapper};
use log::{debug, info, warn};
use objc_ir::{DeclarationTree, MetadataTable};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use source_model::CompilationUnit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A unit that translated without errors
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedUnit {
    /// Position of the unit in the run's input
    pub index: usize,
    pub tree: DeclarationTree,
    /// One table per declaration of the tree, in tree order
    pub metadata: Vec<MetadataTable>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Translated(TranslatedUnit),
    Failed,
    /// Not started because the run was aborted
    Skipped,
}

/// Everything a run produced, in input order
#[derive(Debug)]
pub struct Translation {
    pub outcomes: Vec<UnitOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub registry: NameRegistry,
    pub options: TranslationOptions,
}

impl Translation {
    pub fn tally(&self) -> Tally {
        Tally::of(&self.diagnostics)
    }

    /// Whether the run as a whole failed
    pub fn failed(&self) -> bool {
        self.tally().errors > self.options.error_threshold
    }

    pub fn translated(&self) -> impl Iterator<Item = &TranslatedUnit> {
        self.outcomes.iter().filter_map(|o| match o {
            UnitOutcome::Translated(t) => Some(t),
            _ => None,
        })
    }
}

/// Translate the units of one run. `diagnostics` are conditions raised
/// before translation (front-end failures) and count toward the threshold.
pub fn translate(
    mut units: Vec<CompilationUnit>,
    diagnostics: Vec<Diagnostic>,
    options: &TranslationOptions,
) -> Translation {
    let threads = options.max_concurrency.max(1);
    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| run(&mut units, diagnostics, options)),
        Err(e) => {
            warn!("cannot build a pool of {} threads ({}), translating sequentially", threads, e);
            run(&mut units, diagnostics, &TranslationOptions {
                max_concurrency: 1,
                ..options.clone()
            })
        }
    }
}

fn run(units: &mut [CompilationUnit], mut diagnostics: Vec<Diagnostic>, options: &TranslationOptions) -> Translation {
    info!("translating {} units", units.len());
    units.par_iter_mut().for_each(desugar_unit);

    let (registry, collisions) = build_registry(units, options);
    if !collisions.is_empty() {
        diagnostics.extend(collisions.iter().map(|e| Diagnostic::error(None, e)));
        warn!("{} name collisions, nothing translated", collisions.len());
        return Translation {
            outcomes: vec![UnitOutcome::Skipped; units.len()],
            diagnostics,
            registry,
            options: options.clone(),
        };
    }

    let index = ClassIndex::build(units);
    debug!("indexed {} declared types", index.len());
    let mapper = TypeMapper::new(&registry, &index);

    let errors = AtomicUsize::new(diagnostics.iter().filter(|d| d.is_error()).count());
    let translate_one = |(i, unit): (usize, &CompilationUnit)| -> (UnitOutcome, Vec<Diagnostic>) {
        if options.abort_on_threshold && errors.load(Ordering::SeqCst) > options.error_threshold {
            return (UnitOutcome::Skipped, vec![]);
        }
        match rewrite_unit(unit, mapper) {
            Ok(tree) => {
                let metadata = if options.emit_metadata {
                    synthesize_tree(&tree)
                } else {
                    vec![]
                };
                (UnitOutcome::Translated(TranslatedUnit { index: i, tree, metadata }), vec![])
            }
            Err(unit_errors) => {
                errors.fetch_add(unit_errors.len(), Ordering::SeqCst);
                debug!("{}: {} errors", unit.provenance, unit_errors.len());
                let reported = unit_errors
                    .iter()
                    .map(|e| Diagnostic::error(Some(&unit.provenance), e))
                    .collect();
                (UnitOutcome::Failed, reported)
            }
        }
    };
    let results: Vec<(UnitOutcome, Vec<Diagnostic>)> = if options.max_concurrency <= 1 {
        units.iter().enumerate().map(translate_one).collect()
    } else {
        units.par_iter().enumerate().map(translate_one).collect()
    };

    let mut outcomes = Vec::with_capacity(results.len());
    for (outcome, unit_diagnostics) in results {
        outcomes.push(outcome);
        diagnostics.extend(unit_diagnostics);
    }
    let skipped = outcomes.iter().filter(|o| **o == UnitOutcome::Skipped).count();
    if skipped > 0 {
        warn!("error threshold exceeded, {} units not translated", skipped);
        diagnostics.push(Diagnostic::warning(
            None,
            format!("run aborted after exceeding the error threshold; {} units not translated", skipped),
        ));
    }
    Translation {
        outcomes,
        diagnostics,
        registry,
        options: options.clone(),
    }
}

/// Scan every unit, then freeze. The frozen registry reports each
/// collision once, whatever order the units were scanned in.
fn build_registry(units: &[CompilationUnit], options: &TranslationOptions) -> (NameRegistry, Vec<TranslationError>) {
    let builder = RegistryBuilder::new(options.prefixes.clone());
    let implicit: Vec<TranslationError> = implicit_names()
        .iter()
        .filter_map(|name| builder.register(name, name.kind).err())
        .collect();
    let scanned: usize = units.par_iter().map(|unit| scan_unit(&builder, unit).len()).sum();
    debug!("scanning reported {} collisions on insert", scanned + implicit.len());
    let (registry, errors) = builder.freeze();
    info!("{} names registered", registry.len());
    (registry, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_model::{
        Expr, Literal, Member, MethodDeclaration, MethodKind, Modifiers, NameKind, Provenance, QualifiedName,
        SourceType, Stmt, TypeDeclaration, TypeKind,
    };

    fn class_unit(path: &str, binary: &str) -> CompilationUnit {
        let name = QualifiedName::from_binary_name(binary, NameKind::Class);
        let mut decl = TypeDeclaration::new(name, TypeKind::Class);
        decl.modifiers = Modifiers::new(Modifiers::PUBLIC);
        let mut unit = CompilationUnit::new(Provenance::File { path: path.to_string() }, &["a"]);
        unit.types.push(decl);
        unit
    }

    fn with_native_method(mut unit: CompilationUnit) -> CompilationUnit {
        unit.types[0].members.push(Member::Method(MethodDeclaration {
            name: "peek".to_string(),
            kind: MethodKind::Method,
            modifiers: Modifiers::new(Modifiers::PUBLIC | Modifiers::NATIVE),
            type_params: vec![],
            params: vec![],
            return_type: SourceType::int(),
            throws: vec![],
            body: None,
            native_code: None,
            overrides: vec![],
            annotations: vec![],
            default_value: None,
            location: Default::default(),
        }));
        unit
    }

    fn with_getter(mut unit: CompilationUnit) -> CompilationUnit {
        unit.types[0].members.push(Member::Method(MethodDeclaration {
            name: "answer".to_string(),
            kind: MethodKind::Method,
            modifiers: Modifiers::new(Modifiers::PUBLIC),
            type_params: vec![],
            params: vec![],
            return_type: SourceType::int(),
            throws: vec![],
            body: Some(vec![Stmt::ret(Some(Expr::literal(Literal::Int(42))))]),
            native_code: None,
            overrides: vec![],
            annotations: vec![],
            default_value: None,
            location: Default::default(),
        }));
        unit
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        let units: Vec<_> = (0..8)
            .map(|i| with_getter(class_unit(&format!("a/C{}.java", i), &format!("a.C{}", i))))
            .collect();
        let sequential = translate(units.clone(), vec![], &TranslationOptions::default());
        let parallel = translate(
            units,
            vec![],
            &TranslationOptions {
                max_concurrency: 4,
                ..Default::default()
            },
        );
        assert_eq!(sequential.outcomes, parallel.outcomes);
        assert_eq!(sequential.translated().count(), 8);
        assert!(!parallel.failed());
    }

    #[test]
    fn a_failing_unit_does_not_stop_the_others() {
        let units = vec![
            with_getter(class_unit("a/Good.java", "a.Good")),
            with_native_method(class_unit("a/Bad.java", "a.Bad")),
        ];
        let translation = translate(units, vec![], &TranslationOptions::default());
        assert_eq!(translation.tally(), Tally { errors: 1, warnings: 0 });
        assert!(translation.failed());
        assert!(matches!(translation.outcomes[0], UnitOutcome::Translated(_)));
        assert_eq!(translation.outcomes[1], UnitOutcome::Failed);
        assert_eq!(translation.diagnostics[0].unit.as_deref(), Some("a/Bad.java"));
    }

    #[test]
    fn the_threshold_decides_failure() {
        let units = vec![with_native_method(class_unit("a/Bad.java", "a.Bad"))];
        let lenient = TranslationOptions {
            error_threshold: 1,
            ..Default::default()
        };
        assert!(!translate(units, vec![], &lenient).failed());
    }

    #[test]
    fn abort_skips_units_not_yet_started() {
        let mut units = vec![with_native_method(class_unit("a/Bad.java", "a.Bad"))];
        units.extend((0..3).map(|i| class_unit(&format!("a/C{}.java", i), &format!("a.C{}", i))));
        let options = TranslationOptions {
            abort_on_threshold: true,
            ..Default::default()
        };
        let translation = translate(units, vec![], &options);
        assert_eq!(translation.outcomes[0], UnitOutcome::Failed);
        assert!(translation.outcomes[1..].iter().all(|o| *o == UnitOutcome::Skipped));
        assert_eq!(translation.tally(), Tally { errors: 1, warnings: 1 });
    }

    #[test]
    fn collisions_stop_the_run_before_rewriting() {
        let units = vec![class_unit("x/a/Holder.java", "a.Holder"), class_unit("y/a/Holder.java", "a.Holder")];
        let translation = translate(units, vec![], &TranslationOptions::default());
        let collisions: Vec<_> = translation.diagnostics.iter().filter(|d| d.kind == "NameCollision").collect();
        assert_eq!(collisions.len(), 1);
        assert!(translation.translated().next().is_none());
        assert!(translation.failed());
    }
}
