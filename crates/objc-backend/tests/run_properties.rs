// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Run-level properties: whole runs from units to artifact text

use objc_backend::{run_translation, write_artifacts, ArtifactPair, EmitOptions, RunOutput};
use source_model::{
    Annotation, AnnotationElement, AnnotationValue, CompilationUnit, Expr, FieldDeclaration, Literal, Member,
    MethodDeclaration, MethodKind, Modifiers, NameKind, Provenance, QualifiedName, SourceType, Stmt,
    TypeDeclaration, TypeKind,
};
use source_to_objc::{AnnotationProcessor, FileNaming, OutputStyle, ResolvedUnits, TranslationOptions};
use std::collections::BTreeSet;

fn class_unit(provenance: Provenance, binary: &str) -> CompilationUnit {
    let name = QualifiedName::from_binary_name(binary, NameKind::Class);
    let mut decl = TypeDeclaration::new(name.clone(), TypeKind::Class);
    decl.modifiers = Modifiers::new(Modifiers::PUBLIC);
    let package: Vec<&str> = name.package.iter().map(String::as_str).collect();
    let mut unit = CompilationUnit::new(provenance, &package);
    unit.types.push(decl);
    unit
}

fn file(path: &str) -> Provenance {
    Provenance::File { path: path.to_string() }
}

fn method(name: &str, modifiers: u32, body: Option<Vec<Stmt>>) -> MethodDeclaration {
    MethodDeclaration {
        name: name.to_string(),
        kind: MethodKind::Method,
        modifiers: Modifiers::new(modifiers),
        type_params: vec![],
        params: vec![],
        return_type: SourceType::int(),
        throws: vec![],
        body,
        native_code: None,
        overrides: vec![],
        annotations: vec![],
        default_value: None,
        location: Default::default(),
    }
}

fn with_getter(mut unit: CompilationUnit, name: &str) -> CompilationUnit {
    let body = vec![Stmt::ret(Some(Expr::literal(Literal::Int(42))))];
    unit.types[0]
        .members
        .push(Member::Method(method(name, Modifiers::PUBLIC, Some(body))));
    unit
}

/// A native method without native code cannot be translated
fn with_native_method(mut unit: CompilationUnit) -> CompilationUnit {
    unit.types[0]
        .members
        .push(Member::Method(method("peek", Modifiers::PUBLIC | Modifiers::NATIVE, None)));
    unit
}

fn with_constant(mut unit: CompilationUnit) -> CompilationUnit {
    unit.types[0].members.push(Member::Field(FieldDeclaration {
        name: "LIMIT".to_string(),
        ty: SourceType::int(),
        modifiers: Modifiers::new(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL),
        initializer: Some(Expr::literal(Literal::Int(7))),
        constant_value: Some(Literal::Int(7)),
        annotations: vec![],
        location: Default::default(),
    }));
    unit
}

fn with_superclass(mut unit: CompilationUnit, binary: &str) -> CompilationUnit {
    unit.types[0].superclass = Some(SourceType::class(binary));
    unit
}

fn sample_units() -> Vec<CompilationUnit> {
    vec![
        with_getter(with_superclass(class_unit(file("src/a/Sub.java"), "a.Sub"), "a.Base"), "size"),
        with_constant(class_unit(file("src/a/Base.java"), "a.Base")),
        with_getter(
            class_unit(
                Provenance::Archive {
                    archive_path: "lib/extra.jar".to_string(),
                    entry: "b/Extra.java".to_string(),
                },
                "b.Extra",
            ),
            "answer",
        ),
    ]
}

fn run(units: Vec<CompilationUnit>, options: &TranslationOptions) -> RunOutput {
    let mut front_end = ResolvedUnits::new(units);
    run_translation(&mut front_end, &mut [], options, &EmitOptions::default())
}

fn combined() -> TranslationOptions {
    TranslationOptions {
        output_style: OutputStyle::Combined,
        combined_name: "All".to_string(),
        ..Default::default()
    }
}

fn interface_lines(pairs: &[ArtifactPair]) -> BTreeSet<String> {
    pairs
        .iter()
        .flat_map(|p| p.interface.contents.lines())
        .filter(|l| l.starts_with("@interface ") || l.starts_with("@protocol "))
        .filter(|l| !l.ends_with(';'))
        .map(str::to_string)
        .collect()
}

fn source_lines(text: &str) -> Vec<&str> {
    text.lines().filter_map(|l| l.strip_prefix("//  source: ")).collect()
}

#[test]
fn output_does_not_depend_on_scheduling() {
    for style in [OutputStyle::PerUnit, OutputStyle::Combined] {
        let sequential = TranslationOptions {
            output_style: style,
            ..Default::default()
        };
        let parallel = TranslationOptions {
            output_style: style,
            max_concurrency: 4,
            ..Default::default()
        };
        let a = run(sample_units(), &sequential);
        let b = run(sample_units(), &parallel);
        assert_eq!(a.artifacts, b.artifacts);
        assert_eq!(a.diagnostics, b.diagnostics);
    }
}

#[test]
fn batch_size_only_affects_scheduling() {
    let small = TranslationOptions {
        batch_size: 1,
        ..Default::default()
    };
    let large = TranslationOptions {
        batch_size: 100,
        ..Default::default()
    };
    assert_eq!(run(sample_units(), &small).artifacts, run(sample_units(), &large).artifacts);
}

#[test]
fn banners_name_the_unit_provenance() {
    let output = run(sample_units(), &TranslationOptions::default());
    assert!(!output.failed);
    let units = sample_units();
    assert_eq!(output.artifacts.len(), units.len());
    for (pair, unit) in output.artifacts.iter().zip(&units) {
        for artifact in pair.iter() {
            assert!(artifact.contents.starts_with("//\n//  Generated by the ObjC translator.\n"));
            assert_eq!(source_lines(&artifact.contents), vec![unit.provenance.to_string()]);
        }
    }
    assert_eq!(source_lines(&output.artifacts[2].interface.contents), vec!["jar:file:lib/extra.jar!/b/Extra.java"]);
}

#[test]
fn per_unit_and_combined_declare_the_same_types() {
    let per_unit = run(sample_units(), &TranslationOptions::default());
    let all = run(sample_units(), &combined());
    assert_eq!(all.artifacts.len(), 1);
    assert_eq!(interface_lines(&per_unit.artifacts), interface_lines(&all.artifacts));

    let header = &all.artifacts[0].interface;
    assert_eq!(header.path.to_str(), Some("All.h"));
    let sources: Vec<String> = sample_units().iter().map(|u| u.provenance.to_string()).collect();
    assert_eq!(source_lines(&header.contents), sources);
    assert!(header.contents.contains("#ifndef _All_H_"));
}

#[test]
fn combined_output_declares_supertypes_first() {
    let all = run(sample_units(), &combined());
    let header = &all.artifacts[0].interface.contents;
    let base = header.find("@interface ABase :").unwrap();
    let sub = header.find("@interface ASub : ABase").unwrap();
    assert!(base < sub);
    // Supertype and subtype share the artifact, so nothing is included for them.
    assert!(!header.contains("#include \"ABase.h\""));
}

#[test]
fn per_unit_headers_include_supertypes() {
    let output = run(sample_units(), &TranslationOptions::default());
    let sub = &output.artifacts[0];
    assert_eq!(sub.interface.path.to_str(), Some("ASub.h"));
    assert!(sub.interface.contents.contains("#include \"ABase.h\"\n"));
    assert!(sub.interface.contents.contains("#ifndef _ASub_H_\n"));
    assert!(sub.implementation.contents.contains("#include \"ASub.h\"\n"));
    assert!(output.artifacts[1].interface.contents.contains("#define ABase_LIMIT 7\n"));
}

#[test]
fn failed_units_leave_the_others_untouched() {
    let good = || with_getter(class_unit(file("a/Good.java"), "a.Good"), "answer");
    let alone = run(vec![good()], &TranslationOptions::default());
    let mixed = run(
        vec![good(), with_native_method(class_unit(file("a/Bad.java"), "a.Bad"))],
        &TranslationOptions::default(),
    );
    assert!(mixed.failed);
    assert_eq!(mixed.tally.errors, 1);
    assert_eq!(mixed.artifacts, alone.artifacts);
    assert_eq!(mixed.diagnostics[0].unit.as_deref(), Some("a/Bad.java"));

    let lenient = TranslationOptions {
        error_threshold: 1,
        ..Default::default()
    };
    let tolerated = run(
        vec![good(), with_native_method(class_unit(file("a/Bad.java"), "a.Bad"))],
        &lenient,
    );
    assert!(!tolerated.failed);
    assert_eq!(tolerated.artifacts.len(), 1);
}

#[test]
fn collisions_are_reported_once_and_stop_output() {
    let units = vec![
        class_unit(file("x/a/Holder.java"), "a.Holder"),
        class_unit(file("y/a/Holder.java"), "a.Holder"),
        class_unit(file("z/a/Other.java"), "a.Other"),
    ];
    let output = run(units, &combined());
    let collisions = output.diagnostics.iter().filter(|d| d.kind == "NameCollision").count();
    assert_eq!(collisions, 1);
    assert!(output.failed);
    assert!(output.artifacts.is_empty());
}

#[test]
fn metadata_lists_every_method_and_field() {
    let mut unit = with_constant(with_getter(class_unit(file("a/Holder.java"), "a.Holder"), "size"));
    unit.types[0].annotations.push(Annotation {
        type_name: QualifiedName::from_binary_name("a.Tag", NameKind::Annotation),
        elements: vec![AnnotationElement {
            name: "value".to_string(),
            value: AnnotationValue::Int(3),
        }],
        runtime_visible: true,
    });
    let mut tag = class_unit(file("a/Tag.java"), "a.Tag");
    tag.types[0].name.kind = NameKind::Annotation;
    tag.types[0].kind = TypeKind::Annotation;

    let output = run(vec![unit.clone(), tag.clone()], &TranslationOptions::default());
    assert!(!output.failed, "{:?}", output.diagnostics);
    let implementation = &output.artifacts[0].implementation.contents;
    assert!(implementation.contains("+ (const ORTClassInfo *)__metadata"));
    assert!(implementation.contains("{ \"size\", NULL, \"I\", \"\", 0x1, NULL, NULL, NULL },"));
    assert!(implementation.contains("{ \"LIMIT\", \"AHolder_LIMIT\", \"I\", 0x19, NULL, \"7\", NULL },"));
    assert!(implementation.contains("ORTAnnotationMember(@\"value\", 'I', @(3))"));

    let without = TranslationOptions {
        emit_metadata: false,
        ..Default::default()
    };
    let output = run(vec![unit, tag], &without);
    let implementation = &output.artifacts[0].implementation.contents;
    assert!(!implementation.contains("__metadata"));
    // Type annotations stay queryable without the tables.
    assert!(implementation.contains("+ (ORTObjectArray *)__annotations"));
}

struct Injector;

impl AnnotationProcessor for Injector {
    fn name(&self) -> &str {
        "injector"
    }

    fn process(&mut self, _units: &[CompilationUnit]) -> Vec<CompilationUnit> {
        vec![with_getter(class_unit(file("gen/a/Made.java"), "a.Made"), "answer")]
    }
}

#[test]
fn injected_units_are_marked_generated() {
    let mut front_end = ResolvedUnits::new(vec![class_unit(file("a/Plain.java"), "a.Plain")]);
    let mut processors: Vec<Box<dyn AnnotationProcessor>> = vec![Box::new(Injector)];
    let output = run_translation(
        &mut front_end,
        &mut processors,
        &TranslationOptions::default(),
        &EmitOptions::default(),
    );
    assert_eq!(output.artifacts.len(), 2);
    assert_eq!(
        source_lines(&output.artifacts[1].interface.contents),
        vec!["generated by gen/a/Made.java"]
    );
}

#[test]
fn package_directories_are_written_to_disk() {
    let options = TranslationOptions {
        file_naming: FileNaming::PackageDirectories,
        ..Default::default()
    };
    let output = run(sample_units(), &options);
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(&output.artifacts, dir.path()).unwrap();

    let pattern = format!("{}/**/*.h", dir.path().display());
    let mut headers: Vec<String> = glob::glob(&pattern)
        .unwrap()
        .filter_map(Result::ok)
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    headers.sort();
    assert_eq!(headers, vec!["a/Base.h", "a/Sub.h", "b/Extra.h"]);
    let sub = std::fs::read_to_string(dir.path().join("a/Sub.h")).unwrap();
    assert!(sub.contains("#include \"a/Base.h\""));
}
