// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Shared setup for rewriter tests

use crate::class_index::ClassIndex;
use crate::naming::{NameRegistry, RegistryBuilder};
use crate::options::PrefixOptions;
use crate::scan::scan_unit;
use crate::translation::desugar_unit;
use crate::type_mapper::{implicit_names, TypeMapper};
use source_model::{
    CompilationUnit, FieldDeclaration, Member, MethodDeclaration, MethodKind, Modifiers, NameKind, Parameter,
    Provenance, QualifiedName, SourceType, Stmt, TypeDeclaration, TypeKind, VarRef,
};

pub struct Fixture {
    pub units: Vec<CompilationUnit>,
    pub registry: NameRegistry,
    pub index: ClassIndex,
}

impl Fixture {
    /// Desugar, scan and index the units the way a run does
    pub fn new(mut units: Vec<CompilationUnit>) -> Self {
        units.iter_mut().for_each(desugar_unit);
        let builder = RegistryBuilder::new(PrefixOptions::default());
        for name in implicit_names() {
            builder.register(&name, name.kind).unwrap();
        }
        for unit in &units {
            assert!(scan_unit(&builder, unit).is_empty());
        }
        let (registry, errors) = builder.freeze();
        assert!(errors.is_empty(), "{:?}", errors);
        let index = ClassIndex::build(&units);
        Self { units, registry, index }
    }

    pub fn mapper(&self) -> TypeMapper<'_> {
        TypeMapper::new(&self.registry, &self.index)
    }
}

pub fn name(binary: &str) -> QualifiedName {
    QualifiedName::from_binary_name(binary, NameKind::Class)
}

pub fn unit(path: &str, types: Vec<TypeDeclaration>) -> CompilationUnit {
    let mut unit = CompilationUnit::new(Provenance::File { path: path.to_string() }, &["a"]);
    unit.types = types;
    unit
}

pub fn class(binary: &str, members: Vec<Member>) -> TypeDeclaration {
    let mut decl = TypeDeclaration::new(name(binary), TypeKind::Class);
    decl.modifiers = Modifiers::new(Modifiers::PUBLIC);
    decl.members = members;
    decl
}

pub fn field(name: &str, ty: SourceType, modifiers: u32) -> Member {
    Member::Field(FieldDeclaration {
        name: name.to_string(),
        ty,
        modifiers: Modifiers::new(modifiers),
        initializer: None,
        constant_value: None,
        annotations: vec![],
        location: Default::default(),
    })
}

pub fn method(name: &str, params: Vec<(VarRef, SourceType)>, return_type: SourceType, body: Vec<Stmt>) -> Member {
    Member::Method(MethodDeclaration {
        name: name.to_string(),
        kind: MethodKind::Method,
        modifiers: Modifiers::new(Modifiers::PUBLIC),
        type_params: vec![],
        params: params
            .into_iter()
            .map(|(var, ty)| Parameter { var, ty, annotations: vec![] })
            .collect(),
        return_type,
        throws: vec![],
        body: Some(body),
        native_code: None,
        overrides: vec![],
        annotations: vec![],
        default_value: None,
        location: Default::default(),
    })
}
