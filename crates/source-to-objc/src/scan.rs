// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Scanning pass
//!
//! Registers every type a unit declares and every type its code or
//! signatures mention, so that the registry is complete before any unit is
//! rewritten.

use crate::diagnostics::TranslationError;
use crate::naming::RegistryBuilder;
use source_model::visit::{for_each_declaration, walk_expr, walk_stmt, walk_type_members, Visitor};
use source_model::{
    Annotation, AnnotationValue, CompilationUnit, Expr, ExprKind, Member, MethodRef, NameKind, QualifiedName,
    SourceType, Stmt, StmtKind, TypeDeclaration, TypeKind,
};
use std::collections::BTreeMap;

pub fn name_kind(kind: TypeKind) -> NameKind {
    match kind {
        TypeKind::Class => NameKind::Class,
        TypeKind::Interface => NameKind::Interface,
        TypeKind::Enum => NameKind::Enum,
        TypeKind::Annotation => NameKind::Annotation,
    }
}

/// Register the names of one unit. Errors are collisions detected on insert;
/// the complete set is reported again when the registry is frozen.
pub fn scan_unit(builder: &RegistryBuilder, unit: &CompilationUnit) -> Vec<TranslationError> {
    let origin = unit.provenance.to_string();
    let mut errors = vec![];
    if unit.is_package_info() {
        if let Err(e) = builder.register_package_info(&unit.package, &origin) {
            errors.push(e);
        }
    }

    let mut declared = vec![];
    let mut referenced = References::default();
    for annotation in &unit.package_annotations {
        referenced.annotation(annotation);
    }
    for_each_declaration(&unit.types, &mut |decl| {
        declared.push((decl.name.clone(), name_kind(decl.kind)));
        referenced.declaration(decl);
    });

    for (name, kind) in &declared {
        if let Err(e) = builder.register_declared(name, *kind, &origin) {
            errors.push(e);
        }
    }
    for (name, kind) in referenced.names {
        if declared.iter().any(|(d, _)| *d == name) {
            continue;
        }
        if let Err(e) = builder.register(&name, kind) {
            errors.push(e);
        }
    }
    errors
}

/// Names mentioned by signatures and code, with the most specific kind seen
#[derive(Default)]
struct References {
    names: BTreeMap<QualifiedName, NameKind>,
}

impl References {
    fn name(&mut self, name: &QualifiedName) {
        if name.is_package() {
            return;
        }
        let kind = self.names.entry(name.clone()).or_insert(name.kind);
        if name.kind > *kind {
            *kind = name.kind;
        }
    }

    fn ty(&mut self, ty: &SourceType) {
        ty.for_each_class_name(&mut |n| self.name(n));
    }

    fn method(&mut self, method: &MethodRef) {
        self.name(&method.owner);
        method.params.iter().for_each(|p| self.ty(p));
        self.ty(&method.return_type);
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.name(&annotation.type_name);
        for element in &annotation.elements {
            self.annotation_value(&element.value);
        }
    }

    fn annotation_value(&mut self, value: &AnnotationValue) {
        match value {
            AnnotationValue::Enum { type_name, .. } => self.name(type_name),
            AnnotationValue::Class(ty) => self.ty(ty),
            AnnotationValue::Annotation(a) => self.annotation(a),
            AnnotationValue::Array(values) => values.iter().for_each(|v| self.annotation_value(v)),
            _ => {}
        }
    }

    fn declaration(&mut self, decl: &TypeDeclaration) {
        if let Some(s) = &decl.superclass {
            self.ty(s);
        }
        decl.interfaces.iter().for_each(|i| self.ty(i));
        decl.type_params.iter().flat_map(|p| &p.bounds).for_each(|b| self.ty(b));
        decl.annotations.iter().for_each(|a| self.annotation(a));
        for constant in &decl.enum_constants {
            self.method(&constant.constructor);
        }
        for member in &decl.members {
            match member {
                Member::Field(f) => {
                    self.ty(&f.ty);
                    f.annotations.iter().for_each(|a| self.annotation(a));
                }
                Member::Method(m) => {
                    m.params.iter().for_each(|p| self.ty(&p.ty));
                    self.ty(&m.return_type);
                    m.throws.iter().for_each(|t| self.ty(t));
                    m.overrides.iter().for_each(|o| self.method(o));
                    m.annotations.iter().for_each(|a| self.annotation(a));
                    m.type_params.iter().flat_map(|p| &p.bounds).for_each(|b| self.ty(b));
                }
                Member::Initializer(_) | Member::Type(_) => {}
            }
        }
        walk_type_members(self, decl);
    }
}

impl Visitor for References {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::LocalVar { ty, .. } | StmtKind::ForEach { var_ty: ty, .. } => self.ty(ty),
            StmtKind::Try { resources, catches, .. } => {
                for r in resources {
                    self.ty(&r.ty);
                    self.method(&r.close);
                }
                catches.iter().flat_map(|c| &c.types).for_each(|t| self.ty(t));
            }
            StmtKind::SuperConstructorCall { ctor, .. } | StmtKind::ThisConstructorCall { ctor, .. } => {
                self.method(ctor)
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        self.ty(&expr.ty);
        if let Some(to) = &expr.converted_to {
            self.ty(to);
        }
        match &expr.kind {
            ExprKind::QualifiedThis(name) => self.name(name),
            ExprKind::Field { field, .. } => {
                self.name(&field.owner);
                self.ty(&field.ty);
            }
            ExprKind::MethodCall { method, .. } => self.method(method),
            ExprKind::New { class, ctor, .. } => {
                self.name(class);
                self.method(ctor);
            }
            ExprKind::NewArray { element, .. } => self.ty(element),
            ExprKind::Cast { ty, .. } | ExprKind::InstanceOf { ty, .. } | ExprKind::ClassLiteral(ty) => self.ty(ty),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PrefixOptions;
    use source_model::{FieldDeclaration, Provenance};

    fn unit(path: &str, binary: &str, field_ty: SourceType) -> CompilationUnit {
        let name = QualifiedName::from_binary_name(binary, NameKind::Class);
        let mut decl = TypeDeclaration::new(name, TypeKind::Class);
        decl.members.push(Member::Field(FieldDeclaration {
            name: "f".to_string(),
            ty: field_ty,
            modifiers: Default::default(),
            initializer: None,
            constant_value: None,
            annotations: vec![],
            location: Default::default(),
        }));
        let mut unit = CompilationUnit::new(Provenance::File { path: path.to_string() }, &["a"]);
        unit.types.push(decl);
        unit
    }

    #[test]
    fn registers_declared_and_referenced_names() {
        let builder = RegistryBuilder::new(PrefixOptions::default());
        let list = SourceType::Class {
            name: QualifiedName::from_binary_name("java.util.List", NameKind::Interface),
            type_args: vec![SourceType::class("a.Item")],
        };
        assert!(scan_unit(&builder, &unit("a/Holder.java", "a.Holder", list)).is_empty());
        let (registry, errors) = builder.freeze();
        assert!(errors.is_empty());
        assert_eq!(registry.resolve(&QualifiedName::from_binary_name("a.Holder", NameKind::Class)).unwrap().as_str(), "AHolder");
        let list_name = QualifiedName::from_binary_name("java.util.List", NameKind::Class);
        assert_eq!(registry.kind_of(&list_name), Some(NameKind::Interface));
        assert!(registry.resolve(&QualifiedName::from_binary_name("a.Item", NameKind::Class)).is_ok());
    }

    #[test]
    fn the_same_class_from_two_units_collides() {
        let builder = RegistryBuilder::new(PrefixOptions::default());
        scan_unit(&builder, &unit("x/a/Holder.java", "a.Holder", SourceType::int()));
        scan_unit(&builder, &unit("y/a/Holder.java", "a.Holder", SourceType::int()));
        let (_, errors) = builder.freeze();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), "NameCollision");
    }
}
