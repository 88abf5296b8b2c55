// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Reflection metadata
//!
//! Tables are built from finished declarations only: every member of the
//! final member list, synthetic ones included, appears exactly once. Types
//! are recorded in the source's descriptor format so the runtime can answer
//! reflective queries in source terms. Interface default method bodies are
//! functions, not members, and have no entry of their own.

use crate::diagnostics::TranslationResult;
use crate::type_mapper::TypeMapper;
use objc_ir::{
    AnnotationData, AnnotationDataValue, ConstantValue, DeclarationTree, FieldMetadata, MethodKind, MetadataTable,
    MethodMetadata, TypeDecl, TypeDescriptor,
};
use source_model::{Annotation, AnnotationValue};

/// Annotations retained at run time, as data
pub fn runtime_annotations(mapper: TypeMapper<'_>, annotations: &[Annotation]) -> TranslationResult<Vec<AnnotationData>> {
    annotations
        .iter()
        .filter(|a| a.runtime_visible)
        .map(|a| annotation_data(mapper, a))
        .collect()
}

pub fn annotation_data(mapper: TypeMapper<'_>, annotation: &Annotation) -> TranslationResult<AnnotationData> {
    Ok(AnnotationData {
        type_ident: mapper.resolve(&annotation.type_name)?,
        type_name: annotation.type_name.binary_name(),
        elements: annotation
            .elements
            .iter()
            .map(|e| Ok((e.name.clone(), annotation_value(mapper, &e.value)?)))
            .collect::<TranslationResult<_>>()?,
    })
}

fn annotation_value(mapper: TypeMapper<'_>, value: &AnnotationValue) -> TranslationResult<AnnotationDataValue> {
    Ok(match value {
        AnnotationValue::Boolean(v) => AnnotationDataValue::Bool(*v),
        AnnotationValue::Byte(v) => AnnotationDataValue::Byte(*v),
        AnnotationValue::Char(v) => AnnotationDataValue::Char(*v),
        AnnotationValue::Short(v) => AnnotationDataValue::Short(*v),
        AnnotationValue::Int(v) => AnnotationDataValue::Int(*v),
        AnnotationValue::Long(v) => AnnotationDataValue::Long(*v),
        AnnotationValue::Float(v) => AnnotationDataValue::Float(*v),
        AnnotationValue::Double(v) => AnnotationDataValue::Double(*v),
        AnnotationValue::String(v) => AnnotationDataValue::String(v.clone()),
        AnnotationValue::Enum { type_name, constant } => AnnotationDataValue::Enum {
            type_ident: mapper.resolve(type_name)?,
            constant: constant.clone(),
        },
        AnnotationValue::Class(ty) => AnnotationDataValue::Class(ty.descriptor()),
        AnnotationValue::Annotation(nested) => AnnotationDataValue::Annotation(Box::new(annotation_data(mapper, nested)?)),
        AnnotationValue::Array(values) => AnnotationDataValue::Array(
            values
                .iter()
                .map(|v| annotation_value(mapper, v))
                .collect::<TranslationResult<_>>()?,
        ),
    })
}

// ============================================================================
// Tables
// ============================================================================

/// Tables for every declaration of a tree, in declaration order
pub fn synthesize_tree(tree: &DeclarationTree) -> Vec<MetadataTable> {
    tree.types.iter().map(|ty| synthesize(ty, &tree.types)).collect()
}

/// Table for one finished declaration; `siblings` are the declarations of
/// the same tree, searched for member classes
pub fn synthesize(ty: &TypeDecl, siblings: &[TypeDecl]) -> MetadataTable {
    let name = &ty.source_name;
    let package = name.package_name();
    MetadataTable {
        ident: ty.ident.clone(),
        simple_name: name.simple_name().to_string(),
        package: (!package.is_empty()).then_some(package),
        enclosing: ty.enclosing.as_ref().map(|e| e.binary_name()),
        superclass: ty.superclass.as_ref().and_then(binary_name),
        protocols: ty.protocols.iter().filter_map(binary_name).collect(),
        modifiers: ty.modifiers.bits(),
        generic_signature: ty.generic_signature.clone(),
        annotations: ty.annotations.clone(),
        methods: ty
            .methods()
            .filter(|m| m.kind != MethodKind::Function)
            .map(|m| {
                let (params, ret) = split_descriptor(&m.descriptor);
                let source_name = m.source_name.as_ref().filter(|n| !derivable(n, &m.selector)).cloned();
                MethodMetadata {
                    selector: m.selector.clone(),
                    source_name,
                    return_type: (m.kind != MethodKind::Constructor).then_some(ret),
                    param_types: params,
                    modifiers: m.modifiers.bits(),
                    throws: m.throws.clone(),
                    generic_signature: m.generic_signature.clone(),
                    annotations: m.annotations.clone(),
                    synthetic: m.synthetic,
                }
            })
            .collect(),
        fields: ty
            .fields()
            .map(|f| FieldMetadata {
                name: f.name.clone(),
                target_name: f.target_name.clone(),
                type_descriptor: f.descriptor.clone(),
                modifiers: f.modifiers.bits(),
                constant: f.constant.as_ref().map(render_constant),
                generic_signature: f.generic_signature.clone(),
                annotations: f.annotations.clone(),
                synthetic: f.synthetic,
            })
            .collect(),
        inner_classes: siblings
            .iter()
            .filter(|s| s.enclosing.as_ref() == Some(name) && is_member_class(s))
            .map(|s| s.source_name.binary_name())
            .collect(),
    }
}

fn binary_name(desc: &TypeDescriptor) -> Option<String> {
    match desc.erased() {
        TypeDescriptor::Reference { name, .. } => Some(name.binary_name()),
        _ => None,
    }
}

/// Local and anonymous classes are named `Outer$1...`
fn is_member_class(ty: &TypeDecl) -> bool {
    !ty.synthetic && !ty.source_name.simple_name().starts_with(|c: char| c.is_ascii_digit())
}

/// The runtime recovers `foo` from `foo` and `fooWithInt:`
fn derivable(source_name: &str, selector: &str) -> bool {
    selector == source_name
        || selector
            .strip_prefix(source_name)
            .map_or(false, |rest| rest.starts_with("With"))
}

/// Parameter and return descriptors of a method descriptor
pub fn split_descriptor(descriptor: &str) -> (Vec<String>, String) {
    let (params, ret) = match descriptor.strip_prefix('(').and_then(|d| d.split_once(')')) {
        Some(parts) => parts,
        None => return (vec![], descriptor.to_string()),
    };
    let mut out = vec![];
    let mut current = String::new();
    let mut in_class = false;
    for c in params.chars() {
        current.push(c);
        match c {
            'L' if !in_class => in_class = true,
            ';' if in_class => {
                in_class = false;
                out.push(std::mem::take(&mut current));
            }
            '[' => {}
            _ if !in_class => out.push(std::mem::take(&mut current)),
            _ => {}
        }
    }
    (out, ret.to_string())
}

fn render_constant(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Bool(v) => v.to_string(),
        ConstantValue::Char(v) => v.to_string(),
        ConstantValue::Int(v) => v.to_string(),
        ConstantValue::Long(v) => v.to_string(),
        ConstantValue::Float(v) => v.to_string(),
        ConstantValue::Double(v) => v.to_string(),
        ConstantValue::String(v) => format!("{:?}", v),
        ConstantValue::Nil => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::fixtures::{class, field, method, unit, Fixture};
    use crate::translation::rewrite_unit;
    use source_model::{
        AnnotationElement, Expr, Literal, Member, Modifiers, NameKind, QualifiedName, SourceType, Stmt, TypeDeclaration,
        TypeKind, VarRef,
    };

    #[test]
    fn descriptors_split_into_parameters() {
        let (params, ret) = split_descriptor("(I[JLjava/lang/String;[[La/B;)V");
        assert_eq!(params, ["I", "[J", "Ljava/lang/String;", "[[La/B;"]);
        assert_eq!(ret, "V");
        assert_eq!(split_descriptor("()Ljava/lang/Object;"), (vec![], "Ljava/lang/Object;".to_string()));
    }

    #[test]
    fn every_member_appears_once() {
        let mut max = field("MAX", SourceType::int(), Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
        if let Member::Field(f) = &mut max {
            f.constant_value = Some(Literal::Int(7));
            f.annotations.push(Annotation {
                type_name: QualifiedName::from_binary_name("a.Tag", NameKind::Annotation),
                elements: vec![AnnotationElement {
                    name: "value".to_string(),
                    value: AnnotationValue::Array(vec![AnnotationValue::Class(SourceType::string())]),
                }],
                runtime_visible: true,
            });
        }
        let get = method(
            "get",
            vec![(VarRef::new(1, "i"), SourceType::int())],
            SourceType::string(),
            vec![Stmt::ret(Some(Expr::literal(Literal::Null)))],
        );
        let inner = class("a.Holder$Entry", vec![]);
        let tag = TypeDeclaration::new(QualifiedName::from_binary_name("a.Tag", NameKind::Annotation), TypeKind::Annotation);
        let fixture = Fixture::new(vec![
            unit("a/Tag.java", vec![tag]),
            unit("a/Holder.java", vec![class("a.Holder", vec![max, get, Member::Type(inner)])]),
        ]);
        let tree = rewrite_unit(&fixture.units[1], fixture.mapper()).unwrap();
        let tables = synthesize_tree(&tree);
        let holder = &tables[0];

        assert_eq!(holder.simple_name, "Holder");
        assert_eq!(holder.package.as_deref(), Some("a"));
        assert_eq!(holder.superclass.as_deref(), Some("java.lang.Object"));
        assert_eq!(holder.inner_classes, ["a.Holder$Entry"]);
        assert_eq!(holder.methods.len(), tree.types[0].methods().count());

        let get = holder.method("getWithInt:").unwrap();
        assert_eq!(get.source_name, None);
        assert_eq!(get.param_types, ["I"]);
        assert_eq!(get.return_type.as_deref(), Some("Ljava/lang/String;"));
        let ctor = holder.method("init").unwrap();
        assert_eq!(ctor.return_type, None);

        let max = holder.field("MAX").unwrap();
        assert_eq!(max.constant.as_deref(), Some("7"));
        let tag = &max.annotations[0];
        assert_eq!(tag.type_ident.as_str(), "ATag");
        let AnnotationDataValue::Array(values) = &tag.elements[0].1 else { panic!("array expected") };
        assert_eq!(values[0], AnnotationDataValue::Class("Ljava/lang/String;".to_string()));

        let entry = &tables[1];
        assert_eq!(entry.enclosing.as_deref(), Some("a.Holder"));
        assert!(entry.field("this$0").unwrap().synthetic);
    }
}
