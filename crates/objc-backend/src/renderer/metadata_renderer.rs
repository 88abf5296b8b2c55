// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Reflection tables and annotation values
//!
//! Tables are static C data returned by `+__metadata`. Entries are
//! positional:
//!
//! - `ORTMethodInfo`: selector, source name, return type, parameter types,
//!   modifiers, exceptions, generic signature, annotations
//! - `ORTFieldInfo`: name, target name, type, modifiers, generic signature,
//!   constant, annotations
//! - `ORTClassInfo`: simple name, package, enclosing class, superclass,
//!   protocols, modifiers, generic signature, methods, method count, fields,
//!   field count, inner classes
//!
//! Member annotations are returned by file-local functions named
//! `<Type>__annotations_<n>`, numbered over methods then fields.

use super::objc_writer::ObjcWriter;
use crate::escape::{c_string, char_literal, double_literal, float_literal, int_literal, long_literal, string_literal};
use itertools::Itertools;
use objc_ir::{AnnotationData, AnnotationDataValue, MetadataTable};

/// Member annotation function of a table entry
struct AnnotationFunction<'a> {
    name: String,
    annotations: &'a [AnnotationData],
}

/// Names of the annotation functions of a table, methods first, in the same
/// order `render_annotation_functions` writes them
fn annotation_functions(table: &MetadataTable) -> Vec<AnnotationFunction<'_>> {
    let members = table
        .methods
        .iter()
        .map(|m| m.annotations.as_slice())
        .chain(table.fields.iter().map(|f| f.annotations.as_slice()));
    members
        .filter(|a| !a.is_empty())
        .enumerate()
        .map(|(i, annotations)| AnnotationFunction {
            name: format!("{}__annotations_{}", table.ident, i),
            annotations,
        })
        .collect()
}

/// File-local functions returning member annotations
pub fn render_annotation_functions(table: &MetadataTable, w: &mut ObjcWriter) {
    for f in annotation_functions(table) {
        write!(w, "static ORTObjectArray *{}(void)", f.name);
        w.braced(|w| w.line(&format!("return {};", annotation_array(f.annotations))));
        w.newline();
        w.blank_line();
    }
}

/// `+ (const ORTClassInfo *)__metadata`
pub fn render_metadata_method(table: &MetadataTable, w: &mut ObjcWriter) {
    let functions = annotation_functions(table);
    let mut next_function = functions.iter();
    let mut function_for = |annotations: &[AnnotationData]| -> String {
        if annotations.is_empty() {
            return "NULL".to_string();
        }
        next_function.next().map(|f| f.name.clone()).unwrap_or_else(|| "NULL".to_string())
    };

    w.write("+ (const ORTClassInfo *)__metadata");
    w.braced(|w| {
        if !table.methods.is_empty() {
            w.write("static const ORTMethodInfo methods[] =");
            w.braced(|w| {
                for m in &table.methods {
                    let entry = [
                        c_string(&m.selector),
                        optional(m.source_name.as_deref()),
                        optional(m.return_type.as_deref()),
                        c_string(&m.param_types.concat()),
                        format!("0x{:x}", m.modifiers),
                        optional((!m.throws.is_empty()).then(|| m.throws.join(";")).as_deref()),
                        optional(m.generic_signature.as_deref()),
                        function_for(&m.annotations),
                    ];
                    w.line(&format!("{{ {} }},", entry.join(", ")));
                }
            });
            w.line(";");
        }
        if !table.fields.is_empty() {
            w.write("static const ORTFieldInfo fields[] =");
            w.braced(|w| {
                for f in &table.fields {
                    let entry = [
                        c_string(&f.name),
                        c_string(&f.target_name),
                        c_string(&f.type_descriptor),
                        format!("0x{:x}", f.modifiers),
                        optional(f.generic_signature.as_deref()),
                        optional(f.constant.as_deref()),
                        function_for(&f.annotations),
                    ];
                    w.line(&format!("{{ {} }},", entry.join(", ")));
                }
            });
            w.line(";");
        }
        let (methods, method_count) = if table.methods.is_empty() {
            ("NULL", 0)
        } else {
            ("methods", table.methods.len())
        };
        let (fields, field_count) = if table.fields.is_empty() {
            ("NULL", 0)
        } else {
            ("fields", table.fields.len())
        };
        let info = [
            c_string(&table.simple_name),
            optional(table.package.as_deref()),
            optional(table.enclosing.as_deref()),
            optional(table.superclass.as_deref()),
            optional((!table.protocols.is_empty()).then(|| table.protocols.join(";")).as_deref()),
            format!("0x{:x}", table.modifiers),
            optional(table.generic_signature.as_deref()),
            methods.to_string(),
            method_count.to_string(),
            fields.to_string(),
            field_count.to_string(),
            optional((!table.inner_classes.is_empty()).then(|| table.inner_classes.join(";")).as_deref()),
        ];
        w.line(&format!("static const ORTClassInfo _ORTClassInfo = {{ {} }};", info.join(", ")));
        w.line("return &_ORTClassInfo;");
    });
    w.newline();
}

/// `+ (ORTObjectArray *)__annotations` for the type's own annotations
pub fn render_type_annotations(annotations: &[AnnotationData], w: &mut ObjcWriter) {
    w.write("+ (ORTObjectArray *)__annotations");
    w.braced(|w| w.line(&format!("return {};", annotation_array(annotations))));
    w.newline();
}

fn optional(s: Option<&str>) -> String {
    s.map(c_string).unwrap_or_else(|| "NULL".to_string())
}

fn annotation_array(annotations: &[AnnotationData]) -> String {
    format!("ORTAnnotationArray(@[{}])", annotations.iter().map(annotation).format(", "))
}

/// `ORTAnnotationCreate(@"a.Tag", @[ORTAnnotationMember(@"value", 'I', @(5))])`
pub fn annotation(data: &AnnotationData) -> String {
    let members = data.elements.iter().map(|(name, value)| {
        format!(
            "ORTAnnotationMember({}, '{}', {})",
            string_literal(name),
            value.type_code(),
            annotation_value(value)
        )
    });
    format!("ORTAnnotationCreate({}, @[{}])", string_literal(&data.type_name), members.format(", "))
}

pub fn annotation_value(value: &AnnotationDataValue) -> String {
    match value {
        AnnotationDataValue::Bool(true) => "@YES".to_string(),
        AnnotationDataValue::Bool(false) => "@NO".to_string(),
        AnnotationDataValue::Byte(v) => format!("@({})", v),
        AnnotationDataValue::Char(v) => format!("@({})", char_literal(*v)),
        AnnotationDataValue::Short(v) => format!("@({})", v),
        AnnotationDataValue::Int(v) => format!("@({})", int_literal(*v)),
        AnnotationDataValue::Long(v) => format!("@({})", long_literal(*v)),
        AnnotationDataValue::Float(v) => format!("@({})", float_literal(*v)),
        AnnotationDataValue::Double(v) => format!("@({})", double_literal(*v)),
        AnnotationDataValue::String(v) => string_literal(v),
        AnnotationDataValue::Enum { type_ident, constant } => format!(
            "ORTEnumConstant({}, {})",
            string_literal(type_ident.as_str()),
            string_literal(constant)
        ),
        AnnotationDataValue::Class(descriptor) => format!("ORTClassForDescriptor({})", string_literal(descriptor)),
        AnnotationDataValue::Annotation(nested) => annotation(nested),
        AnnotationDataValue::Array(values) => format!("@[{}]", values.iter().map(annotation_value).format(", ")),
    }
}
