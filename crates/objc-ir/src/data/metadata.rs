// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Static reflection tables

use super::types::GeneratedIdentifier;
use serde::{Deserialize, Serialize};

/// Annotation element value as plain data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationDataValue {
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Enum {
        type_ident: GeneratedIdentifier,
        constant: String,
    },
    /// Class literal, as a source type descriptor
    Class(String),
    Annotation(Box<AnnotationData>),
    Array(Vec<AnnotationDataValue>),
}

impl AnnotationDataValue {
    /// Type code used by the runtime to decode the table entry
    pub fn type_code(&self) -> char {
        match self {
            AnnotationDataValue::Bool(_) => 'Z',
            AnnotationDataValue::Byte(_) => 'B',
            AnnotationDataValue::Char(_) => 'C',
            AnnotationDataValue::Short(_) => 'S',
            AnnotationDataValue::Int(_) => 'I',
            AnnotationDataValue::Long(_) => 'J',
            AnnotationDataValue::Float(_) => 'F',
            AnnotationDataValue::Double(_) => 'D',
            AnnotationDataValue::String(_) => 's',
            AnnotationDataValue::Enum { .. } => 'e',
            AnnotationDataValue::Class(_) => 'c',
            AnnotationDataValue::Annotation(_) => '@',
            AnnotationDataValue::Array(_) => '[',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationData {
    pub type_ident: GeneratedIdentifier,
    /// Binary name of the annotation type
    pub type_name: String,
    pub elements: Vec<(String, AnnotationDataValue)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodMetadata {
    pub selector: String,
    /// Source name; `None` when it can be derived from the selector
    pub source_name: Option<String>,
    /// Source descriptor of the return type; `None` for constructors
    pub return_type: Option<String>,
    pub param_types: Vec<String>,
    pub modifiers: u32,
    pub throws: Vec<String>,
    pub generic_signature: Option<String>,
    pub annotations: Vec<AnnotationData>,
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub target_name: String,
    pub type_descriptor: String,
    pub modifiers: u32,
    /// Constant value rendered for the table
    pub constant: Option<String>,
    pub generic_signature: Option<String>,
    pub annotations: Vec<AnnotationData>,
    pub synthetic: bool,
}

/// Per-class reflection data, built once the member list is final
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataTable {
    pub ident: GeneratedIdentifier,
    pub simple_name: String,
    /// Dotted package name; `None` for the default package
    pub package: Option<String>,
    /// Binary name of the enclosing class
    pub enclosing: Option<String>,
    pub superclass: Option<String>,
    pub protocols: Vec<String>,
    pub modifiers: u32,
    pub generic_signature: Option<String>,
    pub annotations: Vec<AnnotationData>,
    pub methods: Vec<MethodMetadata>,
    pub fields: Vec<FieldMetadata>,
    /// Binary names of member classes
    pub inner_classes: Vec<String>,
}

impl MetadataTable {
    pub fn method(&self, selector: &str) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.selector == selector)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }
}
