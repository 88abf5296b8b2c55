// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Resolved source types

use crate::names::{NameKind, QualifiedName};
use serde::{Deserialize, Serialize};

/// Source primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Source keyword (`int`, `boolean`, ...)
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Binary name of the wrapper class used for boxing
    pub fn boxed_binary_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java.lang.Boolean",
            PrimitiveKind::Byte => "java.lang.Byte",
            PrimitiveKind::Char => "java.lang.Character",
            PrimitiveKind::Short => "java.lang.Short",
            PrimitiveKind::Int => "java.lang.Integer",
            PrimitiveKind::Long => "java.lang.Long",
            PrimitiveKind::Float => "java.lang.Float",
            PrimitiveKind::Double => "java.lang.Double",
        }
    }

    pub fn boxed_name(self) -> QualifiedName {
        QualifiedName::from_binary_name(self.boxed_binary_name(), NameKind::Class)
    }

    /// The primitive a wrapper class unboxes to
    pub fn from_boxed(name: &QualifiedName) -> Option<PrimitiveKind> {
        let binary = name.binary_name();
        Self::ALL.into_iter().find(|p| p.boxed_binary_name() == binary)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Char
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }
}

/// Bound of a wildcard type argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<SourceType>),
    Super(Box<SourceType>),
}

/// A resolved source type as annotated on the input tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    Primitive(PrimitiveKind),
    Void,
    /// Type of the `null` literal
    Null,
    Class {
        name: QualifiedName,
        #[serde(default)]
        type_args: Vec<SourceType>,
    },
    Array(Box<SourceType>),
    TypeVariable {
        name: String,
        #[serde(default)]
        bounds: Vec<SourceType>,
    },
    Wildcard(WildcardBound),
}

impl SourceType {
    pub fn class(binary_name: &str) -> Self {
        Self::named(QualifiedName::from_binary_name(binary_name, NameKind::Class))
    }

    pub fn interface(binary_name: &str) -> Self {
        Self::named(QualifiedName::from_binary_name(binary_name, NameKind::Interface))
    }

    pub fn named(name: QualifiedName) -> Self {
        SourceType::Class {
            name,
            type_args: vec![],
        }
    }

    pub fn object() -> Self {
        Self::class("java.lang.Object")
    }

    pub fn string() -> Self {
        Self::class("java.lang.String")
    }

    pub fn int() -> Self {
        SourceType::Primitive(PrimitiveKind::Int)
    }

    pub fn boolean() -> Self {
        SourceType::Primitive(PrimitiveKind::Boolean)
    }

    pub fn array_of(element: SourceType) -> Self {
        SourceType::Array(Box::new(element))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, SourceType::Primitive(_))
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            SourceType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, SourceType::Void)
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, SourceType::Primitive(_) | SourceType::Void)
    }

    pub fn class_name(&self) -> Option<&QualifiedName> {
        match self {
            SourceType::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_class(&self, binary_name: &str) -> bool {
        self.class_name().map_or(false, |n| n.is(binary_name))
    }

    pub fn is_string(&self) -> bool {
        self.is_class("java.lang.String")
    }

    /// The primitive this wrapper type unboxes to
    pub fn unboxed(&self) -> Option<PrimitiveKind> {
        self.class_name().and_then(PrimitiveKind::from_boxed)
    }

    pub fn element_type(&self) -> Option<&SourceType> {
        match self {
            SourceType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Erasure following the source language rules: type variables erase to
    /// their leftmost bound, wildcards to their upper bound, and
    /// parameterized types drop their arguments.
    pub fn erasure(&self) -> SourceType {
        match self {
            SourceType::Class { name, .. } => SourceType::named(name.clone()),
            SourceType::Array(elem) => SourceType::Array(Box::new(elem.erasure())),
            SourceType::TypeVariable { bounds, .. } => bounds
                .first()
                .map(|b| b.erasure())
                .unwrap_or_else(SourceType::object),
            SourceType::Wildcard(WildcardBound::Extends(bound)) => bound.erasure(),
            SourceType::Wildcard(_) => SourceType::object(),
            SourceType::Null => SourceType::object(),
            other => other.clone(),
        }
    }

    /// Field/method descriptor of the erased type (`I`, `Ljava/lang/String;`, `[J`)
    pub fn descriptor(&self) -> String {
        match self.erasure() {
            SourceType::Primitive(p) => p.descriptor().to_string(),
            SourceType::Void => "V".to_string(),
            SourceType::Class { name, .. } => name.descriptor(),
            SourceType::Array(elem) => format!("[{}", elem.descriptor()),
            _ => "Ljava/lang/Object;".to_string(),
        }
    }

    /// Generic signature form, keeping type arguments and variables
    pub fn generic_signature(&self) -> String {
        match self {
            SourceType::Class { name, type_args } if !type_args.is_empty() => {
                let args: String = type_args.iter().map(|a| a.generic_signature()).collect();
                format!("L{}<{}>;", name.internal_name(), args)
            }
            SourceType::Array(elem) => format!("[{}", elem.generic_signature()),
            SourceType::TypeVariable { name, .. } => format!("T{};", name),
            SourceType::Wildcard(WildcardBound::Unbounded) => "*".to_string(),
            SourceType::Wildcard(WildcardBound::Extends(b)) => format!("+{}", b.generic_signature()),
            SourceType::Wildcard(WildcardBound::Super(b)) => format!("-{}", b.generic_signature()),
            other => other.descriptor(),
        }
    }

    /// True when the generic signature carries information the descriptor lacks
    pub fn is_generic(&self) -> bool {
        match self {
            SourceType::Class { type_args, .. } => !type_args.is_empty(),
            SourceType::Array(elem) => elem.is_generic(),
            SourceType::TypeVariable { .. } | SourceType::Wildcard(_) => true,
            _ => false,
        }
    }

    /// Visit every class name mentioned by this type, including type arguments and bounds
    pub fn for_each_class_name(&self, f: &mut impl FnMut(&QualifiedName)) {
        match self {
            SourceType::Class { name, type_args } => {
                f(name);
                for arg in type_args {
                    arg.for_each_class_name(f);
                }
            }
            SourceType::Array(elem) => elem.for_each_class_name(f),
            SourceType::TypeVariable { bounds, .. } => {
                for bound in bounds {
                    bound.for_each_class_name(f);
                }
            }
            SourceType::Wildcard(WildcardBound::Extends(b) | WildcardBound::Super(b)) => {
                b.for_each_class_name(f)
            }
            _ => {}
        }
    }

    /// Source-like rendering used in diagnostics
    pub fn display_name(&self) -> String {
        match self {
            SourceType::Primitive(p) => p.keyword().to_string(),
            SourceType::Void => "void".to_string(),
            SourceType::Null => "null".to_string(),
            SourceType::Class { name, type_args } if type_args.is_empty() => name.to_string(),
            SourceType::Class { name, type_args } => format!(
                "{}<{}>",
                name,
                itertools::join(type_args.iter().map(|t| t.display_name()), ", ")
            ),
            SourceType::Array(elem) => format!("{}[]", elem.display_name()),
            SourceType::TypeVariable { name, .. } => name.clone(),
            SourceType::Wildcard(WildcardBound::Unbounded) => "?".to_string(),
            SourceType::Wildcard(WildcardBound::Extends(b)) => format!("? extends {}", b.display_name()),
            SourceType::Wildcard(WildcardBound::Super(b)) => format!("? super {}", b.display_name()),
        }
    }
}
