// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Target type descriptors

use serde::{Deserialize, Serialize};
use source_model::QualifiedName;
use std::fmt::{self, Display, Formatter};

/// A mangled target identifier for a source type or package.
///
/// Always a valid C identifier and never empty; the registry is the only
/// producer for types, so two distinct source names never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedIdentifier(String);

impl GeneratedIdentifier {
    pub fn new(ident: impl Into<String>) -> Self {
        Self(ident.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `_ComGoogleTestExample_H_`
    pub fn include_guard(&self) -> String {
        format!("_{}_H_", self.0)
    }

    /// Identifier of a type nested in this one
    pub fn nested(&self, simple_name: &str) -> GeneratedIdentifier {
        Self(format!("{}_{}", self.0, simple_name))
    }
}

impl Display for GeneratedIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeneratedIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fixed-width native primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Bool,
    Int8,
    /// UTF-16 code unit
    Char16,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
}

impl PrimitiveType {
    /// C spelling
    pub fn c_name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int8 => "int8_t",
            PrimitiveType::Char16 => "uint16_t",
            PrimitiveType::Int16 => "int16_t",
            PrimitiveType::Int32 => "int32_t",
            PrimitiveType::Int64 => "int64_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Keyword used in selectors and array class names (`withInt:`, `ORTIntArray`)
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "Boolean",
            PrimitiveType::Int8 => "Byte",
            PrimitiveType::Char16 => "Char",
            PrimitiveType::Int16 => "Short",
            PrimitiveType::Int32 => "Int",
            PrimitiveType::Int64 => "Long",
            PrimitiveType::Float => "Float",
            PrimitiveType::Double => "Double",
        }
    }

    /// Zero literal used for conservative initialization
    pub fn zero(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "false",
            PrimitiveType::Float => "0.0f",
            PrimitiveType::Double => "0.0",
            _ => "0",
        }
    }

    pub fn is_integral(self) -> bool {
        !matches!(self, PrimitiveType::Bool | PrimitiveType::Float | PrimitiveType::Double)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }
}

/// What a reference descriptor points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceKind {
    Class,
    Protocol,
    /// The unconstrained object type
    Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Void,
    Primitive(PrimitiveType),
    Reference {
        ident: GeneratedIdentifier,
        kind: ReferenceKind,
        /// Source type the reference was mapped from
        name: QualifiedName,
    },
    /// Arrays are objects wrapping a buffer of mapped elements
    Array { element: Box<TypeDescriptor> },
    /// A type variable, kept for signatures; code sees the erasure
    GenericParameter {
        name: String,
        erasure: Box<TypeDescriptor>,
    },
    Wildcard { bound: Box<TypeDescriptor> },
}

impl TypeDescriptor {
    /// The unconstrained object type
    pub fn id() -> Self {
        TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new("NSObject"),
            kind: ReferenceKind::Id,
            name: QualifiedName::from_binary_name("java.lang.Object", source_model::NameKind::Class),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Void)
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.erased() {
            TypeDescriptor::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// True for every descriptor that denotes an object pointer
    pub fn is_object(&self) -> bool {
        match self.erased() {
            TypeDescriptor::Void | TypeDescriptor::Primitive(_) => false,
            _ => true,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.erased(), TypeDescriptor::Array { .. })
    }

    /// Strip generic parameters and wildcards down to the type code operates on
    pub fn erased(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::GenericParameter { erasure, .. } => erasure.erased(),
            TypeDescriptor::Wildcard { bound } => bound.erased(),
            other => other,
        }
    }

    pub fn reference_ident(&self) -> Option<&GeneratedIdentifier> {
        match self.erased() {
            TypeDescriptor::Reference { ident, .. } => Some(ident),
            _ => None,
        }
    }

    /// Name of the runtime array class wrapping this element type
    pub fn array_class_for(element: &TypeDescriptor) -> String {
        match element.erased() {
            TypeDescriptor::Primitive(p) => format!("ORT{}Array", p.keyword()),
            _ => "ORTObjectArray".to_string(),
        }
    }

    pub fn array_class(&self) -> Option<String> {
        match self.erased() {
            TypeDescriptor::Array { element } => Some(Self::array_class_for(element)),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self.erased() {
            TypeDescriptor::Array { element } => Some(element),
            _ => None,
        }
    }

    /// Selector keyword for a parameter of this type (`Int`, `NSString`, `IntArray`)
    pub fn selector_keyword(&self) -> String {
        match self.erased() {
            TypeDescriptor::Void => "Void".to_string(),
            TypeDescriptor::Primitive(p) => p.keyword().to_string(),
            TypeDescriptor::Reference { ident, kind, .. } => match kind {
                ReferenceKind::Id => "Id".to_string(),
                _ => ident.to_string(),
            },
            TypeDescriptor::Array { element } => format!("{}Array", element.selector_keyword()),
            _ => "Id".to_string(),
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Visit every reference descriptor nested in this one
    pub fn for_each_reference(&self, f: &mut impl FnMut(&GeneratedIdentifier, ReferenceKind, &QualifiedName)) {
        match self {
            TypeDescriptor::Reference { ident, kind, name } => f(ident, *kind, name),
            TypeDescriptor::Array { element } => element.for_each_reference(f),
            TypeDescriptor::GenericParameter { erasure, .. } => erasure.for_each_reference(f),
            TypeDescriptor::Wildcard { bound } => bound.for_each_reference(f),
            TypeDescriptor::Void | TypeDescriptor::Primitive(_) => {}
        }
    }

    /// Bottom-up rewrite of the descriptor
    pub fn fold(self, f: &mut impl FnMut(TypeDescriptor) -> TypeDescriptor) -> TypeDescriptor {
        let inner = match self {
            TypeDescriptor::Array { element } => TypeDescriptor::Array {
                element: Box::new(element.fold(f)),
            },
            TypeDescriptor::GenericParameter { name, erasure } => TypeDescriptor::GenericParameter {
                name,
                erasure: Box::new(erasure.fold(f)),
            },
            TypeDescriptor::Wildcard { bound } => TypeDescriptor::Wildcard {
                bound: Box::new(bound.fold(f)),
            },
            other => other,
        };
        f(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_guard_wraps_identifier() {
        let ident = GeneratedIdentifier::new("ComGoogleTestExample");
        assert_eq!(ident.include_guard(), "_ComGoogleTestExample_H_");
        assert_eq!(ident.nested("Inner").as_str(), "ComGoogleTestExample_Inner");
    }

    #[test]
    fn array_classes() {
        let ints = TypeDescriptor::Array {
            element: Box::new(TypeDescriptor::Primitive(PrimitiveType::Int32)),
        };
        assert_eq!(ints.array_class().unwrap(), "ORTIntArray");
        assert_eq!(ints.selector_keyword(), "IntArray");
        let objects = TypeDescriptor::Array {
            element: Box::new(TypeDescriptor::id()),
        };
        assert_eq!(objects.array_class().unwrap(), "ORTObjectArray");
    }

    #[test]
    fn generic_parameters_erase() {
        let t = TypeDescriptor::GenericParameter {
            name: "T".to_string(),
            erasure: Box::new(TypeDescriptor::id()),
        };
        assert!(t.is_object());
        assert_eq!(t.selector_keyword(), "Id");
        let mut seen = vec![];
        t.for_each_reference(&mut |ident, _, _| seen.push(ident.to_string()));
        assert_eq!(seen, vec!["NSObject"]);
    }
}
