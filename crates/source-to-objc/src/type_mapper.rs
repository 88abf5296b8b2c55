// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Mapping of source types to target type descriptors, and the boxing
//! conventions that go with them.

use crate::class_index::ClassIndex;
use crate::diagnostics::TranslationResult;
use crate::naming::NameRegistry;
use objc_ir::{Expr, ExprKind, GeneratedIdentifier, Ownership, PrimitiveType, ReferenceKind, TypeDescriptor};
use source_model::{NameKind, PrimitiveKind, QualifiedName, SourceType, WildcardBound};

/// Names every run registers whether or not a unit mentions them; the
/// rewriters reach for these implicitly (enum bases, string building,
/// boxing, class literals).
pub fn implicit_names() -> Vec<QualifiedName> {
    let mut names: Vec<QualifiedName> = [
        "java.lang.Object",
        "java.lang.String",
        "java.lang.Enum",
        "java.lang.Throwable",
        "java.lang.IllegalArgumentException",
        "java.lang.Class",
        "java.lang.StringBuilder",
    ]
    .iter()
    .map(|n| QualifiedName::from_binary_name(n, NameKind::Class))
    .collect();
    names.extend(PrimitiveKind::ALL.iter().map(|p| p.boxed_name()));
    names
}

pub fn map_primitive(kind: PrimitiveKind) -> PrimitiveType {
    match kind {
        PrimitiveKind::Boolean => PrimitiveType::Bool,
        PrimitiveKind::Byte => PrimitiveType::Int8,
        PrimitiveKind::Char => PrimitiveType::Char16,
        PrimitiveKind::Short => PrimitiveType::Int16,
        PrimitiveKind::Int => PrimitiveType::Int32,
        PrimitiveKind::Long => PrimitiveType::Int64,
        PrimitiveKind::Float => PrimitiveType::Float,
        PrimitiveKind::Double => PrimitiveType::Double,
    }
}

pub fn source_primitive(ty: PrimitiveType) -> PrimitiveKind {
    match ty {
        PrimitiveType::Bool => PrimitiveKind::Boolean,
        PrimitiveType::Int8 => PrimitiveKind::Byte,
        PrimitiveType::Char16 => PrimitiveKind::Char,
        PrimitiveType::Int16 => PrimitiveKind::Short,
        PrimitiveType::Int32 => PrimitiveKind::Int,
        PrimitiveType::Int64 => PrimitiveKind::Long,
        PrimitiveType::Float => PrimitiveKind::Float,
        PrimitiveType::Double => PrimitiveKind::Double,
    }
}

/// Read-only view over the frozen registry and the class index
#[derive(Clone, Copy)]
pub struct TypeMapper<'a> {
    registry: &'a NameRegistry,
    index: &'a ClassIndex,
}

impl<'a> TypeMapper<'a> {
    pub fn new(registry: &'a NameRegistry, index: &'a ClassIndex) -> Self {
        Self { registry, index }
    }

    pub fn registry(&self) -> &'a NameRegistry {
        self.registry
    }

    pub fn index(&self) -> &'a ClassIndex {
        self.index
    }

    pub fn resolve(&self, name: &QualifiedName) -> TranslationResult<GeneratedIdentifier> {
        self.registry.resolve(name)
    }

    /// Whether a name is used through a protocol rather than a class
    pub fn is_protocol(&self, name: &QualifiedName) -> bool {
        match self.registry.kind_of(name) {
            Some(kind) => matches!(kind, NameKind::Interface | NameKind::Annotation),
            None => self.index.is_interface(name),
        }
    }

    pub fn reference(&self, name: &QualifiedName) -> TranslationResult<TypeDescriptor> {
        if name.is("java.lang.Object") {
            return Ok(TypeDescriptor::id());
        }
        let ident = self.resolve(name)?;
        let kind = if self.is_protocol(name) {
            ReferenceKind::Protocol
        } else {
            ReferenceKind::Class
        };
        let mut name = name.clone();
        if let Some(registered) = self.registry.registered(&name) {
            name.kind = registered.kind;
        }
        Ok(TypeDescriptor::Reference { ident, kind, name })
    }

    pub fn map_type(&self, ty: &SourceType) -> TranslationResult<TypeDescriptor> {
        Ok(match ty {
            SourceType::Primitive(p) => TypeDescriptor::Primitive(map_primitive(*p)),
            SourceType::Void => TypeDescriptor::Void,
            SourceType::Null => TypeDescriptor::id(),
            SourceType::Class { name, .. } => self.reference(name)?,
            SourceType::Array(element) => TypeDescriptor::Array {
                element: Box::new(self.map_type(element)?),
            },
            SourceType::TypeVariable { name, .. } => TypeDescriptor::GenericParameter {
                name: name.clone(),
                erasure: Box::new(self.map_type(&ty.erasure())?),
            },
            SourceType::Wildcard(bound) => {
                let bound = match bound {
                    WildcardBound::Extends(b) => self.map_type(&b.erasure())?,
                    _ => TypeDescriptor::id(),
                };
                TypeDescriptor::Wildcard { bound: Box::new(bound) }
            }
        })
    }

    pub fn map_types(&self, types: &[SourceType]) -> TranslationResult<Vec<TypeDescriptor>> {
        types.iter().map(|t| self.map_type(t)).collect()
    }

    /// Descriptor used for an erased position (selectors, metadata)
    pub fn map_erased(&self, ty: &SourceType) -> TranslationResult<TypeDescriptor> {
        self.map_type(&ty.erasure())
    }

    /// `[JavaLangInteger valueOfWithInt:x]`
    pub fn box_of(&self, value: Expr, kind: PrimitiveKind) -> TranslationResult<Expr> {
        let boxed = kind.boxed_name();
        let ident = self.resolve(&boxed)?;
        let ty = self.reference(&boxed)?;
        let selector = format!("valueOfWith{}:", map_primitive(kind).keyword());
        Ok(Expr::message(Expr::new(ExprKind::ClassRef(ident), ty.clone()), selector, vec![value], ty)
            .with_ownership(Ownership::Autoreleased))
    }

    /// `[ort_nil_chk(x) intValue]`
    pub fn unbox_of(&self, value: Expr, kind: PrimitiveKind) -> Expr {
        Expr::message(
            nil_chk(value),
            format!("{}Value", kind.keyword()),
            vec![],
            TypeDescriptor::Primitive(map_primitive(kind)),
        )
    }
}

/// Null-check a receiver unless it is trivially non-nil
pub fn nil_chk(value: Expr) -> Expr {
    if value.is_trivially_non_nil() {
        return value;
    }
    let ty = value.ty.clone();
    Expr::call("ort_nil_chk", vec![value], ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::RegistryBuilder;
    use crate::options::PrefixOptions;

    fn fixture() -> (NameRegistry, ClassIndex) {
        let builder = RegistryBuilder::new(PrefixOptions::default());
        for name in implicit_names() {
            builder.register(&name, name.kind).unwrap();
        }
        builder
            .register(&QualifiedName::from_binary_name("java.util.List", NameKind::Interface), NameKind::Interface)
            .unwrap();
        let (registry, errors) = builder.freeze();
        assert!(errors.is_empty());
        (registry, ClassIndex::default())
    }

    #[test]
    fn maps_primitives_classes_and_protocols() {
        let (registry, index) = fixture();
        let mapper = TypeMapper::new(&registry, &index);
        assert_eq!(
            mapper.map_type(&SourceType::Primitive(PrimitiveKind::Long)).unwrap(),
            TypeDescriptor::Primitive(PrimitiveType::Int64)
        );
        assert_eq!(mapper.map_type(&SourceType::object()).unwrap(), TypeDescriptor::id());
        let string = mapper.map_type(&SourceType::string()).unwrap();
        assert!(matches!(&string, TypeDescriptor::Reference { kind: ReferenceKind::Class, ident, .. } if ident.as_str() == "NSString"));
        let list = mapper.map_type(&SourceType::interface("java.util.List")).unwrap();
        assert!(matches!(&list, TypeDescriptor::Reference { kind: ReferenceKind::Protocol, ident, .. } if ident.as_str() == "JavaUtilList"));
        let array = mapper.map_type(&SourceType::array_of(SourceType::string())).unwrap();
        assert_eq!(array.array_class().unwrap(), "ORTObjectArray");
    }

    #[test]
    fn type_variables_erase_to_leftmost_bound() {
        let (registry, index) = fixture();
        let mapper = TypeMapper::new(&registry, &index);
        let t = SourceType::TypeVariable {
            name: "T".to_string(),
            bounds: vec![SourceType::string()],
        };
        let mapped = mapper.map_type(&t).unwrap();
        assert_eq!(mapped.reference_ident().unwrap().as_str(), "NSString");
        let unbounded = SourceType::TypeVariable { name: "E".to_string(), bounds: vec![] };
        assert_eq!(mapper.map_type(&unbounded).unwrap().erased(), &TypeDescriptor::id());
    }

    #[test]
    fn boxing_calls_wrapper_factories() {
        let (registry, index) = fixture();
        let mapper = TypeMapper::new(&registry, &index);
        let boxed = mapper.box_of(Expr::int(1), PrimitiveKind::Int).unwrap();
        assert_eq!(boxed.ownership, Ownership::Autoreleased);
        let ExprKind::Message { selector, .. } = &boxed.kind else { panic!("message expected") };
        assert_eq!(selector, "valueOfWithInt:");
        let unboxed = mapper.unbox_of(Expr::local("x", TypeDescriptor::id()), PrimitiveKind::Int);
        let ExprKind::Message { receiver, selector, .. } = &unboxed.kind else { panic!("message expected") };
        assert_eq!(selector, "intValue");
        assert!(matches!(&receiver.kind, ExprKind::Call { function, .. } if function == "ort_nil_chk"));
    }
}
