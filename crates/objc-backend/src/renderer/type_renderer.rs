// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Type descriptors as C/ObjC type names

use objc_ir::{ReferenceKind, TypeDescriptor};

/// `int32_t`, `NSString *`, `id<JavaUtilList>`, `id`, `ORTIntArray *`
pub fn type_name(ty: &TypeDescriptor) -> String {
    match ty.erased() {
        TypeDescriptor::Void => "void".to_string(),
        TypeDescriptor::Primitive(p) => p.c_name().to_string(),
        TypeDescriptor::Reference { ident, kind, .. } => match kind {
            ReferenceKind::Class => format!("{} *", ident),
            ReferenceKind::Protocol => format!("id<{}>", ident),
            ReferenceKind::Id => "id".to_string(),
        },
        TypeDescriptor::Array { .. } => format!("{} *", ty.array_class().unwrap_or_default()),
        // erased() never yields these
        TypeDescriptor::GenericParameter { .. } | TypeDescriptor::Wildcard { .. } => "id".to_string(),
    }
}

/// A declarator: `int32_t count`, `NSString *name`
pub fn declaration(ty: &TypeDescriptor, name: &str) -> String {
    let ty = type_name(ty);
    if ty.ends_with('*') {
        format!("{}{}", ty, name)
    } else {
        format!("{} {}", ty, name)
    }
}

/// Storage qualifier of an ivar
pub fn weak_declaration(ty: &TypeDescriptor, name: &str) -> String {
    format!("__unsafe_unretained {}", declaration(ty, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_ir::{GeneratedIdentifier, PrimitiveType};
    use source_model::{NameKind, QualifiedName};

    fn reference(ident: &str, kind: ReferenceKind) -> TypeDescriptor {
        TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new(ident),
            kind,
            name: QualifiedName::from_binary_name("a.B", NameKind::Class),
        }
    }

    #[test]
    fn names_by_kind() {
        assert_eq!(type_name(&TypeDescriptor::Primitive(PrimitiveType::Char16)), "uint16_t");
        assert_eq!(type_name(&reference("NSString", ReferenceKind::Class)), "NSString *");
        assert_eq!(type_name(&reference("JavaUtilList", ReferenceKind::Protocol)), "id<JavaUtilList>");
        assert_eq!(type_name(&TypeDescriptor::id()), "id");
        let strings = TypeDescriptor::Array {
            element: Box::new(reference("NSString", ReferenceKind::Class)),
        };
        assert_eq!(type_name(&strings), "ORTObjectArray *");
        let t = TypeDescriptor::GenericParameter {
            name: "T".to_string(),
            erasure: Box::new(reference("AB", ReferenceKind::Class)),
        };
        assert_eq!(type_name(&t), "AB *");
    }

    #[test]
    fn declarators() {
        assert_eq!(declaration(&TypeDescriptor::Primitive(PrimitiveType::Int32), "n"), "int32_t n");
        assert_eq!(declaration(&reference("AB", ReferenceKind::Class), "b"), "AB *b");
        assert_eq!(weak_declaration(&TypeDescriptor::id(), "this$0_"), "__unsafe_unretained id this$0_");
    }
}
