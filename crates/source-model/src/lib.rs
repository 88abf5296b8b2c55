// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Source Model
//!
//! The resolved syntax tree handed to the translator by the front-end. Every
//! expression carries its resolved type, every identifier its resolved
//! declaration, and every unit the provenance it was read from. The translator
//! never parses or type-checks; it only consumes this model.

mod ast;
mod code;
mod names;
mod types;
pub mod visit;

pub use ast::{
    Annotation, AnnotationElement, AnnotationValue, CompilationUnit, EnumConstant,
    FieldDeclaration, Initializer, Location, Member, MethodDeclaration, MethodKind, Modifiers,
    Parameter, Provenance, TypeDeclaration, TypeKind, TypeParameter,
};
pub use code::{
    BinaryOp, Block, CaseLabel, CatchClause, Expr, ExprKind, FieldRef, LambdaBody, Literal,
    MethodRef, MethodReferenceKind, Resource, Stmt, StmtKind, SwitchCase, UnaryOp, VarRef,
};
pub use names::{NameKind, QualifiedName};
pub use types::{PrimitiveKind, SourceType, WildcardBound};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_front_end_json() {
        let json = r#"{
            "provenance": { "kind": "archive", "archive_path": "lib/example.jar", "entry": "com/google/test/Example.java" },
            "package": ["com", "google", "test"],
            "types": [{
                "name": { "package": ["com", "google", "test"], "types": ["Example"], "kind": "class" },
                "kind": "class",
                "modifiers": 1,
                "members": [{
                    "field": {
                        "name": "count",
                        "ty": { "primitive": "int" },
                        "modifiers": 2
                    }
                }]
            }]
        }"#;
        let unit: CompilationUnit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.provenance.archive_path(), Some("lib/example.jar"));
        assert_eq!(unit.file_stem(), "Example");
        let ty = unit.primary_type().unwrap();
        assert!(ty.modifiers.is_public());
        let field = ty.fields().next().unwrap();
        assert_eq!(field.ty, SourceType::int());
        assert!(field.modifiers.is_private());
    }
}
