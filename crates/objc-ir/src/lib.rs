// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Target-shaped intermediate form for the ObjC translator
//!
//! Declaration trees produced here mirror the layout of the generated
//! interface and implementation files: identifiers are already mangled,
//! method bodies already carry explicit ownership operations, and metadata
//! tables are plain data. This crate does NOT render text - that belongs to
//! the backend crate.

mod data;
pub mod analysis;

// Identifiers and type descriptors (from data/types.rs)
pub use data::types::{GeneratedIdentifier, PrimitiveType, ReferenceKind, TypeDescriptor};

// Expressions (from data/expressions.rs)
pub use data::expressions::{BinaryOperator, ConstantValue, Expr, ExprKind, Ownership, UnaryOperator};

// Statements (from data/statements.rs)
pub use data::statements::{Block, CaseValue, CatchClause, Stmt, SwitchCase};

// Declarations (from data/declarations.rs)
pub use data::declarations::{
    DeclKind, DeclarationTree, EnumConstantDecl, FieldDecl, FieldOwnership, InitializerDecl, Member, MethodDecl,
    MethodKind, ParamDecl, TypeDecl,
};

// Reflection metadata (from data/metadata.rs)
pub use data::metadata::{AnnotationData, AnnotationDataValue, FieldMetadata, MetadataTable, MethodMetadata};
