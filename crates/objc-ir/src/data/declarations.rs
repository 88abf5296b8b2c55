// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Target-shaped declarations

use super::expressions::ConstantValue;
use super::metadata::AnnotationData;
use super::statements::Block;
use super::types::{GeneratedIdentifier, TypeDescriptor};
use serde::{Deserialize, Serialize};
use source_model::{Modifiers, Provenance, QualifiedName};

/// The rewritten form of one compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationTree {
    pub provenance: Provenance,
    /// Identifier the unit's artifacts are named after
    pub primary: GeneratedIdentifier,
    /// Source qualified name of the primary type (package name for package-info units)
    pub primary_name: QualifiedName,
    /// Every declaration of the unit, nested and synthetic types flattened,
    /// in declaration order
    pub types: Vec<TypeDecl>,
}

impl DeclarationTree {
    pub fn find(&self, ident: &GeneratedIdentifier) -> Option<&TypeDecl> {
        self.types.iter().find(|t| &t.ident == ident)
    }

    pub fn defines(&self, ident: &GeneratedIdentifier) -> bool {
        self.find(ident).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    /// A protocol plus its companion class of the same name
    Interface,
    Enum,
    Annotation,
    /// Holder class carrying package annotations
    PackageInfo,
}

impl DeclKind {
    pub fn has_protocol(self) -> bool {
        matches!(self, DeclKind::Interface | DeclKind::Annotation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstantDecl {
    pub name: String,
    pub ordinal: usize,
    /// Class instantiated for the constant (a synthetic subclass for constants with bodies)
    pub class: GeneratedIdentifier,
    pub selector: String,
    pub args: Vec<super::expressions::Expr>,
}

/// A class, protocol, enum or annotation type after flattening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub ident: GeneratedIdentifier,
    pub source_name: QualifiedName,
    pub kind: DeclKind,
    pub modifiers: Modifiers,
    /// Superclass for classes; `None` for protocols
    pub superclass: Option<TypeDescriptor>,
    pub protocols: Vec<TypeDescriptor>,
    /// Source name of the lexically enclosing type
    pub enclosing: Option<QualifiedName>,
    pub generic_signature: Option<String>,
    pub annotations: Vec<AnnotationData>,
    pub enum_constants: Vec<EnumConstantDecl>,
    pub members: Vec<Member>,
    /// Synthesized by flattening (anonymous, local and lambda classes, enum constant bodies)
    pub synthetic: bool,
    /// Readable alias emitted as a `typedef` when a prefix shortened the identifier
    pub alias: Option<String>,
}

impl TypeDecl {
    pub fn new(ident: GeneratedIdentifier, source_name: QualifiedName, kind: DeclKind) -> Self {
        Self {
            ident,
            source_name,
            kind,
            modifiers: Modifiers::default(),
            superclass: None,
            protocols: vec![],
            enclosing: None,
            generic_signature: None,
            annotations: vec![],
            enum_constants: vec![],
            members: vec![],
            synthetic: false,
            alias: None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn initializers(&self) -> impl Iterator<Item = &InitializerDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Initializer(i) => Some(i),
            _ => None,
        })
    }

    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields().filter(|f| !f.is_static)
    }

    pub fn static_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields().filter(|f| f.is_static)
    }

    /// Append a synthetic member after every declared one
    pub fn push_synthetic(&mut self, mut member: Member) {
        member.mark_synthetic();
        self.members.push(member);
    }

    pub fn has_method(&self, selector: &str, is_static: bool) -> bool {
        self.methods()
            .any(|m| m.selector == selector && m.kind.is_static() == is_static)
    }

    /// True when the class needs `+initialize` for static state
    pub fn needs_initialize(&self) -> bool {
        self.initializers().next().is_some() || !self.enum_constants.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Initializer(InitializerDecl),
}

impl Member {
    pub fn is_synthetic(&self) -> bool {
        match self {
            Member::Field(f) => f.synthetic,
            Member::Method(m) => m.synthetic,
            Member::Initializer(i) => i.synthetic,
        }
    }

    fn mark_synthetic(&mut self) {
        match self {
            Member::Field(f) => f.synthetic = true,
            Member::Method(m) => m.synthetic = true,
            Member::Initializer(i) => i.synthetic = true,
        }
    }
}

/// How a field holds an object value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldOwnership {
    /// Retained; released in `dealloc`
    Strong,
    /// `__unsafe_unretained` back-reference, never released
    Weak,
    /// Primitive storage
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Source field name
    pub name: String,
    /// Ivar name (`name_`) or static variable name (`Class_name`)
    pub target_name: String,
    pub ty: TypeDescriptor,
    pub modifiers: Modifiers,
    pub is_static: bool,
    /// Compile-time constant, emitted as a `#define`
    pub constant: Option<ConstantValue>,
    pub ownership: FieldOwnership,
    /// Source type descriptor (`I`, `Ljava/lang/String;`)
    pub descriptor: String,
    pub generic_signature: Option<String>,
    pub annotations: Vec<AnnotationData>,
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Instance,
    /// Class method (`+`)
    Static,
    /// `- (instancetype)init...`
    Constructor,
    /// Plain C function holding an interface default method body; the
    /// receiver is passed as the first parameter
    Function,
}

impl MethodKind {
    pub fn is_static(self) -> bool {
        matches!(self, MethodKind::Static)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Source method name; `None` for members with no source counterpart
    pub source_name: Option<String>,
    /// Selector, or the function name for `MethodKind::Function`
    pub selector: String,
    pub kind: MethodKind,
    pub return_type: TypeDescriptor,
    pub params: Vec<ParamDecl>,
    /// `None` for abstract and protocol methods
    pub body: Option<Block>,
    pub modifiers: Modifiers,
    /// Source method descriptor `(I)V`
    pub descriptor: String,
    pub generic_signature: Option<String>,
    /// Binary names of declared exceptions
    pub throws: Vec<String>,
    pub annotations: Vec<AnnotationData>,
    /// Declared in the header; private methods live in a class extension
    pub public: bool,
    pub synthetic: bool,
}

impl MethodDecl {
    pub fn new(selector: impl Into<String>, kind: MethodKind, return_type: TypeDescriptor) -> Self {
        Self {
            source_name: None,
            selector: selector.into(),
            kind,
            return_type,
            params: vec![],
            body: None,
            modifiers: Modifiers::default(),
            descriptor: "()V".to_string(),
            generic_signature: None,
            throws: vec![],
            annotations: vec![],
            public: true,
            synthetic: false,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializerDecl {
    /// Static initializer code, run from `+initialize` in declaration order
    pub body: Block,
    pub synthetic: bool,
}
