// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Declarations: compilation units, types and members

use crate::code::{Block, Expr, Literal, MethodRef, VarRef};
use crate::names::QualifiedName;
use crate::types::SourceType;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Source position (1-based)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

/// Where a compilation unit came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Provenance {
    /// A plain source file
    File { path: String },
    /// An entry inside an archive on the source path
    Archive { archive_path: String, entry: String },
    /// A unit injected by an annotation processor
    Generated { origin: String },
}

impl Provenance {
    /// The path a unit is reported under in diagnostics
    pub fn source_path(&self) -> &str {
        match self {
            Provenance::File { path } => path,
            Provenance::Archive { entry, .. } => entry,
            Provenance::Generated { origin } => origin,
        }
    }

    pub fn archive_path(&self) -> Option<&str> {
        match self {
            Provenance::Archive { archive_path, .. } => Some(archive_path),
            _ => None,
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::File { path } => write!(f, "{}", path),
            Provenance::Archive { archive_path, entry } => {
                write!(f, "jar:file:{}!/{}", archive_path, entry)
            }
            Provenance::Generated { origin } => write!(f, "generated by {}", origin),
        }
    }
}

/// Access and property flags, using the source class-file bit values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const PUBLIC: u32 = 0x0001;
    pub const PRIVATE: u32 = 0x0002;
    pub const PROTECTED: u32 = 0x0004;
    pub const STATIC: u32 = 0x0008;
    pub const FINAL: u32 = 0x0010;
    pub const SYNCHRONIZED: u32 = 0x0020;
    pub const VOLATILE: u32 = 0x0040;
    pub const BRIDGE: u32 = 0x0040;
    pub const TRANSIENT: u32 = 0x0080;
    pub const VARARGS: u32 = 0x0080;
    pub const NATIVE: u32 = 0x0100;
    pub const INTERFACE: u32 = 0x0200;
    pub const ABSTRACT: u32 = 0x0400;
    pub const SYNTHETIC: u32 = 0x1000;
    pub const ANNOTATION: u32 = 0x2000;
    pub const ENUM: u32 = 0x4000;
    /// Not a class-file flag: marks interface methods with a default body
    pub const DEFAULT: u32 = 0x0001_0000;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    pub fn without(self, flag: u32) -> Self {
        Self(self.0 & !flag)
    }

    pub fn is_public(self) -> bool {
        self.has(Self::PUBLIC)
    }

    pub fn is_private(self) -> bool {
        self.has(Self::PRIVATE)
    }

    pub fn is_protected(self) -> bool {
        self.has(Self::PROTECTED)
    }

    pub fn is_static(self) -> bool {
        self.has(Self::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.has(Self::FINAL)
    }

    pub fn is_abstract(self) -> bool {
        self.has(Self::ABSTRACT)
    }

    pub fn is_native(self) -> bool {
        self.has(Self::NATIVE)
    }

    pub fn is_synchronized(self) -> bool {
        self.has(Self::SYNCHRONIZED)
    }

    pub fn is_default(self) -> bool {
        self.has(Self::DEFAULT)
    }
}

/// One compilation unit: a source file's resolved tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub provenance: Provenance,
    /// Package segments; empty for the default package
    #[serde(default)]
    pub package: Vec<String>,
    /// Annotations on the package declaration (package-info units)
    #[serde(default)]
    pub package_annotations: Vec<Annotation>,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
}

impl CompilationUnit {
    pub fn new(provenance: Provenance, package: &[&str]) -> Self {
        Self {
            provenance,
            package: package.iter().map(|s| s.to_string()).collect(),
            package_annotations: vec![],
            types: vec![],
        }
    }

    /// File stem of the unit's source (`Example` for `.../Example.java`)
    pub fn file_stem(&self) -> &str {
        let path = self.provenance.source_path();
        let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
        file.split('.').next().unwrap_or(file)
    }

    /// A unit that only carries package annotations
    pub fn is_package_info(&self) -> bool {
        self.types.is_empty() && self.file_stem() == "package-info"
    }

    /// The type the unit's artifacts are named after: the top-level type
    /// matching the file name, else the first public type, else the first.
    pub fn primary_type(&self) -> Option<&TypeDeclaration> {
        let stem = self.file_stem();
        self.types
            .iter()
            .find(|t| t.name.simple_name() == stem)
            .or_else(|| self.types.iter().find(|t| t.modifiers.is_public()))
            .or_else(|| self.types.first())
    }
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl TypeKind {
    pub fn is_interface_like(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Annotation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<SourceType>,
}

/// A class, interface, enum or annotation type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: QualifiedName,
    pub kind: TypeKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    #[serde(default)]
    pub superclass: Option<SourceType>,
    #[serde(default)]
    pub interfaces: Vec<SourceType>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub enum_constants: Vec<EnumConstant>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub location: Location,
}

impl TypeDeclaration {
    pub fn new(name: QualifiedName, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            modifiers: Modifiers::default(),
            type_params: vec![],
            superclass: None,
            interfaces: vec![],
            annotations: vec![],
            enum_constants: vec![],
            members: vec![],
            location: Location::default(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn nested_types(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Type(t) => Some(t),
            _ => None,
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.methods().filter(|m| m.kind == MethodKind::Constructor)
    }
}

/// A member of a type declaration, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Member {
    Field(FieldDeclaration),
    Method(MethodDeclaration),
    Initializer(Initializer),
    Type(TypeDeclaration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: SourceType,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub initializer: Option<Expr>,
    /// Compile-time constant value of a static final field
    #[serde(default)]
    pub constant_value: Option<Literal>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub var: VarRef,
    pub ty: SourceType,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    pub name: String,
    pub kind: MethodKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub type_params: Vec<TypeParameter>,
    #[serde(default)]
    pub params: Vec<Parameter>,
    pub return_type: SourceType,
    #[serde(default)]
    pub throws: Vec<SourceType>,
    #[serde(default)]
    pub body: Option<Block>,
    /// Target-language code block supplied for native methods
    #[serde(default)]
    pub native_code: Option<String>,
    /// Methods this one overrides, with their declared signatures
    #[serde(default)]
    pub overrides: Vec<MethodRef>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Default value of an annotation type element
    #[serde(default)]
    pub default_value: Option<AnnotationValue>,
    #[serde(default)]
    pub location: Location,
}

impl MethodDeclaration {
    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    pub fn param_types(&self) -> Vec<SourceType> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub is_static: bool,
    pub body: Block,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Constructor invoked for this constant
    pub constructor: MethodRef,
    /// Class body of a constant that specializes the enum
    #[serde(default)]
    pub body: Option<Box<TypeDeclaration>>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub type_name: QualifiedName,
    #[serde(default)]
    pub elements: Vec<AnnotationElement>,
    /// Whether the annotation type has runtime retention
    #[serde(default)]
    pub runtime_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationElement {
    pub name: String,
    pub value: AnnotationValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Enum { type_name: QualifiedName, constant: String },
    Class(SourceType),
    Annotation(Box<Annotation>),
    Array(Vec<AnnotationValue>),
}
