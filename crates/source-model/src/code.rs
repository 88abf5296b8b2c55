// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Executable code: statements and expressions with resolved types

use crate::ast::{Location, TypeDeclaration};
use crate::names::QualifiedName;
use crate::types::SourceType;
use serde::{Deserialize, Serialize};

pub type Block = Vec<Stmt>;

/// A local variable or parameter. `id` is unique within a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarRef {
    pub id: u32,
    pub name: String,
}

impl VarRef {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// Resolved reference to a method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: QualifiedName,
    pub name: String,
    /// Declared parameter types of the referenced method
    #[serde(default)]
    pub params: Vec<SourceType>,
    pub return_type: SourceType,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub is_varargs: bool,
}

impl MethodRef {
    pub fn constructor(owner: QualifiedName, params: Vec<SourceType>) -> Self {
        Self {
            owner,
            name: "<init>".to_string(),
            params,
            return_type: SourceType::Void,
            is_static: false,
            is_constructor: true,
            is_varargs: false,
        }
    }

    pub fn method(owner: QualifiedName, name: &str, params: Vec<SourceType>, return_type: SourceType) -> Self {
        Self {
            owner,
            name: name.to_string(),
            params,
            return_type,
            is_static: false,
            is_constructor: false,
            is_varargs: false,
        }
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Erased method descriptor `(ILjava/lang/String;)V`
    pub fn descriptor(&self) -> String {
        let params: String = self.params.iter().map(|p| p.descriptor()).collect();
        format!("({}){}", params, self.return_type.descriptor())
    }

    /// Same name and erased parameter types
    pub fn same_erased_signature(&self, other: &MethodRef) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.erasure() == b.erasure())
    }
}

/// Resolved reference to a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: QualifiedName,
    pub name: String,
    pub ty: SourceType,
    #[serde(default)]
    pub is_static: bool,
    /// Compile-time constant value, when the field is a constant variable
    #[serde(default)]
    pub constant_value: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Literal {
    Boolean(bool),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn is_increment(self) -> bool {
        matches!(self, UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodReferenceKind {
    /// `Type::staticMethod`
    Static,
    /// `expr::method`
    Bound,
    /// `Type::instanceMethod`, receiver is the first functional argument
    Unbound,
    /// `Type::new`
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

/// A typed expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    /// Resolved static type of the expression
    pub ty: SourceType,
    /// Type the expression is implicitly converted to by its context
    /// (boxing, unboxing), as recorded by the type checker
    #[serde(default)]
    pub converted_to: Option<SourceType>,
    #[serde(default)]
    pub location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: SourceType) -> Self {
        Self {
            kind,
            ty,
            converted_to: None,
            location: Location::default(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn converted(mut self, to: SourceType) -> Self {
        self.converted_to = Some(to);
        self
    }

    pub fn literal(literal: Literal) -> Self {
        let ty = match &literal {
            Literal::Boolean(_) => SourceType::boolean(),
            Literal::Char(_) => SourceType::Primitive(crate::PrimitiveKind::Char),
            Literal::Int(_) => SourceType::int(),
            Literal::Long(_) => SourceType::Primitive(crate::PrimitiveKind::Long),
            Literal::Float(_) => SourceType::Primitive(crate::PrimitiveKind::Float),
            Literal::Double(_) => SourceType::Primitive(crate::PrimitiveKind::Double),
            Literal::String(_) => SourceType::string(),
            Literal::Null => SourceType::Null,
        };
        Self::new(ExprKind::Literal(literal), ty)
    }

    pub fn local(var: VarRef, ty: SourceType) -> Self {
        Self::new(ExprKind::Local(var), ty)
    }

    pub fn this(ty: SourceType) -> Self {
        Self::new(ExprKind::This, ty)
    }

    /// The type after implicit conversion
    pub fn effective_type(&self) -> &SourceType {
        self.converted_to.as_ref().unwrap_or(&self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExprKind {
    Literal(Literal),
    Local(VarRef),
    This,
    /// `Outer.this`
    QualifiedThis(QualifiedName),
    /// Field access; `target` is `None` for implicit `this` or static access
    Field {
        target: Option<Box<Expr>>,
        field: FieldRef,
    },
    MethodCall {
        target: Option<Box<Expr>>,
        method: MethodRef,
        args: Vec<Expr>,
        #[serde(default)]
        is_super: bool,
    },
    New {
        class: QualifiedName,
        ctor: MethodRef,
        args: Vec<Expr>,
        /// Explicit enclosing instance (`outer.new Inner()`)
        #[serde(default)]
        outer: Option<Box<Expr>>,
        /// Anonymous class body
        #[serde(default)]
        body: Option<Box<TypeDeclaration>>,
    },
    NewArray {
        element: SourceType,
        #[serde(default)]
        dimensions: Vec<Expr>,
        #[serde(default)]
        initializer: Option<Vec<Expr>>,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLength(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        #[serde(default)]
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: SourceType,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: SourceType,
    },
    Lambda {
        params: Vec<(VarRef, SourceType)>,
        body: LambdaBody,
        /// Functional interface method being implemented
        functional: MethodRef,
    },
    MethodReference {
        kind: MethodReferenceKind,
        #[serde(default)]
        target: Option<Box<Expr>>,
        method: MethodRef,
        functional: MethodRef,
    },
    ClassLiteral(SourceType),
    /// A construct the front-end parsed but does not model
    Unsupported {
        construct: String,
    },
}

/// A statement with its source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default)]
    pub location: Location,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            location: Location::default(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub var: VarRef,
    pub ty: SourceType,
    pub init: Expr,
    /// The resource's `close()` method
    pub close: MethodRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub var: VarRef,
    /// Caught types; more than one for a multi-catch
    pub types: Vec<SourceType>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseLabel {
    Default,
    Constant(Literal),
    EnumConstant(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<CaseLabel>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StmtKind {
    Block(Block),
    LocalVar {
        var: VarRef,
        ty: SourceType,
        #[serde(default)]
        init: Option<Expr>,
    },
    LocalClass(Box<TypeDeclaration>),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        #[serde(default)]
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        #[serde(default)]
        init: Vec<Stmt>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        var: VarRef,
        var_ty: SourceType,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        #[serde(default)]
        resources: Vec<Resource>,
        body: Block,
        #[serde(default)]
        catches: Vec<CatchClause>,
        #[serde(default)]
        finally: Option<Block>,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Synchronized {
        lock: Expr,
        body: Block,
    },
    Assert {
        cond: Expr,
        #[serde(default)]
        message: Option<Expr>,
    },
    /// `super(...)` as the first statement of a constructor
    SuperConstructorCall {
        ctor: MethodRef,
        args: Vec<Expr>,
        #[serde(default)]
        outer: Option<Expr>,
    },
    /// `this(...)` as the first statement of a constructor
    ThisConstructorCall {
        ctor: MethodRef,
        args: Vec<Expr>,
    },
    Empty,
    Unsupported {
        construct: String,
    },
}
