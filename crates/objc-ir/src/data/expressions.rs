// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Target expressions with ownership markers

use super::types::{GeneratedIdentifier, PrimitiveType, TypeDescriptor};
use serde::{Deserialize, Serialize};

/// Ownership state of an expression's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    /// No ownership changes hands (locals, field reads, primitives)
    Borrowed,
    /// A +1 reference the consumer must balance
    Created,
    /// Retained into a strong slot
    Retained,
    /// Given up at this point
    Released,
    /// Balanced by the enclosing autorelease pool
    Autoreleased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    Bool(bool),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::PreInc | UnaryOperator::PostInc => "++",
            UnaryOperator::PreDec | UnaryOperator::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOperator::PostInc | UnaryOperator::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
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

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }
}

/// A rewritten expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeDescriptor,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Constant(ConstantValue),
    /// A local variable or parameter, already renamed
    Local(String),
    SelfRef,
    Super,
    /// A class object; `Foo` as a message receiver, `[Foo class]` elsewhere
    ClassRef(GeneratedIdentifier),
    /// `@protocol(Foo)`
    ProtocolRef(GeneratedIdentifier),
    /// Instance variable access (`self->name_`, `other->name_`)
    Ivar {
        target: Box<Expr>,
        name: String,
    },
    /// Static variable of a class (`Foo_bar`)
    StaticVar {
        class: GeneratedIdentifier,
        name: String,
    },
    /// `#define`d compile-time constant of a class (`Foo_BAR`)
    Macro {
        class: GeneratedIdentifier,
        name: String,
    },
    /// Objective-C message send; the selector's keywords are paired with `args`
    Message {
        receiver: Box<Expr>,
        selector: String,
        args: Vec<Expr>,
    },
    /// `[[Foo alloc] initWith...]`
    New {
        class: GeneratedIdentifier,
        selector: String,
        args: Vec<Expr>,
    },
    /// Plain C function call; `owner` is the class declaring it, `None`
    /// for runtime helpers
    Call {
        owner: Option<GeneratedIdentifier>,
        function: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Assignment into a slot that does not own its value
    Assign {
        op: Option<BinaryOperator>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Assignment into an owning slot: releases the prior occupant and
    /// retains the new value, or takes over a created value when `consume`
    StrongAssign {
        target: Box<Expr>,
        value: Box<Expr>,
        consume: bool,
    },
    /// Store into an object array slot with the same ownership rules
    ArraySet {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        consume: bool,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeDescriptor,
        expr: Box<Expr>,
    },
    Deref(Box<Expr>),
    AddressOf(Box<Expr>),
    /// C array literal for array initializers (`(int32_t[]){ 1, 2 }`, `(id[]){ a, b }`)
    CArrayLiteral {
        element: TypeDescriptor,
        values: Vec<Expr>,
    },
    Retain(Box<Expr>),
    Autorelease(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeDescriptor) -> Self {
        Self {
            kind,
            ty,
            ownership: Ownership::Borrowed,
        }
    }

    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn constant(value: ConstantValue, ty: TypeDescriptor) -> Self {
        Self::new(ExprKind::Constant(value), ty)
    }

    pub fn nil() -> Self {
        Self::constant(ConstantValue::Nil, TypeDescriptor::id())
    }

    pub fn int(value: i32) -> Self {
        Self::constant(ConstantValue::Int(value), TypeDescriptor::Primitive(PrimitiveType::Int32))
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(ConstantValue::Bool(value), TypeDescriptor::Primitive(PrimitiveType::Bool))
    }

    pub fn local(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self::new(ExprKind::Local(name.into()), ty)
    }

    pub fn self_ref(ty: TypeDescriptor) -> Self {
        Self::new(ExprKind::SelfRef, ty)
    }

    pub fn message(receiver: Expr, selector: impl Into<String>, args: Vec<Expr>, ty: TypeDescriptor) -> Self {
        Self::new(
            ExprKind::Message {
                receiver: Box::new(receiver),
                selector: selector.into(),
                args,
            },
            ty,
        )
    }

    /// Call to a runtime helper function
    pub fn call(function: impl Into<String>, args: Vec<Expr>, ty: TypeDescriptor) -> Self {
        Self::new(
            ExprKind::Call {
                owner: None,
                function: function.into(),
                args,
            },
            ty,
        )
    }

    /// Call to a function declared alongside a generated class
    pub fn class_call(
        owner: GeneratedIdentifier,
        function: impl Into<String>,
        args: Vec<Expr>,
        ty: TypeDescriptor,
    ) -> Self {
        Self::new(
            ExprKind::Call {
                owner: Some(owner),
                function: function.into(),
                args,
            },
            ty,
        )
    }

    pub fn ivar(target: Expr, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self::new(
            ExprKind::Ivar {
                target: Box::new(target),
                name: name.into(),
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOperator, lhs: Expr, rhs: Expr, ty: TypeDescriptor) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        let ty = target.ty.clone();
        Self::new(
            ExprKind::Assign {
                op: None,
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
        )
    }

    pub fn strong_assign(target: Expr, value: Expr) -> Self {
        let ty = target.ty.clone();
        Self::new(
            ExprKind::StrongAssign {
                target: Box::new(target),
                value: Box::new(value),
                consume: false,
            },
            ty,
        )
        .with_ownership(Ownership::Retained)
    }

    pub fn autorelease(self) -> Self {
        let ty = self.ty.clone();
        Self::new(ExprKind::Autorelease(Box::new(self)), ty).with_ownership(Ownership::Autoreleased)
    }

    pub fn is_created(&self) -> bool {
        self.ownership == Ownership::Created
    }

    /// Expressions that can never evaluate to nil
    pub fn is_trivially_non_nil(&self) -> bool {
        match &self.kind {
            ExprKind::SelfRef | ExprKind::Super | ExprKind::ClassRef(_) | ExprKind::New { .. } => true,
            ExprKind::Constant(ConstantValue::String(_)) => true,
            ExprKind::Retain(e) | ExprKind::Autorelease(e) => e.is_trivially_non_nil(),
            _ => self.is_created(),
        }
    }

    /// True when evaluating the expression twice is observably the same as once
    pub fn is_side_effect_free(&self) -> bool {
        match &self.kind {
            ExprKind::Constant(_)
            | ExprKind::Local(_)
            | ExprKind::SelfRef
            | ExprKind::Super
            | ExprKind::ClassRef(_)
            | ExprKind::ProtocolRef(_)
            | ExprKind::StaticVar { .. }
            | ExprKind::Macro { .. } => true,
            ExprKind::Ivar { target, .. } => target.is_side_effect_free(),
            ExprKind::Cast { expr, .. } => expr.is_side_effect_free(),
            _ => false,
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Direct subexpressions in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Constant(_)
            | ExprKind::Local(_)
            | ExprKind::SelfRef
            | ExprKind::Super
            | ExprKind::ClassRef(_)
            | ExprKind::ProtocolRef(_)
            | ExprKind::StaticVar { .. }
            | ExprKind::Macro { .. } => vec![],
            ExprKind::Ivar { target, .. } => vec![&**target],
            ExprKind::Message { receiver, args, .. } => {
                std::iter::once(&**receiver).chain(args.iter()).collect()
            }
            ExprKind::New { args, .. } | ExprKind::Call { args, .. } => args.iter().collect(),
            ExprKind::Unary { operand, .. } => vec![&**operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExprKind::Assign { target, value, .. } | ExprKind::StrongAssign { target, value, .. } => {
                vec![&**target, &**value]
            }
            ExprKind::ArraySet {
                array, index, value, ..
            } => vec![&**array, &**index, &**value],
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => vec![&**cond, &**then_expr, &**else_expr],
            ExprKind::Cast { expr, .. }
            | ExprKind::Deref(expr)
            | ExprKind::AddressOf(expr)
            | ExprKind::Retain(expr)
            | ExprKind::Autorelease(expr) => vec![&**expr],
            ExprKind::CArrayLiteral { values, .. } => values.iter().collect(),
        }
    }

    /// Mutable access to direct subexpressions
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            ExprKind::Constant(_)
            | ExprKind::Local(_)
            | ExprKind::SelfRef
            | ExprKind::Super
            | ExprKind::ClassRef(_)
            | ExprKind::ProtocolRef(_)
            | ExprKind::StaticVar { .. }
            | ExprKind::Macro { .. } => vec![],
            ExprKind::Ivar { target, .. } => vec![&mut **target],
            ExprKind::Message { receiver, args, .. } => {
                std::iter::once(&mut **receiver).chain(args.iter_mut()).collect()
            }
            ExprKind::New { args, .. } | ExprKind::Call { args, .. } => args.iter_mut().collect(),
            ExprKind::Unary { operand, .. } => vec![&mut **operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![&mut **lhs, &mut **rhs],
            ExprKind::Assign { target, value, .. } | ExprKind::StrongAssign { target, value, .. } => {
                vec![&mut **target, &mut **value]
            }
            ExprKind::ArraySet {
                array, index, value, ..
            } => vec![&mut **array, &mut **index, &mut **value],
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => vec![&mut **cond, &mut **then_expr, &mut **else_expr],
            ExprKind::Cast { expr, .. }
            | ExprKind::Deref(expr)
            | ExprKind::AddressOf(expr)
            | ExprKind::Retain(expr)
            | ExprKind::Autorelease(expr) => vec![&mut **expr],
            ExprKind::CArrayLiteral { values, .. } => values.iter_mut().collect(),
        }
    }

    /// Pre-order walk over this expression and every nested one
    pub fn for_each(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        for child in self.children() {
            child.for_each(f);
        }
    }

    /// True if `pred` holds for this expression or any nested one
    pub fn any(&self, pred: &mut impl FnMut(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.any(pred))
    }

    pub fn mentions_local(&self, name: &str) -> bool {
        self.any(&mut |e| matches!(&e.kind, ExprKind::Local(n) if n == name))
    }
}
