// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Read-only traversal of executable code
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to continue into children. Nested type bodies
//! (anonymous classes, local classes) are visited through `visit_type_body`,
//! which does not descend by default.

use crate::ast::TypeDeclaration;
use crate::code::{Expr, ExprKind, LambdaBody, Stmt, StmtKind};

pub trait Visitor {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_type_body(&mut self, _decl: &TypeDeclaration) {}
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &[Stmt]) {
    for stmt in block {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(block) => walk_block(v, block),
        StmtKind::LocalVar { init, .. } => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        StmtKind::LocalClass(decl) => v.visit_type_body(decl),
        StmtKind::Expr(e) | StmtKind::Throw(e) => v.visit_expr(e),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            walk_block(v, init);
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            for e in update {
                v.visit_expr(e);
            }
            v.visit_stmt(body);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for r in resources {
                v.visit_expr(&r.init);
            }
            walk_block(v, body);
            for c in catches {
                walk_block(v, &c.body);
            }
            if let Some(finally) = finally {
                walk_block(v, finally);
            }
        }
        StmtKind::Switch { selector, cases } => {
            v.visit_expr(selector);
            for case in cases {
                walk_block(v, &case.body);
            }
        }
        StmtKind::Synchronized { lock, body } => {
            v.visit_expr(lock);
            walk_block(v, body);
        }
        StmtKind::Assert { cond, message } => {
            v.visit_expr(cond);
            if let Some(message) = message {
                v.visit_expr(message);
            }
        }
        StmtKind::SuperConstructorCall { args, outer, .. } => {
            if let Some(outer) = outer {
                v.visit_expr(outer);
            }
            for a in args {
                v.visit_expr(a);
            }
        }
        StmtKind::ThisConstructorCall { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Empty
        | StmtKind::Unsupported { .. } => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Field { target, .. } => {
            if let Some(target) = target {
                v.visit_expr(target);
            }
        }
        ExprKind::MethodCall { target, args, .. } => {
            if let Some(target) = target {
                v.visit_expr(target);
            }
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::New {
            args, outer, body, ..
        } => {
            if let Some(outer) = outer {
                v.visit_expr(outer);
            }
            for a in args {
                v.visit_expr(a);
            }
            if let Some(body) = body {
                v.visit_type_body(body);
            }
        }
        ExprKind::NewArray {
            dimensions,
            initializer,
            ..
        } => {
            for d in dimensions {
                v.visit_expr(d);
            }
            for e in initializer.iter().flatten() {
                v.visit_expr(e);
            }
        }
        ExprKind::ArrayAccess { array, index } => {
            v.visit_expr(array);
            v.visit_expr(index);
        }
        ExprKind::ArrayLength(e)
        | ExprKind::Unary { operand: e, .. }
        | ExprKind::Cast { expr: e, .. }
        | ExprKind::InstanceOf { expr: e, .. } => v.visit_expr(e),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        ExprKind::Lambda { body, .. } => match body {
            LambdaBody::Expr(e) => v.visit_expr(e),
            LambdaBody::Block(block) => walk_block(v, block),
        },
        ExprKind::MethodReference { target, .. } => {
            if let Some(target) = target {
                v.visit_expr(target);
            }
        }
        ExprKind::Literal(_)
        | ExprKind::Local(_)
        | ExprKind::This
        | ExprKind::QualifiedThis(_)
        | ExprKind::ClassLiteral(_)
        | ExprKind::Unsupported { .. } => {}
    }
}

/// Walk every member body of a type declaration: field initializers,
/// initializer blocks, method bodies and enum constant arguments.
pub fn walk_type_members<V: Visitor + ?Sized>(v: &mut V, decl: &TypeDeclaration) {
    use crate::ast::Member;
    for constant in &decl.enum_constants {
        for a in &constant.args {
            v.visit_expr(a);
        }
    }
    for member in &decl.members {
        match member {
            Member::Field(f) => {
                if let Some(init) = &f.initializer {
                    v.visit_expr(init);
                }
            }
            Member::Method(m) => {
                if let Some(body) = &m.body {
                    walk_block(v, body);
                }
            }
            Member::Initializer(i) => walk_block(v, &i.body),
            Member::Type(_) => {}
        }
    }
}

/// Call `f` on every type declaration in `types`, pre-order: each
/// declaration, then its enum constant bodies, member types and the local and
/// anonymous classes of its member bodies, in source order.
pub fn for_each_declaration(types: &[TypeDeclaration], f: &mut dyn FnMut(&TypeDeclaration)) {
    struct Nested<'f> {
        f: &'f mut dyn FnMut(&TypeDeclaration),
    }

    impl Visitor for Nested<'_> {
        fn visit_type_body(&mut self, decl: &TypeDeclaration) {
            visit_declaration(decl, self);
        }
    }

    fn visit_declaration(decl: &TypeDeclaration, v: &mut Nested<'_>) {
        use crate::ast::Member;
        (v.f)(decl);
        for constant in &decl.enum_constants {
            if let Some(body) = &constant.body {
                visit_declaration(body, v);
            }
        }
        for member in &decl.members {
            if let Member::Type(nested) = member {
                visit_declaration(nested, v);
            }
        }
        walk_type_members(v, decl);
    }

    let mut v = Nested { f };
    for decl in types {
        visit_declaration(decl, &mut v);
    }
}

/// In-place rewriting traversal, the mutable twin of [`Visitor`].
///
/// Unlike the read-only walk, `walk_expr_mut` descends into lambda bodies and
/// `walk_stmt_mut` into the statement lists of every construct, so rewriting
/// passes see all code of a member body. Nested type bodies are again left to
/// `visit_type_body_mut`.
pub trait VisitorMut {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_type_body_mut(&mut self, _decl: &mut TypeDeclaration) {}
}

pub fn walk_block_mut<V: VisitorMut + ?Sized>(v: &mut V, block: &mut [Stmt]) {
    for stmt in block {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Block(block) => walk_block_mut(v, block),
        StmtKind::LocalVar { init, .. } => {
            if let Some(init) = init {
                v.visit_expr_mut(init);
            }
        }
        StmtKind::LocalClass(decl) => v.visit_type_body_mut(decl),
        StmtKind::Expr(e) | StmtKind::Throw(e) => v.visit_expr_mut(e),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr_mut(cond);
            v.visit_stmt_mut(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt_mut(else_branch);
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            v.visit_expr_mut(cond);
            v.visit_stmt_mut(body);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            walk_block_mut(v, init);
            if let Some(cond) = cond {
                v.visit_expr_mut(cond);
            }
            for e in update {
                v.visit_expr_mut(e);
            }
            v.visit_stmt_mut(body);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            v.visit_expr_mut(iterable);
            v.visit_stmt_mut(body);
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt_mut(body),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr_mut(value);
            }
        }
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for r in resources {
                v.visit_expr_mut(&mut r.init);
            }
            walk_block_mut(v, body);
            for c in catches {
                walk_block_mut(v, &mut c.body);
            }
            if let Some(finally) = finally {
                walk_block_mut(v, finally);
            }
        }
        StmtKind::Switch { selector, cases } => {
            v.visit_expr_mut(selector);
            for case in cases {
                walk_block_mut(v, &mut case.body);
            }
        }
        StmtKind::Synchronized { lock, body } => {
            v.visit_expr_mut(lock);
            walk_block_mut(v, body);
        }
        StmtKind::Assert { cond, message } => {
            v.visit_expr_mut(cond);
            if let Some(message) = message {
                v.visit_expr_mut(message);
            }
        }
        StmtKind::SuperConstructorCall { args, outer, .. } => {
            if let Some(outer) = outer {
                v.visit_expr_mut(outer);
            }
            for a in args {
                v.visit_expr_mut(a);
            }
        }
        StmtKind::ThisConstructorCall { args, .. } => {
            for a in args {
                v.visit_expr_mut(a);
            }
        }
        StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Empty
        | StmtKind::Unsupported { .. } => {}
    }
}

pub fn walk_expr_mut<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Field { target, .. } => {
            if let Some(target) = target {
                v.visit_expr_mut(target);
            }
        }
        ExprKind::MethodCall { target, args, .. } => {
            if let Some(target) = target {
                v.visit_expr_mut(target);
            }
            for a in args {
                v.visit_expr_mut(a);
            }
        }
        ExprKind::New {
            args, outer, body, ..
        } => {
            if let Some(outer) = outer {
                v.visit_expr_mut(outer);
            }
            for a in args {
                v.visit_expr_mut(a);
            }
            if let Some(body) = body {
                v.visit_type_body_mut(body);
            }
        }
        ExprKind::NewArray {
            dimensions,
            initializer,
            ..
        } => {
            for d in dimensions {
                v.visit_expr_mut(d);
            }
            for e in initializer.iter_mut().flatten() {
                v.visit_expr_mut(e);
            }
        }
        ExprKind::ArrayAccess { array, index } => {
            v.visit_expr_mut(array);
            v.visit_expr_mut(index);
        }
        ExprKind::ArrayLength(e)
        | ExprKind::Unary { operand: e, .. }
        | ExprKind::Cast { expr: e, .. }
        | ExprKind::InstanceOf { expr: e, .. } => v.visit_expr_mut(e),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr_mut(lhs);
            v.visit_expr_mut(rhs);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr_mut(target);
            v.visit_expr_mut(value);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr_mut(cond);
            v.visit_expr_mut(then_expr);
            v.visit_expr_mut(else_expr);
        }
        ExprKind::Lambda { body, .. } => match body {
            LambdaBody::Expr(e) => v.visit_expr_mut(e),
            LambdaBody::Block(block) => walk_block_mut(v, block),
        },
        ExprKind::MethodReference { target, .. } => {
            if let Some(target) = target {
                v.visit_expr_mut(target);
            }
        }
        ExprKind::Literal(_)
        | ExprKind::Local(_)
        | ExprKind::This
        | ExprKind::QualifiedThis(_)
        | ExprKind::ClassLiteral(_)
        | ExprKind::Unsupported { .. } => {}
    }
}

/// Mutable counterpart of [`walk_type_members`]
pub fn walk_type_members_mut<V: VisitorMut + ?Sized>(v: &mut V, decl: &mut TypeDeclaration) {
    use crate::ast::Member;
    for constant in &mut decl.enum_constants {
        for a in &mut constant.args {
            v.visit_expr_mut(a);
        }
    }
    for member in &mut decl.members {
        match member {
            Member::Field(f) => {
                if let Some(init) = &mut f.initializer {
                    v.visit_expr_mut(init);
                }
            }
            Member::Method(m) => {
                if let Some(body) = &mut m.body {
                    walk_block_mut(v, body);
                }
            }
            Member::Initializer(i) => walk_block_mut(v, &mut i.body),
            Member::Type(_) => {}
        }
    }
}
