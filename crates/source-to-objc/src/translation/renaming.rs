// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Simultaneous renaming of type names through a subtree

use source_model::visit::{walk_expr_mut, walk_stmt_mut, walk_type_members_mut, VisitorMut};
use source_model::{
    Expr, ExprKind, FieldRef, Member, MethodRef, QualifiedName, SourceType, Stmt, StmtKind, TypeDeclaration,
    WildcardBound,
};

/// Old name to new name. A name nested in an old name (`Old$Inner`) follows
/// it (`New$Inner`); the longest matching old name wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct Renames {
    pairs: Vec<(QualifiedName, QualifiedName)>,
}

impl Renames {
    pub fn single(from: QualifiedName, to: QualifiedName) -> Self {
        Self { pairs: vec![(from, to)] }
    }

    pub fn push(&mut self, from: QualifiedName, to: QualifiedName) {
        if from != to {
            self.pairs.push((from, to));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn name(&self, name: &mut QualifiedName) {
        let matched = self
            .pairs
            .iter()
            .filter(|(from, _)| from.package == name.package && name.types.starts_with(&from.types))
            .max_by_key(|(from, _)| from.types.len());
        if let Some((from, to)) = matched {
            let rest = name.types.split_off(from.types.len());
            name.types = to.types.iter().cloned().chain(rest).collect();
        }
    }

    pub fn ty(&self, ty: &mut SourceType) {
        match ty {
            SourceType::Class { name, type_args } => {
                self.name(name);
                type_args.iter_mut().for_each(|a| self.ty(a));
            }
            SourceType::Array(element) => self.ty(element),
            SourceType::TypeVariable { bounds, .. } => bounds.iter_mut().for_each(|b| self.ty(b)),
            SourceType::Wildcard(WildcardBound::Extends(b) | WildcardBound::Super(b)) => self.ty(b),
            _ => {}
        }
    }

    pub fn method(&self, method: &mut MethodRef) {
        self.name(&mut method.owner);
        method.params.iter_mut().for_each(|p| self.ty(p));
        self.ty(&mut method.return_type);
    }

    fn field(&self, field: &mut FieldRef) {
        self.name(&mut field.owner);
        self.ty(&mut field.ty);
    }

    pub fn block(&self, block: &mut [Stmt]) {
        if !self.is_empty() {
            let mut this = self;
            for stmt in block {
                this.visit_stmt_mut(stmt);
            }
        }
    }

    pub fn declaration(&self, decl: &mut TypeDeclaration) {
        if self.is_empty() {
            return;
        }
        let mut this = self;
        this.visit_type_body_mut(decl);
    }
}

impl VisitorMut for &Renames {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        self.ty(&mut expr.ty);
        if let Some(to) = &mut expr.converted_to {
            self.ty(to);
        }
        match &mut expr.kind {
            ExprKind::QualifiedThis(name) => self.name(name),
            ExprKind::Field { field, .. } => self.field(field),
            ExprKind::MethodCall { method, .. } => self.method(method),
            ExprKind::New { class, ctor, .. } => {
                self.name(class);
                self.method(ctor);
            }
            ExprKind::NewArray { element, .. } => self.ty(element),
            ExprKind::Cast { ty, .. } | ExprKind::InstanceOf { ty, .. } | ExprKind::ClassLiteral(ty) => self.ty(ty),
            ExprKind::Lambda { params, functional, .. } => {
                params.iter_mut().for_each(|(_, ty)| self.ty(ty));
                self.method(functional);
            }
            ExprKind::MethodReference { method, functional, .. } => {
                self.method(method);
                self.method(functional);
            }
            _ => {}
        }
        walk_expr_mut(self, expr);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::LocalVar { ty, .. } | StmtKind::ForEach { var_ty: ty, .. } => self.ty(ty),
            StmtKind::Try { resources, catches, .. } => {
                for r in resources {
                    self.ty(&mut r.ty);
                    self.method(&mut r.close);
                }
                for c in catches {
                    c.types.iter_mut().for_each(|t| self.ty(t));
                }
            }
            StmtKind::SuperConstructorCall { ctor, .. } | StmtKind::ThisConstructorCall { ctor, .. } => {
                self.method(ctor)
            }
            _ => {}
        }
        walk_stmt_mut(self, stmt);
    }

    fn visit_type_body_mut(&mut self, decl: &mut TypeDeclaration) {
        self.name(&mut decl.name);
        if let Some(s) = &mut decl.superclass {
            self.ty(s);
        }
        decl.interfaces.iter_mut().for_each(|i| self.ty(i));
        for p in &mut decl.type_params {
            p.bounds.iter_mut().for_each(|b| self.ty(b));
        }
        for constant in &mut decl.enum_constants {
            self.method(&mut constant.constructor);
            if let Some(body) = &mut constant.body {
                self.visit_type_body_mut(body);
            }
        }
        for member in &mut decl.members {
            match member {
                Member::Field(f) => self.ty(&mut f.ty),
                Member::Method(m) => {
                    m.params.iter_mut().for_each(|p| self.ty(&mut p.ty));
                    self.ty(&mut m.return_type);
                    m.throws.iter_mut().for_each(|t| self.ty(t));
                    m.overrides.iter_mut().for_each(|o| self.method(o));
                    for p in &mut m.type_params {
                        p.bounds.iter_mut().for_each(|b| self.ty(b));
                    }
                }
                Member::Type(nested) => self.visit_type_body_mut(nested),
                Member::Initializer(_) => {}
            }
        }
        walk_type_members_mut(self, decl);
    }
}
