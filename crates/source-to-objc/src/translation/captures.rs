// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Captured locals
//!
//! A local class or anonymous class may read locals of the member body it is
//! declared in. Each such local becomes a `val$x` field, assigned from an
//! extra `capture$x` constructor parameter before the superclass constructor
//! runs, and every creation of the class passes the local along. Runs after
//! naming, innermost classes first, so a class also forwards what its own
//! nested classes capture.

use super::synthetic::{assign, field_of, param, synthetic_field, VarAllocator};
use crate::naming::{capture_field_name, capture_param_name};
use source_model::visit::{
    walk_block, walk_block_mut, walk_expr, walk_expr_mut, walk_stmt, walk_stmt_mut, walk_type_members, walk_type_members_mut,
    Visitor, VisitorMut,
};
use source_model::{Expr, ExprKind, Member, QualifiedName, SourceType, Stmt, StmtKind, TypeDeclaration, VarRef};
use std::collections::{BTreeMap, BTreeSet};

type Captured = Vec<(VarRef, SourceType)>;

pub(super) struct Captures<'v> {
    vars: &'v mut VarAllocator,
}

impl<'v> Captures<'v> {
    pub fn new(vars: &'v mut VarAllocator) -> Self {
        Self { vars }
    }

    pub fn declaration(&mut self, decl: &mut TypeDeclaration) {
        for constant in &mut decl.enum_constants {
            for arg in &mut constant.args {
                self.expr(arg);
            }
            if let Some(body) = &mut constant.body {
                self.declaration(body);
            }
        }
        for member in &mut decl.members {
            match member {
                Member::Type(nested) => self.declaration(nested),
                Member::Field(f) => {
                    if let Some(init) = &mut f.initializer {
                        self.expr(init);
                    }
                }
                Member::Method(m) => {
                    if let Some(body) = &mut m.body {
                        self.block(body);
                    }
                }
                Member::Initializer(i) => self.block(&mut i.body),
            }
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        let mut walker = BodyCaptures {
            pass: self,
            locals: BTreeMap::new(),
        };
        walker.visit_expr_mut(expr);
    }

    fn block(&mut self, body: &mut [Stmt]) {
        let locals = local_class_captures(body);
        let mut walker = BodyCaptures { pass: self, locals };
        for stmt in body.iter_mut() {
            walker.visit_stmt_mut(stmt);
        }
    }
}

/// What each local class of a body captures. Creations of a local class may
/// appear anywhere in the body, including inside other classes, so their
/// argument lists are extended here before the body is walked.
fn local_class_captures(body: &mut [Stmt]) -> BTreeMap<QualifiedName, Captured> {
    let mut names = LocalClasses::default();
    walk_block(&mut names, body);
    let mut result = BTreeMap::new();
    for (name, captured) in names.found {
        if captured.is_empty() {
            continue;
        }
        let mut sites = CreationSites {
            class: &name,
            captured: &captured,
        };
        walk_block_mut(&mut sites, body);
        result.insert(name, captured);
    }
    result
}

#[derive(Default)]
struct LocalClasses {
    found: Vec<(QualifiedName, Captured)>,
}

impl Visitor for LocalClasses {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::LocalClass(decl) = &stmt.kind {
            self.found.push((decl.name.clone(), free_locals(decl)));
        }
        walk_stmt(self, stmt);
    }
}

/// Appends the captured locals to every creation of one local class
struct CreationSites<'a> {
    class: &'a QualifiedName,
    captured: &'a Captured,
}

impl CreationSites<'_> {
    fn locals(&self) -> impl Iterator<Item = Expr> + '_ {
        self.captured.iter().map(|(v, t)| Expr::local(v.clone(), t.clone()))
    }

    fn types(&self) -> impl Iterator<Item = SourceType> + '_ {
        self.captured.iter().map(|(_, t)| t.clone())
    }
}

impl VisitorMut for CreationSites<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if let ExprKind::New { class, ctor, args, .. } = &mut expr.kind {
            if class == self.class {
                args.extend(self.locals());
                ctor.params.extend(self.types());
            }
        }
        walk_expr_mut(self, expr);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if let StmtKind::SuperConstructorCall { ctor, args, .. } = &mut stmt.kind {
            if &ctor.owner == self.class {
                args.extend(self.locals());
                ctor.params.extend(self.types());
            }
        }
        walk_stmt_mut(self, stmt);
    }

    fn visit_type_body_mut(&mut self, decl: &mut TypeDeclaration) {
        walk_declaration_mut(self, decl);
    }
}

fn walk_declaration_mut<V: VisitorMut>(v: &mut V, decl: &mut TypeDeclaration) {
    for constant in &mut decl.enum_constants {
        if let Some(body) = &mut constant.body {
            v.visit_type_body_mut(body);
        }
    }
    for member in &mut decl.members {
        if let Member::Type(nested) = member {
            v.visit_type_body_mut(nested);
        }
    }
    walk_type_members_mut(v, decl);
}

struct BodyCaptures<'p, 'v> {
    pass: &'p mut Captures<'v>,
    locals: BTreeMap<QualifiedName, Captured>,
}

impl VisitorMut for BodyCaptures<'_, '_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if let ExprKind::New {
            ctor,
            args,
            body: Some(body),
            ..
        } = &mut expr.kind
        {
            for arg in args.iter_mut() {
                self.visit_expr_mut(arg);
            }
            self.pass.declaration(body);
            let captured = free_locals(body);
            if !captured.is_empty() {
                add_captures(body, &captured, self.pass.vars);
                args.extend(captured.iter().map(|(v, t)| Expr::local(v.clone(), t.clone())));
                ctor.params.extend(captured.iter().map(|(_, t)| t.clone()));
            }
            return;
        }
        walk_expr_mut(self, expr);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if let StmtKind::LocalClass(decl) = &mut stmt.kind {
            self.pass.declaration(decl);
            if let Some(captured) = self.locals.get(&decl.name) {
                add_captures(decl, captured, self.pass.vars);
            }
            return;
        }
        walk_stmt_mut(self, stmt);
    }
}

/// Locals a class body reads but does not declare, ordered by declaration
fn free_locals(decl: &TypeDeclaration) -> Captured {
    #[derive(Default)]
    struct Scan {
        used: BTreeMap<u32, (VarRef, SourceType)>,
        declared: BTreeSet<u32>,
    }

    impl Scan {
        fn declaration(&mut self, decl: &TypeDeclaration) {
            for constant in &decl.enum_constants {
                if let Some(body) = &constant.body {
                    self.declaration(body);
                }
            }
            for member in &decl.members {
                match member {
                    Member::Type(nested) => self.declaration(nested),
                    Member::Method(m) => self.declared.extend(m.params.iter().map(|p| p.var.id)),
                    _ => {}
                }
            }
            walk_type_members(self, decl);
        }
    }

    impl Visitor for Scan {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            match &stmt.kind {
                StmtKind::LocalVar { var, .. } | StmtKind::ForEach { var, .. } => {
                    self.declared.insert(var.id);
                }
                StmtKind::Try { resources, catches, .. } => {
                    self.declared.extend(resources.iter().map(|r| r.var.id));
                    self.declared.extend(catches.iter().map(|c| c.var.id));
                }
                _ => {}
            }
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Expr) {
            match &expr.kind {
                ExprKind::Local(var) => {
                    self.used.entry(var.id).or_insert_with(|| (var.clone(), expr.ty.clone()));
                }
                ExprKind::Lambda { params, .. } => self.declared.extend(params.iter().map(|(v, _)| v.id)),
                _ => {}
            }
            walk_expr(self, expr);
        }

        fn visit_type_body(&mut self, decl: &TypeDeclaration) {
            self.declaration(decl);
        }
    }

    let mut scan = Scan::default();
    scan.declaration(decl);
    scan.used
        .into_iter()
        .filter(|(id, _)| !scan.declared.contains(id))
        .map(|(_, captured)| captured)
        .collect()
}

/// Give a class fields for its captured locals and route them through every
/// constructor. Constructors delegating to `this(...)` pass them on; the
/// others assign the fields first.
fn add_captures(decl: &mut TypeDeclaration, captured: &Captured, vars: &mut VarAllocator) {
    let owner = decl.name.clone();
    for (var, ty) in captured {
        decl.members.push(synthetic_field(capture_field_name(&var.name), ty.clone()));
    }
    for member in &mut decl.members {
        let Member::Method(m) = member else {
            continue;
        };
        if !m.is_constructor() {
            continue;
        }
        let incoming: Vec<(VarRef, SourceType)> = captured
            .iter()
            .map(|(var, ty)| (vars.fresh(&capture_param_name(&var.name)), ty.clone()))
            .collect();
        m.params.extend(incoming.iter().map(|(v, t)| param(v.clone(), t.clone())));
        let body = m.body.get_or_insert_with(Vec::new);
        match body.first_mut().map(|s| &mut s.kind) {
            Some(StmtKind::ThisConstructorCall { ctor, args }) => {
                args.extend(incoming.iter().map(|(v, t)| Expr::local(v.clone(), t.clone())));
                ctor.params.extend(incoming.iter().map(|(_, t)| t.clone()));
            }
            _ => {
                let assigns: Vec<Stmt> = captured
                    .iter()
                    .zip(&incoming)
                    .map(|((var, ty), (p, _))| {
                        assign(field_of(&owner, &capture_field_name(&var.name), ty), Expr::local(p.clone(), ty.clone()))
                    })
                    .collect();
                body.splice(0..0, assigns);
            }
        }
    }

    let mut reads = CapturedReads {
        owner: &owner,
        captured: captured.iter().map(|(v, t)| (v.id, (v.name.clone(), t.clone()))).collect(),
    };
    walk_type_members_mut(&mut reads, decl);
}

/// Captured locals in a class's own member bodies become field reads
struct CapturedReads<'a> {
    owner: &'a QualifiedName,
    captured: BTreeMap<u32, (String, SourceType)>,
}

impl VisitorMut for CapturedReads<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if let ExprKind::Local(var) = &expr.kind {
            if let Some((name, ty)) = self.captured.get(&var.id) {
                let field = field_of(self.owner, &capture_field_name(name), ty);
                expr.kind = field.kind;
                return;
            }
        }
        walk_expr_mut(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::super::synthetic::tests::{class_with_method, name, runnable, unit_of};
    use super::super::synthetic::{desugar_unit, method};
    use super::*;
    use source_model::{LambdaBody, MethodKind, MethodRef, TypeKind};

    fn local_x() -> (Stmt, Expr) {
        let x = VarRef::new(1, "x");
        let decl = Stmt::new(StmtKind::LocalVar {
            var: x.clone(),
            ty: SourceType::int(),
            init: Some(Expr::literal(source_model::Literal::Int(3))),
        });
        (decl, Expr::local(x, SourceType::int()))
    }

    #[test]
    fn anonymous_classes_capture_locals_before_the_super_call() {
        let (decl, read) = local_x();
        let mut body = TypeDeclaration::new(name("a.Outer$5"), TypeKind::Class);
        body.members.push(Member::Method(method("run", MethodKind::Method, vec![], SourceType::Void, vec![Stmt::expr(read)])));
        let anon = Expr::new(
            ExprKind::New {
                class: name("a.Outer$5"),
                ctor: MethodRef::constructor(name("java.lang.Object"), vec![]),
                args: vec![],
                outer: None,
                body: Some(Box::new(body)),
            },
            SourceType::class("a.Outer$5"),
        );
        let mut unit = unit_of(class_with_method("a.Outer", vec![decl, Stmt::expr(anon)], true));
        desugar_unit(&mut unit);

        let run = unit.types[0].methods().next().unwrap().body.as_ref().unwrap();
        let StmtKind::Expr(created) = &run[1].kind else { panic!("expression expected") };
        let ExprKind::New { args, ctor, body: Some(class), .. } = &created.kind else { panic!("creation expected") };
        assert_eq!(args.len(), 1);
        assert_eq!(ctor.params, vec![SourceType::int()]);
        assert!(class.fields().any(|f| f.name == "val$x" && f.modifiers.has(source_model::Modifiers::SYNTHETIC)));

        let ctor = class.constructors().next().unwrap();
        assert_eq!(ctor.params.last().unwrap().var.name, "capture$x");
        let ctor_body = ctor.body.as_ref().unwrap();
        assert!(matches!(ctor_body[0].kind, StmtKind::Expr(_)));
        assert!(matches!(ctor_body[1].kind, StmtKind::SuperConstructorCall { .. }));

        let method_body = class.methods().find(|m| m.name == "run").unwrap().body.as_ref().unwrap();
        let StmtKind::Expr(read) = &method_body[0].kind else { panic!("expression expected") };
        assert!(matches!(&read.kind, ExprKind::Field { field, .. } if field.name == "val$x"));
    }

    #[test]
    fn lambdas_capture_through_their_class() {
        let (decl, read) = local_x();
        let lambda = Expr::new(
            ExprKind::Lambda {
                params: vec![],
                body: LambdaBody::Block(vec![Stmt::expr(read)]),
                functional: runnable(),
            },
            SourceType::interface("java.lang.Runnable"),
        );
        let mut unit = unit_of(class_with_method("a.Outer", vec![decl, Stmt::expr(lambda)], true));
        desugar_unit(&mut unit);
        let run = unit.types[0].methods().next().unwrap().body.as_ref().unwrap();
        let StmtKind::Expr(created) = &run[1].kind else { panic!("expression expected") };
        let ExprKind::New { args, body: Some(class), .. } = &created.kind else { panic!("creation expected") };
        assert!(matches!(&args[0].kind, ExprKind::Local(v) if v.name == "x"));
        assert!(class.fields().any(|f| f.name == "val$x"));
    }

    #[test]
    fn local_class_creations_pass_captured_locals() {
        let (decl, read) = local_x();
        let mut local = TypeDeclaration::new(name("a.Outer$1Local"), TypeKind::Class);
        local.members.push(Member::Method(method("get", MethodKind::Method, vec![], SourceType::int(), vec![Stmt::ret(Some(read))])));
        let create = Expr::new(
            ExprKind::New {
                class: name("a.Outer$1Local"),
                ctor: MethodRef::constructor(name("a.Outer$1Local"), vec![]),
                args: vec![],
                outer: None,
                body: None,
            },
            SourceType::class("a.Outer$1Local"),
        );
        let statements = vec![decl, Stmt::new(StmtKind::LocalClass(Box::new(local))), Stmt::expr(create)];
        let mut unit = unit_of(class_with_method("a.Outer", statements, false));
        desugar_unit(&mut unit);
        let run = unit.types[0].methods().next().unwrap().body.as_ref().unwrap();
        let StmtKind::LocalClass(local) = &run[1].kind else { panic!("local class expected") };
        assert_eq!(local.name, name("a.Outer$1Local"));
        assert!(!local.modifiers.is_static());
        let ctor = local.constructors().next().unwrap();
        assert_eq!(ctor.params.len(), 1);
        let StmtKind::Expr(created) = &run[2].kind else { panic!("expression expected") };
        let ExprKind::New { args, ctor, .. } = &created.kind else { panic!("creation expected") };
        assert_eq!(args.len(), 1);
        assert_eq!(ctor.params, vec![SourceType::int()]);
    }
}
