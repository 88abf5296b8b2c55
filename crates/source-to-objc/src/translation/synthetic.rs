// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Desugaring of nested code into plain classes
//!
//! Runs on a copy of every unit before scanning, in two passes:
//!
//! 1. naming (top-down): lambdas and method references become anonymous
//!    classes, anonymous and local classes get their final names under the
//!    innermost enclosing class, enum constant bodies become subclasses of
//!    their enum, and every such class gets explicit constructors;
//! 2. captures (bottom-up, see `captures`): locals used by a class body but
//!    declared outside it become fields initialized through extra
//!    constructor parameters.
//!
//! Afterwards the rewriters only ever see named classes with explicit
//! constructors, and an enclosing instance is the only implicit state.

use super::captures::Captures;
use super::lambdas;
use super::renaming::Renames;
use source_model::visit::{walk_block_mut, walk_expr, walk_expr_mut, walk_stmt, walk_stmt_mut, Visitor, VisitorMut};
use source_model::{
    CompilationUnit, EnumConstant, Expr, ExprKind, FieldRef, Literal, Member, MethodDeclaration, MethodKind,
    MethodRef, Modifiers, NameKind, Parameter, QualifiedName, SourceType, Stmt, StmtKind, TypeDeclaration,
    TypeKind, VarRef,
};
use std::collections::BTreeMap;

/// Fresh variables for synthesized parameters. Ids count down from the top
/// of the range so they never meet the front-end's.
#[derive(Debug)]
pub(crate) struct VarAllocator {
    next: u32,
}

impl VarAllocator {
    pub fn new() -> Self {
        Self { next: u32::MAX }
    }

    pub fn fresh(&mut self, name: &str) -> VarRef {
        let var = VarRef::new(self.next, name);
        self.next -= 1;
        var
    }
}

/// Desugar one unit in place
pub fn desugar_unit(unit: &mut CompilationUnit) {
    let mut vars = VarAllocator::new();
    let mut namer = Namer {
        vars: &mut vars,
        anonymous: BTreeMap::new(),
        lambdas: BTreeMap::new(),
    };
    for decl in &mut unit.types {
        namer.declaration(decl);
    }
    let mut captures = Captures::new(&mut vars);
    for decl in &mut unit.types {
        captures.declaration(decl);
    }
}

// ============================================================================
// Source tree builders shared by the desugaring passes
// ============================================================================

pub(super) fn this_of(class: &QualifiedName) -> Expr {
    Expr::this(SourceType::named(class.clone()))
}

pub(super) fn field_of(class: &QualifiedName, name: &str, ty: &SourceType) -> Expr {
    Expr::new(
        ExprKind::Field {
            target: Some(Box::new(this_of(class))),
            field: FieldRef {
                owner: class.clone(),
                name: name.to_string(),
                ty: ty.clone(),
                is_static: false,
                constant_value: None,
            },
        },
        ty.clone(),
    )
}

pub(super) fn assign(target: Expr, value: Expr) -> Stmt {
    let ty = target.ty.clone();
    Stmt::expr(Expr::new(
        ExprKind::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        },
        ty,
    ))
}

pub(super) fn synthetic_field(name: String, ty: SourceType) -> Member {
    Member::Field(source_model::FieldDeclaration {
        name,
        ty,
        modifiers: Modifiers::new(Modifiers::PRIVATE | Modifiers::FINAL | Modifiers::SYNTHETIC),
        initializer: None,
        constant_value: None,
        annotations: vec![],
        location: Default::default(),
    })
}

pub(super) fn method(name: &str, kind: MethodKind, params: Vec<Parameter>, return_type: SourceType, body: Vec<Stmt>) -> MethodDeclaration {
    MethodDeclaration {
        name: name.to_string(),
        kind,
        modifiers: Modifiers::default(),
        type_params: vec![],
        params,
        return_type,
        throws: vec![],
        body: Some(body),
        native_code: None,
        overrides: vec![],
        annotations: vec![],
        default_value: None,
        location: Default::default(),
    }
}

pub(super) fn param(var: VarRef, ty: SourceType) -> Parameter {
    Parameter {
        var,
        ty,
        annotations: vec![],
    }
}

/// A constructor whose parameters are handed on to `super`
pub(super) fn forwarding_constructor(
    super_ctor: &MethodRef,
    outer: Option<(VarRef, SourceType)>,
    vars: &mut VarAllocator,
) -> MethodDeclaration {
    let forwarded: Vec<(VarRef, SourceType)> = super_ctor
        .params
        .iter()
        .enumerate()
        .map(|(i, ty)| (vars.fresh(&format!("arg${}", i)), ty.clone()))
        .collect();
    let call = Stmt::new(StmtKind::SuperConstructorCall {
        ctor: super_ctor.clone(),
        args: forwarded.iter().map(|(v, t)| Expr::local(v.clone(), t.clone())).collect(),
        outer: outer.as_ref().map(|(v, t)| Expr::local(v.clone(), t.clone())),
    });
    let params = outer.into_iter().chain(forwarded).map(|(v, t)| param(v, t)).collect();
    let mut ctor = method("<init>", MethodKind::Constructor, params, SourceType::Void, vec![call]);
    if super_ctor.is_varargs {
        ctor.modifiers = ctor.modifiers.with(Modifiers::VARARGS);
    }
    ctor
}

pub(super) fn constructor_ref(owner: &QualifiedName, decl: &MethodDeclaration) -> MethodRef {
    let mut ctor = MethodRef::constructor(owner.clone(), decl.param_types());
    ctor.is_varargs = decl.modifiers.has(Modifiers::VARARGS);
    ctor
}

// ============================================================================
// Naming pass
// ============================================================================

struct Namer<'v> {
    vars: &'v mut VarAllocator,
    /// Anonymous classes numbered so far, per enclosing class
    anonymous: BTreeMap<QualifiedName, usize>,
    lambdas: BTreeMap<QualifiedName, usize>,
}

impl Namer<'_> {
    fn next_anonymous(&mut self, owner: &QualifiedName) -> QualifiedName {
        let n = self.anonymous.entry(owner.clone()).or_default();
        *n += 1;
        owner.nested(&n.to_string(), NameKind::Class)
    }

    fn next_lambda(&mut self, owner: &QualifiedName) -> QualifiedName {
        let n = self.lambdas.entry(owner.clone()).or_default();
        *n += 1;
        owner.nested(&format!("$Lambda${}", n), NameKind::Class)
    }

    fn declaration(&mut self, decl: &mut TypeDeclaration) {
        let owner = decl.name.clone();
        let interface = decl.kind.is_interface_like();
        for constant in &mut decl.enum_constants {
            for arg in &mut constant.args {
                self.expr(&owner, true, arg);
            }
            self.enum_constant(&owner, constant);
        }
        for member in &mut decl.members {
            match member {
                Member::Type(nested) => {
                    // Member classes of interfaces never have an enclosing instance.
                    if interface {
                        nested.modifiers = nested.modifiers.with(Modifiers::STATIC);
                    }
                    self.declaration(nested);
                }
                Member::Field(f) => {
                    let static_context = interface || f.modifiers.is_static();
                    if let Some(init) = &mut f.initializer {
                        self.expr(&owner, static_context, init);
                    }
                }
                Member::Method(m) => {
                    let static_context = m.modifiers.is_static();
                    if let Some(body) = &mut m.body {
                        self.block(&owner, static_context, body);
                    }
                }
                Member::Initializer(i) => self.block(&owner, i.is_static, &mut i.body),
            }
        }
    }

    /// A constant with a class body becomes a static subclass of its enum
    fn enum_constant(&mut self, owner: &QualifiedName, constant: &mut EnumConstant) {
        let Some(body) = &mut constant.body else {
            return;
        };
        let name = self.next_anonymous(owner);
        Renames::single(body.name.clone(), name.clone()).declaration(body);
        body.kind = TypeKind::Class;
        body.modifiers = body.modifiers.with(Modifiers::STATIC | Modifiers::FINAL | Modifiers::ENUM);
        body.superclass = Some(SourceType::named(owner.clone()));
        let ctor = forwarding_constructor(&constant.constructor, None, self.vars);
        constant.constructor = constructor_ref(&name, &ctor);
        body.members.push(Member::Method(ctor));
        self.declaration(body);
    }

    fn expr(&mut self, owner: &QualifiedName, static_context: bool, expr: &mut Expr) {
        let mut walker = BodyNamer {
            namer: self,
            owner,
            static_context,
        };
        walker.visit_expr_mut(expr);
    }

    fn block(&mut self, owner: &QualifiedName, static_context: bool, body: &mut Vec<Stmt>) {
        self.rename_local_classes(owner, body);
        let mut walker = BodyNamer {
            namer: self,
            owner,
            static_context,
        };
        walk_block_mut(&mut walker, body);
    }

    /// Local classes of a member body are named under the class declaring
    /// the member. Every use of them lies inside the same body.
    fn rename_local_classes(&mut self, owner: &QualifiedName, body: &mut [Stmt]) {
        let mut names = LocalClassNames(vec![]);
        for stmt in body.iter() {
            names.visit_stmt(stmt);
        }
        let mut renames = Renames::default();
        for old in names.0 {
            let new = owner.nested(old.simple_name(), NameKind::Class);
            renames.push(old, new);
        }
        renames.block(body);
    }

    fn anonymous(&mut self, owner: &QualifiedName, static_context: bool, expr: &mut Expr) {
        let placeholder = ExprKind::Literal(Literal::Null);
        let ExprKind::New {
            ctor: super_ctor,
            args,
            outer,
            body: Some(mut body),
            ..
        } = std::mem::replace(&mut expr.kind, placeholder)
        else {
            return;
        };
        let name = self.next_anonymous(owner);
        let renames = Renames::single(body.name.clone(), name.clone());
        renames.declaration(&mut body);
        renames.ty(&mut expr.ty);

        body.kind = TypeKind::Class;
        if static_context {
            body.modifiers = body.modifiers.with(Modifiers::STATIC);
        }
        if body.superclass.is_none() {
            body.superclass = Some(if body.interfaces.is_empty() {
                SourceType::named(super_ctor.owner.clone())
            } else {
                SourceType::object()
            });
        }

        // An explicit outer instance belongs to the superclass.
        let outer_param = outer.as_ref().map(|o| (self.vars.fresh("outer$super"), o.ty.clone()));
        let ctor = forwarding_constructor(&super_ctor, outer_param, self.vars);
        let ctor_ref = constructor_ref(&name, &ctor);
        body.members.push(Member::Method(ctor));

        let mut all_args: Vec<Expr> = outer.map(|o| *o).into_iter().collect();
        all_args.extend(args);
        expr.kind = ExprKind::New {
            class: name,
            ctor: ctor_ref,
            args: all_args,
            outer: None,
            body: Some(body),
        };
        self.created(owner, static_context, expr);
    }

    /// Continue into a freshly named class creation: its arguments in the
    /// enclosing context, its body under its own name
    fn created(&mut self, owner: &QualifiedName, static_context: bool, expr: &mut Expr) {
        if let ExprKind::New { args, body: Some(body), .. } = &mut expr.kind {
            for arg in args.iter_mut() {
                self.expr(owner, static_context, arg);
            }
            self.declaration(body);
        }
    }
}

struct BodyNamer<'n, 'v> {
    namer: &'n mut Namer<'v>,
    owner: &'n QualifiedName,
    static_context: bool,
}

impl VisitorMut for BodyNamer<'_, '_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match &expr.kind {
            ExprKind::Lambda { .. } | ExprKind::MethodReference { .. } => {
                let name = self.namer.next_lambda(self.owner);
                lambdas::lower(expr, name, self.owner, self.static_context, self.namer.vars);
                self.namer.created(self.owner, self.static_context, expr);
            }
            ExprKind::New { body: Some(_), .. } => self.namer.anonymous(self.owner, self.static_context, expr),
            _ => walk_expr_mut(self, expr),
        }
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if let StmtKind::LocalClass(decl) = &mut stmt.kind {
            decl.kind = TypeKind::Class;
            if self.static_context {
                decl.modifiers = decl.modifiers.with(Modifiers::STATIC);
            }
            if decl.constructors().next().is_none() {
                let super_name = decl
                    .superclass
                    .as_ref()
                    .and_then(|s| s.class_name().cloned())
                    .unwrap_or_else(|| QualifiedName::from_binary_name("java.lang.Object", NameKind::Class));
                let ctor = forwarding_constructor(&MethodRef::constructor(super_name, vec![]), None, self.namer.vars);
                decl.members.push(Member::Method(ctor));
            }
            self.namer.declaration(decl);
            return;
        }
        walk_stmt_mut(self, stmt);
    }
}

/// Names of the local classes declared directly in a member body
struct LocalClassNames(Vec<QualifiedName>);

impl Visitor for LocalClassNames {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::LocalClass(decl) = &stmt.kind {
            self.0.push(decl.name.clone());
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        // Lambda bodies move into classes of their own.
        if !matches!(expr.kind, ExprKind::Lambda { .. }) {
            walk_expr(self, expr);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use source_model::{LambdaBody, Provenance};

    pub fn name(binary: &str) -> QualifiedName {
        QualifiedName::from_binary_name(binary, NameKind::Class)
    }

    pub fn class_with_method(binary: &str, method_body: Vec<Stmt>, is_static: bool) -> TypeDeclaration {
        let mut decl = TypeDeclaration::new(name(binary), TypeKind::Class);
        let mut m = method("run", MethodKind::Method, vec![], SourceType::Void, method_body);
        if is_static {
            m.modifiers = m.modifiers.with(Modifiers::STATIC);
        }
        decl.members.push(Member::Method(m));
        decl
    }

    pub fn unit_of(decl: TypeDeclaration) -> CompilationUnit {
        let mut unit = CompilationUnit::new(Provenance::File { path: "a/Outer.java".to_string() }, &["a"]);
        unit.types.push(decl);
        unit
    }

    pub fn runnable() -> MethodRef {
        MethodRef::method(QualifiedName::from_binary_name("java.lang.Runnable", NameKind::Interface), "run", vec![], SourceType::Void)
    }

    fn body_of(decl: &TypeDeclaration) -> &Vec<Stmt> {
        decl.methods().find(|m| m.name == "run").and_then(|m| m.body.as_ref()).unwrap()
    }

    fn created_class(stmt: &Stmt) -> &TypeDeclaration {
        let StmtKind::Expr(e) = &stmt.kind else { panic!("expression expected") };
        let ExprKind::New { body: Some(body), .. } = &e.kind else { panic!("class creation expected") };
        body
    }

    #[test]
    fn anonymous_classes_are_numbered_per_enclosing_class() {
        let anon = |old: &str| {
            let body = TypeDeclaration::new(name(old), TypeKind::Class);
            Stmt::expr(Expr::new(
                ExprKind::New {
                    class: name(old),
                    ctor: MethodRef::constructor(name("java.lang.Object"), vec![]),
                    args: vec![],
                    outer: None,
                    body: Some(Box::new(body)),
                },
                SourceType::class(old),
            ))
        };
        let mut unit = unit_of(class_with_method("a.Outer", vec![anon("a.Outer$7"), anon("a.Outer$3")], true));
        desugar_unit(&mut unit);
        let body = body_of(&unit.types[0]);
        let first = created_class(&body[0]);
        let second = created_class(&body[1]);
        assert_eq!(first.name, name("a.Outer$1"));
        assert_eq!(second.name, name("a.Outer$2"));
        assert!(first.modifiers.is_static());
        assert_eq!(first.constructors().count(), 1);
        assert_eq!(first.superclass, Some(SourceType::object()));
    }

    #[test]
    fn lambdas_become_classes_implementing_the_functional_interface() {
        let lambda = Expr::new(
            ExprKind::Lambda {
                params: vec![],
                body: LambdaBody::Block(vec![]),
                functional: runnable(),
            },
            SourceType::interface("java.lang.Runnable"),
        );
        let mut unit = unit_of(class_with_method("a.Outer", vec![Stmt::expr(lambda)], false));
        desugar_unit(&mut unit);
        let class = created_class(&body_of(&unit.types[0])[0]);
        assert_eq!(class.name.types, vec!["Outer".to_string(), "$Lambda$1".to_string()]);
        assert_eq!(class.interfaces, vec![SourceType::interface("java.lang.Runnable")]);
        // No use of the enclosing instance.
        assert!(class.modifiers.is_static());
        let run = class.methods().find(|m| m.name == "run").unwrap();
        assert_eq!(run.overrides, vec![runnable()]);
    }

    #[test]
    fn lambdas_using_this_keep_the_enclosing_instance() {
        let lambda = Expr::new(
            ExprKind::Lambda {
                params: vec![],
                body: LambdaBody::Block(vec![Stmt::expr(this_of(&name("a.Outer")))]),
                functional: runnable(),
            },
            SourceType::interface("java.lang.Runnable"),
        );
        let mut unit = unit_of(class_with_method("a.Outer", vec![Stmt::expr(lambda)], false));
        desugar_unit(&mut unit);
        let class = created_class(&body_of(&unit.types[0])[0]);
        assert!(!class.modifiers.is_static());
        let run = class.methods().find(|m| m.name == "run").unwrap();
        let StmtKind::Expr(e) = &run.body.as_ref().unwrap()[0].kind else { panic!() };
        assert_eq!(e.kind, ExprKind::QualifiedThis(name("a.Outer")));
    }
}
