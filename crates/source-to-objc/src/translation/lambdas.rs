// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Lowering of lambdas and method references to anonymous classes
//!
//! Each one becomes a creation of a synthetic class implementing its
//! functional interface with a single method. A bound method reference
//! evaluates its receiver once, at creation, and keeps it in a field.

use super::synthetic::{assign, field_of, method, param, synthetic_field, VarAllocator};
use crate::naming::capture_param_name;
use source_model::visit::{walk_expr, walk_expr_mut, Visitor, VisitorMut};
use source_model::{
    Expr, ExprKind, LambdaBody, Literal, Member, MethodDeclaration, MethodKind, MethodRef, MethodReferenceKind,
    Modifiers, QualifiedName, SourceType, Stmt, StmtKind, TypeDeclaration, TypeKind, VarRef,
};

const TARGET_FIELD: &str = "val$target";

/// Replace a lambda or method reference by the creation of class `name`
pub(super) fn lower(
    expr: &mut Expr,
    name: QualifiedName,
    owner: &QualifiedName,
    static_context: bool,
    vars: &mut VarAllocator,
) {
    let kind = std::mem::replace(&mut expr.kind, ExprKind::Literal(Literal::Null));
    let mut extras: Vec<(String, Expr)> = vec![];
    let (body_method, functional) = match kind {
        ExprKind::Lambda { params, body, functional } => {
            (lambda_method(params, body, &functional, owner, vars), functional)
        }
        ExprKind::MethodReference {
            kind,
            target,
            method,
            functional,
        } => {
            let bound = match (kind, target) {
                (MethodReferenceKind::Bound, Some(target)) => {
                    extras.push((TARGET_FIELD.to_string(), *target));
                    true
                }
                _ => false,
            };
            (reference_method(kind, bound, &method, &functional, &name, vars), functional)
        }
        other => {
            expr.kind = other;
            return;
        }
    };

    let mut decl = TypeDeclaration::new(name.clone(), TypeKind::Class);
    decl.modifiers = Modifiers::new(Modifiers::PRIVATE | Modifiers::FINAL | Modifiers::SYNTHETIC);
    decl.superclass = Some(SourceType::object());
    decl.interfaces = vec![functional_interface(&expr.ty, &functional)];
    decl.location = expr.location;

    let mut ctor_body = vec![];
    let mut ctor_params = vec![];
    for (field, value) in &extras {
        let var = vars.fresh(&capture_param_name(field.trim_start_matches("val$")));
        decl.members.push(synthetic_field(field.clone(), value.ty.clone()));
        ctor_body.push(assign(field_of(&name, field, &value.ty), Expr::local(var.clone(), value.ty.clone())));
        ctor_params.push(param(var, value.ty.clone()));
    }
    ctor_body.push(Stmt::new(StmtKind::SuperConstructorCall {
        ctor: MethodRef::constructor(object_name(), vec![]),
        args: vec![],
        outer: None,
    }));
    let ctor = method("<init>", MethodKind::Constructor, ctor_params, SourceType::Void, ctor_body);
    let ctor_ref = MethodRef::constructor(name.clone(), ctor.param_types());
    decl.members.push(Member::Method(body_method));
    decl.members.push(Member::Method(ctor));

    if static_context || !uses_enclosing_instance(&decl) {
        decl.modifiers = decl.modifiers.with(Modifiers::STATIC);
    }

    expr.kind = ExprKind::New {
        class: name,
        ctor: ctor_ref,
        args: extras.into_iter().map(|(_, value)| value).collect(),
        outer: None,
        body: Some(Box::new(decl)),
    };
}

fn object_name() -> QualifiedName {
    QualifiedName::from_binary_name("java.lang.Object", source_model::NameKind::Class)
}

/// The implemented interface: the target type, or the method's owner when
/// the target type is not a class type (intersection casts)
fn functional_interface(target: &SourceType, functional: &MethodRef) -> SourceType {
    match target {
        SourceType::Class { .. } => target.clone(),
        _ => SourceType::named(functional.owner.clone()),
    }
}

fn lambda_method(
    params: Vec<(VarRef, SourceType)>,
    body: LambdaBody,
    functional: &MethodRef,
    owner: &QualifiedName,
    vars: &mut VarAllocator,
) -> MethodDeclaration {
    let mut prologue = vec![];
    let mut method_params = vec![];
    for (i, (var, ty)) in params.into_iter().enumerate() {
        let declared = functional.params.get(i).cloned().unwrap_or_else(|| ty.clone());
        if declared.erasure() == ty.erasure() {
            method_params.push(param(var, declared));
            continue;
        }
        // The interface method takes the erased type; narrow it on entry.
        let incoming = vars.fresh(&format!("arg${}", i));
        let value = adapt(Expr::local(incoming.clone(), declared.clone()), &ty);
        prologue.push(Stmt::new(StmtKind::LocalVar {
            var,
            ty,
            init: Some(value),
        }));
        method_params.push(param(incoming, declared));
    }
    let mut statements = match body {
        LambdaBody::Expr(value) => vec![result_statement(*value, &functional.return_type)],
        LambdaBody::Block(block) => block,
    };
    prologue.append(&mut statements);

    let mut this = ThisToOwner(owner);
    for stmt in &mut prologue {
        this.visit_stmt_mut(stmt);
    }
    implementation(functional, method_params, prologue)
}

fn implementation(functional: &MethodRef, params: Vec<source_model::Parameter>, body: Vec<Stmt>) -> MethodDeclaration {
    let mut m = method(&functional.name, MethodKind::Method, params, functional.return_type.clone(), body);
    m.modifiers = Modifiers::new(Modifiers::PUBLIC);
    m.overrides = vec![functional.clone()];
    m
}

/// `return value;` adapted to the interface method, or a plain statement
/// for a void method
fn result_statement(value: Expr, return_type: &SourceType) -> Stmt {
    if return_type.is_void() {
        Stmt::expr(value)
    } else {
        Stmt::ret(Some(adapt(value, return_type)))
    }
}

/// Convert a value to the type a synthesized position expects: boxing and
/// unboxing through the implicit conversion slot, primitive widening and
/// reference narrowing through casts.
pub(super) fn adapt(value: Expr, to: &SourceType) -> Expr {
    let from = value.effective_type().clone();
    if from.erasure() == to.erasure() || to.is_void() {
        return value;
    }
    let value = if value.converted_to.is_some() {
        // Re-anchor so the new conversion applies after the recorded one.
        Expr::new(
            ExprKind::Cast {
                ty: from.clone(),
                expr: Box::new(value),
            },
            from.clone(),
        )
    } else {
        value
    };
    match (&from, to) {
        (SourceType::Primitive(_), SourceType::Primitive(_)) => cast(value, to),
        (SourceType::Primitive(p), _) => {
            let boxed = value.converted(SourceType::named(p.boxed_name()));
            if to.unboxed().is_some() || to.erasure().is_class("java.lang.Object") {
                boxed
            } else {
                cast(boxed, to)
            }
        }
        (_, SourceType::Primitive(p)) => {
            let unboxed_from = from.unboxed();
            match unboxed_from {
                Some(q) if q == *p => value.converted(to.clone()),
                Some(q) => cast(value.converted(SourceType::Primitive(q)), to),
                None => {
                    // An erased value: narrow to the wrapper, then unbox.
                    let boxed = SourceType::named(p.boxed_name());
                    cast(value, &boxed).converted(to.clone())
                }
            }
        }
        (SourceType::Null, _) => value,
        _ => {
            if to.erasure().is_class("java.lang.Object") {
                value
            } else {
                cast(value, to)
            }
        }
    }
}

fn cast(value: Expr, to: &SourceType) -> Expr {
    let location = value.location;
    Expr::new(
        ExprKind::Cast {
            ty: to.clone(),
            expr: Box::new(value),
        },
        to.clone(),
    )
    .at(location)
}

fn reference_method(
    kind: MethodReferenceKind,
    bound: bool,
    target: &MethodRef,
    functional: &MethodRef,
    class: &QualifiedName,
    vars: &mut VarAllocator,
) -> MethodDeclaration {
    let params: Vec<(VarRef, SourceType)> = functional
        .params
        .iter()
        .enumerate()
        .map(|(i, ty)| (vars.fresh(&format!("arg${}", i)), ty.clone()))
        .collect();
    let mut incoming: Vec<Expr> = params.iter().map(|(v, t)| Expr::local(v.clone(), t.clone())).collect();

    let call = match kind {
        MethodReferenceKind::Constructor => construct(target, incoming),
        MethodReferenceKind::Static => call_on(None, target, incoming),
        MethodReferenceKind::Bound | MethodReferenceKind::Unbound => {
            let receiver = if bound {
                let ty = SourceType::named(target.owner.clone());
                Some(adapt(field_of(class, TARGET_FIELD, &ty), &ty))
            } else if kind == MethodReferenceKind::Unbound && !incoming.is_empty() {
                let first = incoming.remove(0);
                Some(adapt(first, &SourceType::named(target.owner.clone())))
            } else {
                // `super::m` and `this::m` resolve on the enclosing instance.
                Some(Expr::new(ExprKind::QualifiedThis(target.owner.clone()), SourceType::named(target.owner.clone())))
            };
            call_on(receiver, target, incoming)
        }
    };
    let body = vec![result_statement(call, &functional.return_type)];
    implementation(functional, params.into_iter().map(|(v, t)| param(v, t)).collect(), body)
}

fn call_on(receiver: Option<Expr>, target: &MethodRef, incoming: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::MethodCall {
            target: receiver.map(Box::new),
            method: target.clone(),
            args: call_args(target, incoming),
            is_super: false,
        },
        target.return_type.clone(),
    )
}

fn construct(target: &MethodRef, mut incoming: Vec<Expr>) -> Expr {
    if let SourceType::Array(element) = &target.return_type {
        let length = if incoming.is_empty() {
            Expr::literal(Literal::Int(0))
        } else {
            adapt(incoming.remove(0), &SourceType::int())
        };
        return Expr::new(
            ExprKind::NewArray {
                element: (**element).clone(),
                dimensions: vec![length],
                initializer: None,
            },
            target.return_type.clone(),
        );
    }
    Expr::new(
        ExprKind::New {
            class: target.owner.clone(),
            ctor: target.clone(),
            args: call_args(target, incoming),
            outer: None,
            body: None,
        },
        SourceType::named(target.owner.clone()),
    )
}

/// Adapt the interface method's arguments to the referenced method's
/// parameters; surplus arguments of a varargs method adapt to its element
fn call_args(target: &MethodRef, incoming: Vec<Expr>) -> Vec<Expr> {
    let count = incoming.len();
    let last = target.params.len().saturating_sub(1);
    incoming
        .into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let declared = target.params.get(i.min(last));
            let expected = match declared {
                Some(ty) if target.is_varargs && i >= last => {
                    let spread = count != target.params.len() || !arg.effective_type().erasure().eq(&ty.erasure());
                    match (spread, ty.element_type()) {
                        (true, Some(element)) => element.clone(),
                        _ => ty.clone(),
                    }
                }
                Some(ty) => ty.clone(),
                None => return arg,
            };
            adapt(arg, &expected)
        })
        .collect()
}

/// `this` in a lambda body refers to the instance of the enclosing class
struct ThisToOwner<'a>(&'a QualifiedName);

impl VisitorMut for ThisToOwner<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if matches!(expr.kind, ExprKind::This) {
            expr.kind = ExprKind::QualifiedThis(self.0.clone());
            return;
        }
        walk_expr_mut(self, expr);
    }
}

/// Whether a synthesized class body may touch the instance of its
/// enclosing class. Errs on the side of keeping the instance.
fn uses_enclosing_instance(decl: &TypeDeclaration) -> bool {
    struct Uses(bool);

    impl Visitor for Uses {
        fn visit_expr(&mut self, expr: &Expr) {
            match &expr.kind {
                ExprKind::This | ExprKind::QualifiedThis(_) => self.0 = true,
                ExprKind::Field { target: None, field } if !field.is_static => self.0 = true,
                ExprKind::MethodCall {
                    target: None, method, ..
                } if !method.is_static => self.0 = true,
                ExprKind::MethodCall { is_super: true, .. } => self.0 = true,
                ExprKind::New {
                    class, outer: None, ..
                } if class.is_nested() => self.0 = true,
                _ => {}
            }
            walk_expr(self, expr);
        }

        fn visit_type_body(&mut self, decl: &TypeDeclaration) {
            source_model::visit::walk_type_members(self, decl);
        }
    }

    let mut uses = Uses(false);
    for member in &decl.members {
        if let Member::Method(m) = member {
            if m.is_constructor() {
                continue;
            }
            for stmt in m.body.iter().flatten() {
                uses.visit_stmt(stmt);
            }
        }
    }
    uses.0
}
