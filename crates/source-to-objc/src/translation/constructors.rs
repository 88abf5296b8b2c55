// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Constructors
//!
//! A rewritten constructor body is laid out as:
//! 1. the enclosing instance stored into `this$0`, and captured values
//!    stored into their fields
//! 2. the superclass constructor call, or the `this(...)` delegation
//! 3. zeroing of ivars not definitely assigned before they are read
//! 4. field initializers and instance initializer blocks in member order,
//!    unless the constructor delegates
//! 5. the declared body, then `return self`

use super::declaration_rewriter::{describe, field_store, method_descriptor, TypeContext};
use super::expression_rewriter::{constructor_params, rewrite_expr};
use super::scope::{BodyKind, Scope};
use super::statement_rewriter::{rewrite_block, rewrite_stmt};
use crate::diagnostics::TranslationResult;
use crate::naming::{constructor_selector, ivar_name, local_name, ENUM_NAME_PARAM, ENUM_ORDINAL_PARAM, OUTER_FIELD, OUTER_PARAM};
use objc_ir::analysis::analyze_constructor;
use objc_ir::{
    ConstantValue, Expr as Target, MethodDecl, MethodKind as TargetMethodKind, ParamDecl, PrimitiveType,
    Stmt as TargetStmt, TypeDescriptor,
};
use source_model::{Member, MethodDeclaration, MethodRef, Modifiers, Parameter, SourceType, Stmt, StmtKind, TypeKind};
use std::collections::BTreeSet;

pub(super) fn rewrite_constructor(ctx: &TypeContext, method: &MethodDeclaration) -> TranslationResult<MethodDecl> {
    let declared = method.param_types();
    let mut target = constructor_decl(ctx, &declared, &method.params)?;
    describe(ctx, &mut target, method)?;
    target.descriptor = method_descriptor(&declared, &SourceType::Void);
    target.body = Some(constructor_body(ctx, method.body.as_deref().unwrap_or(&[]))?);
    Ok(target)
}

/// The implicit no-argument constructor of a class declaring none
pub(super) fn default_constructor(ctx: &TypeContext) -> TranslationResult<MethodDecl> {
    let mut target = constructor_decl(ctx, &[], &[])?;
    target.source_name = Some("<init>".to_string());
    target.modifiers = if ctx.decl.kind == TypeKind::Enum {
        Modifiers::new(Modifiers::PRIVATE)
    } else {
        Modifiers::new(ctx.decl.modifiers.bits() & (Modifiers::PUBLIC | Modifiers::PROTECTED | Modifiers::PRIVATE))
    };
    target.public = !target.modifiers.is_private();
    target.body = Some(constructor_body(ctx, &[])?);
    Ok(target)
}

fn constructor_decl(ctx: &TypeContext, declared: &[SourceType], params: &[Parameter]) -> TranslationResult<MethodDecl> {
    let mapper = ctx.mapper;
    let selector = constructor_selector(&constructor_params(mapper, &ctx.decl.name, declared)?);
    let mut target = MethodDecl::new(selector, TargetMethodKind::Constructor, ctx.class.descriptor.clone());
    if let Some(outer) = ctx.outer() {
        target.params.push(ParamDecl {
            name: OUTER_PARAM.to_string(),
            ty: mapper.reference(&outer)?,
        });
    }
    for p in params {
        target.params.push(ParamDecl {
            name: local_name(&p.var.name),
            ty: mapper.map_type(&p.ty)?,
        });
    }
    if ctx.takes_enum_identity() {
        target.params.push(ParamDecl {
            name: ENUM_NAME_PARAM.to_string(),
            ty: mapper.map_type(&SourceType::string())?,
        });
        target.params.push(ParamDecl {
            name: ENUM_ORDINAL_PARAM.to_string(),
            ty: TypeDescriptor::Primitive(PrimitiveType::Int32),
        });
    }
    Ok(target)
}

fn is_constructor_call(stmt: &Stmt) -> bool {
    matches!(
        stmt.kind,
        StmtKind::SuperConstructorCall { .. } | StmtKind::ThisConstructorCall { .. }
    )
}

fn constructor_body(ctx: &TypeContext, body: &[Stmt]) -> TranslationResult<objc_ir::Block> {
    let mapper = ctx.mapper;
    let mut scope = ctx.scope(BodyKind::Constructor);

    // Captured values are stored ahead of the explicit call.
    let (prologue, call, rest) = match body.iter().position(is_constructor_call) {
        Some(at) => (&body[..at], Some(&body[at]), &body[at + 1..]),
        None => (&body[..0], None, body),
    };
    let delegates = matches!(call.map(|c| &c.kind), Some(StmtKind::ThisConstructorCall { .. }));

    let mut out = vec![];
    if !delegates {
        if let Some(outer) = ctx.outer() {
            let ty = mapper.reference(&outer)?;
            let back = Target::ivar(scope.self_expr(), ivar_name(OUTER_FIELD), ty.clone());
            out.push(TargetStmt::Expr(Target::assign(back, Target::local(OUTER_PARAM, ty))));
        }
    }
    out.extend(rewrite_block(&mut scope, prologue)?);
    match call {
        Some(call) => out.extend(rewrite_stmt(&mut scope, call)?),
        None => {
            if let Some(superclass) = mapper.index().superclass_of(&ctx.decl.name) {
                let implicit = Stmt::new(StmtKind::SuperConstructorCall {
                    ctor: MethodRef::constructor(superclass, vec![]),
                    args: vec![],
                    outer: None,
                });
                out.extend(rewrite_stmt(&mut scope, &implicit)?);
            }
        }
    }

    let mut tail = vec![];
    if !delegates {
        tail.extend(instance_initializers(ctx, &mut scope)?);
    }
    tail.extend(rewrite_block(&mut scope, rest)?);
    if !matches!(tail.last(), Some(TargetStmt::Return(_) | TargetStmt::Throw(_))) {
        tail.push(TargetStmt::Return(Some(scope.self_expr())));
    }
    if !delegates {
        out.extend(zeroing(ctx, &scope, &tail)?);
    }
    out.extend(tail);
    Ok(out)
}

/// Instance field initializers and initializer blocks, in member order
fn instance_initializers(ctx: &TypeContext, scope: &mut Scope) -> TranslationResult<Vec<TargetStmt>> {
    let mut out = vec![];
    for member in &ctx.decl.members {
        match member {
            Member::Field(f) if !f.modifiers.is_static() => {
                if let Some(init) = &f.initializer {
                    out.push(TargetStmt::Expr(rewrite_expr(scope, &field_store(ctx, f, false, init))?));
                }
            }
            Member::Initializer(init) if !init.is_static => {
                out.push(TargetStmt::Block(rewrite_block(scope, &init.body)?));
            }
            _ => {}
        }
    }
    Ok(out)
}

fn zero_of(ty: &TypeDescriptor) -> Target {
    let value = match ty.primitive() {
        None => return Target::nil(),
        Some(PrimitiveType::Bool) => ConstantValue::Bool(false),
        Some(PrimitiveType::Char16) => ConstantValue::Char(0),
        Some(PrimitiveType::Int64) => ConstantValue::Long(0),
        Some(PrimitiveType::Float) => ConstantValue::Float(0.0),
        Some(PrimitiveType::Double) => ConstantValue::Double(0.0),
        Some(_) => ConstantValue::Int(0),
    };
    Target::constant(value, ty.clone())
}

/// Explicit zero stores for declared ivars the rest of the constructor may
/// read before assigning
fn zeroing(ctx: &TypeContext, scope: &Scope, tail: &objc_ir::Block) -> TranslationResult<Vec<TargetStmt>> {
    let mut types = vec![];
    for member in &ctx.decl.members {
        if let Member::Field(f) = member {
            if !f.modifiers.is_static() {
                types.push((ivar_name(&f.name), ctx.mapper.map_type(&f.ty)?));
            }
        }
    }
    let names: BTreeSet<String> = types.iter().map(|(n, _)| n.clone()).collect();
    let analysis = analyze_constructor(tail, &names);
    let needed: BTreeSet<&String> = analysis.needs_zeroing(&names).collect();
    Ok(types
        .into_iter()
        .filter(|(name, _)| needed.contains(name))
        .map(|(name, ty)| {
            let zero = zero_of(&ty);
            TargetStmt::Expr(Target::assign(Target::ivar(scope.self_expr(), name, ty), zero))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::translation::declaration_rewriter::rewrite_unit;
    use crate::translation::fixtures::{class, field, unit, Fixture};
    use objc_ir::{ExprKind as TargetKind, MethodKind, Stmt as TargetStmt};
    use source_model::{
        Expr, FieldRef, Initializer, Literal, Member, MethodDeclaration, MethodKind as SourceKind, MethodRef, Modifiers,
        NameKind, QualifiedName, SourceType, Stmt, StmtKind,
    };

    fn holder() -> QualifiedName {
        QualifiedName::from_binary_name("a.Holder", NameKind::Class)
    }

    fn constructor(body: Vec<Stmt>) -> Member {
        Member::Method(MethodDeclaration {
            name: "<init>".to_string(),
            kind: SourceKind::Constructor,
            modifiers: Modifiers::new(Modifiers::PUBLIC),
            type_params: vec![],
            params: vec![],
            return_type: SourceType::Void,
            throws: vec![],
            body: Some(body),
            native_code: None,
            overrides: vec![],
            annotations: vec![],
            default_value: None,
            location: Default::default(),
        })
    }

    fn assign_count(value: i32) -> Stmt {
        let field = FieldRef {
            owner: holder(),
            name: "count".to_string(),
            ty: SourceType::int(),
            is_static: false,
            constant_value: None,
        };
        Stmt::expr(Expr::new(
            source_model::ExprKind::Assign {
                op: None,
                target: Box::new(Expr::new(source_model::ExprKind::Field { target: None, field }, SourceType::int())),
                value: Box::new(Expr::literal(Literal::Int(value))),
            },
            SourceType::int(),
        ))
    }

    fn is_super_init(stmt: &TargetStmt) -> bool {
        let TargetStmt::Expr(e) = stmt else { return false };
        let TargetKind::Assign { value, .. } = &e.kind else { return false };
        matches!(&value.kind, TargetKind::Message { receiver, selector, .. }
            if matches!(receiver.kind, TargetKind::Super) && selector == "init")
    }

    #[test]
    fn initializers_follow_the_super_call() {
        let mut label = field("label", SourceType::string(), Modifiers::PRIVATE);
        if let Member::Field(f) = &mut label {
            f.initializer = Some(Expr::literal(Literal::String("x".to_string())));
        }
        let block = Member::Initializer(Initializer {
            is_static: false,
            body: vec![assign_count(3)],
            location: Default::default(),
        });
        let count = field("count", SourceType::int(), Modifiers::PRIVATE);
        let fixture = Fixture::new(vec![unit(
            "a/Holder.java",
            vec![class("a.Holder", vec![label, count, block, constructor(vec![])])],
        )]);
        let tree = rewrite_unit(&fixture.units[0], fixture.mapper()).unwrap();
        let ctor = tree.types[0].methods().find(|m| m.kind == MethodKind::Constructor).unwrap();
        let body = ctor.body.as_ref().unwrap();

        assert!(is_super_init(&body[0]));
        assert!(matches!(&body[1], TargetStmt::Expr(e) if matches!(e.kind, TargetKind::StrongAssign { .. })));
        assert!(matches!(&body[2], TargetStmt::Block(_)));
        assert!(matches!(body.last(), Some(TargetStmt::Return(Some(e))) if matches!(e.kind, TargetKind::SelfRef)));
    }

    #[test]
    fn delegating_constructors_skip_initializers() {
        let mut label = field("label", SourceType::string(), Modifiers::PRIVATE);
        if let Member::Field(f) = &mut label {
            f.initializer = Some(Expr::literal(Literal::String("x".to_string())));
        }
        let delegate = Stmt::new(StmtKind::ThisConstructorCall {
            ctor: MethodRef::constructor(holder(), vec![SourceType::int()]),
            args: vec![Expr::literal(Literal::Int(1))],
        });
        let mut with_int = constructor(vec![]);
        if let Member::Method(m) = &mut with_int {
            m.params = vec![source_model::Parameter {
                var: source_model::VarRef::new(1, "n"),
                ty: SourceType::int(),
                annotations: vec![],
            }];
        }
        let fixture = Fixture::new(vec![unit(
            "a/Holder.java",
            vec![class("a.Holder", vec![label, constructor(vec![delegate]), with_int])],
        )]);
        let tree = rewrite_unit(&fixture.units[0], fixture.mapper()).unwrap();
        let init = tree.types[0].methods().find(|m| m.selector == "init").unwrap();
        let body = init.body.as_ref().unwrap();
        assert_eq!(body.len(), 2);
        let TargetStmt::Expr(e) = &body[0] else { panic!("delegation expected") };
        let TargetKind::Assign { value, .. } = &e.kind else { panic!("self assignment expected") };
        assert!(matches!(&value.kind, TargetKind::Message { selector, .. } if selector == "initWithInt:"));
    }

    #[test]
    fn unassigned_fields_are_zeroed() {
        let count = field("count", SourceType::int(), Modifiers::PRIVATE);
        let size = field("size", SourceType::int(), Modifiers::PRIVATE);
        let fixture = Fixture::new(vec![unit(
            "a/Holder.java",
            vec![class("a.Holder", vec![count, size, constructor(vec![assign_count(1)])])],
        )]);
        let tree = rewrite_unit(&fixture.units[0], fixture.mapper()).unwrap();
        let ctor = tree.types[0].methods().find(|m| m.kind == MethodKind::Constructor).unwrap();
        let zeroed: Vec<&str> = ctor
            .body
            .as_ref()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                TargetStmt::Expr(e) => match &e.kind {
                    TargetKind::Assign { target, value, .. } if matches!(value.kind, TargetKind::Constant(_)) => {
                        match &target.kind {
                            TargetKind::Ivar { name, .. } => Some(name.as_str()),
                            _ => None,
                        }
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect();
        // The second entry is the body's own store of 1.
        assert_eq!(zeroed, ["size_", "count_"]);
    }

    #[test]
    fn classes_without_constructors_get_one() {
        let fixture = Fixture::new(vec![unit("a/Holder.java", vec![class("a.Holder", vec![])])]);
        let tree = rewrite_unit(&fixture.units[0], fixture.mapper()).unwrap();
        let ctor = tree.types[0].methods().find(|m| m.kind == MethodKind::Constructor).unwrap();
        assert_eq!(ctor.selector, "init");
        assert!(ctor.modifiers.is_public());
        assert!(is_super_init(&ctor.body.as_ref().unwrap()[0]));
    }
}
