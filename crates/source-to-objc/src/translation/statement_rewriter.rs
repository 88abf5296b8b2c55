// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Statement rewriting
//!
//! - labeled `break`/`continue` become `goto` to labels placed after the
//!   loop and at the end of its body
//! - enhanced `for` over arrays indexes through the runtime array class,
//!   over anything else it uses fast enumeration
//! - `switch` on enums dispatches on the ordinal, on strings on the index
//!   of the matching case constant
//! - try-with-resources closes resources in reverse order and records close
//!   failures as suppressed exceptions of the primary one

use super::expression_rewriter::{
    call_args, cast, constant_value, constructor_params, convert, rewrite_expr, super_ref,
};
use super::scope::{BodyKind, Scope};
use crate::diagnostics::{TranslationError, TranslationResult};
use crate::naming::{
    constructor_selector, enum_ordinal_name, local_name, method_selector, ENUM_NAME_PARAM, ENUM_ORDINAL_PARAM,
    OUTER_PARAM,
};
use crate::type_mapper::nil_chk;
use objc_ir::{BinaryOperator, ExprKind as TargetKind, PrimitiveType, TypeDescriptor, UnaryOperator};
use source_model::visit::{walk_stmt, Visitor};
use source_model::{
    CaseLabel, CatchClause, Expr, Literal, Location, MethodRef, NameKind, QualifiedName, Resource, SourceType, Stmt,
    StmtKind, SwitchCase, VarRef,
};

type Target = objc_ir::Expr;
type TargetStmt = objc_ir::Stmt;

fn int_type() -> TypeDescriptor {
    TypeDescriptor::Primitive(PrimitiveType::Int32)
}

fn bool_type() -> TypeDescriptor {
    TypeDescriptor::Primitive(PrimitiveType::Bool)
}

pub fn rewrite_block(scope: &mut Scope, block: &[Stmt]) -> TranslationResult<objc_ir::Block> {
    let mut out = vec![];
    for stmt in block {
        out.extend(rewrite_stmt(scope, stmt)?);
    }
    Ok(out)
}

/// A statement used as a loop or branch body, without an extra brace level
fn body_block(scope: &mut Scope, stmt: &Stmt) -> TranslationResult<objc_ir::Block> {
    match &stmt.kind {
        StmtKind::Block(block) => rewrite_block(scope, block),
        _ => rewrite_stmt(scope, stmt),
    }
}

pub fn rewrite_stmt(scope: &mut Scope, stmt: &Stmt) -> TranslationResult<Vec<TargetStmt>> {
    let location = stmt.location;
    let single = match &stmt.kind {
        StmtKind::Block(block) => TargetStmt::Block(rewrite_block(scope, block)?),
        StmtKind::LocalVar { var, ty, init } => TargetStmt::LocalDecl {
            name: local_name(&var.name),
            ty: scope.map(ty)?,
            init: init.as_ref().map(|e| rewrite_expr(scope, e)).transpose()?,
        },
        // Local classes are emitted as top-level declarations of the unit.
        StmtKind::LocalClass(_) | StmtKind::Empty => return Ok(vec![]),
        StmtKind::Expr(e) => TargetStmt::Expr(rewrite_expr(scope, e)?),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => TargetStmt::If {
            cond: rewrite_expr(scope, cond)?,
            then_branch: body_block(scope, then_branch)?,
            else_branch: else_branch.as_deref().map(|e| body_block(scope, e)).transpose()?,
        },
        StmtKind::While { cond, body } => TargetStmt::While {
            cond: rewrite_expr(scope, cond)?,
            body: body_block(scope, body)?,
        },
        StmtKind::DoWhile { body, cond } => TargetStmt::DoWhile {
            body: body_block(scope, body)?,
            cond: rewrite_expr(scope, cond)?,
        },
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => TargetStmt::For {
            init: rewrite_block(scope, init)?,
            cond: cond.as_ref().map(|c| rewrite_expr(scope, c)).transpose()?,
            update: update.iter().map(|u| rewrite_expr(scope, u)).collect::<TranslationResult<_>>()?,
            body: body_block(scope, body)?,
        },
        StmtKind::ForEach {
            var,
            var_ty,
            iterable,
            body,
        } => for_each(scope, var, var_ty, iterable, body)?,
        StmtKind::Labeled { label, body } => return labeled(scope, label, body),
        StmtKind::Break(None) => TargetStmt::Break,
        StmtKind::Break(Some(label)) => TargetStmt::Goto(scope.jump_to(&break_label(label))),
        StmtKind::Continue(None) => TargetStmt::Continue,
        StmtKind::Continue(Some(label)) => TargetStmt::Goto(scope.jump_to(&continue_label(label))),
        StmtKind::Return(value) => match (scope.kind, value) {
            (BodyKind::Constructor, _) => TargetStmt::Return(Some(scope.self_expr())),
            (_, Some(value)) => TargetStmt::Return(Some(rewrite_expr(scope, value)?)),
            (_, None) => TargetStmt::Return(None),
        },
        StmtKind::Throw(e) => TargetStmt::Throw(nil_chk(rewrite_expr(scope, e)?)),
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => try_stmt(scope, resources, body, catches, finally.as_deref(), location)?,
        StmtKind::Switch { selector, cases } => return switch(scope, selector, cases, location),
        StmtKind::Synchronized { lock, body } => TargetStmt::Synchronized {
            lock: nil_chk(rewrite_expr(scope, lock)?),
            body: rewrite_block(scope, body)?,
        },
        StmtKind::Assert { cond, message } => assert(scope, cond, message.as_ref())?,
        StmtKind::SuperConstructorCall { ctor, args, outer } => {
            super_constructor_call(scope, ctor, args, outer.as_ref(), location)?
        }
        StmtKind::ThisConstructorCall { ctor, args } => this_constructor_call(scope, ctor, args)?,
        StmtKind::Unsupported { construct } => return Err(TranslationError::unsupported(construct.clone(), location)),
    };
    Ok(vec![single])
}

// ============================================================================
// Loops and labels
// ============================================================================

fn break_label(label: &str) -> String {
    format!("break_{}", label)
}

fn continue_label(label: &str) -> String {
    format!("continue_{}", label)
}

fn labeled(scope: &mut Scope, label: &str, body: &Stmt) -> TranslationResult<Vec<TargetStmt>> {
    let mut out = rewrite_stmt(scope, body)?;
    let continue_at = continue_label(label);
    if scope.is_jumped_to(&continue_at) {
        match out.iter_mut().rev().find_map(innermost_loop_body) {
            Some(loop_body) => loop_body.push(TargetStmt::Label(continue_at)),
            None => {
                return Err(TranslationError::unsupported(
                    format!("`continue {}` on a statement that is not a loop", label),
                    body.location,
                ))
            }
        }
    }
    let break_at = break_label(label);
    if scope.is_jumped_to(&break_at) {
        out.push(TargetStmt::Label(break_at));
    }
    Ok(out)
}

/// Body of the loop a rewritten statement ends with, looking through the
/// blocks that wrap desugared loops
fn innermost_loop_body(stmt: &mut TargetStmt) -> Option<&mut objc_ir::Block> {
    match stmt {
        TargetStmt::While { body, .. }
        | TargetStmt::DoWhile { body, .. }
        | TargetStmt::For { body, .. }
        | TargetStmt::ForIn { body, .. } => Some(body),
        TargetStmt::Block(block) => block.last_mut().and_then(innermost_loop_body),
        _ => None,
    }
}

fn for_each(
    scope: &mut Scope,
    var: &VarRef,
    var_ty: &SourceType,
    iterable: &Expr,
    body: &Stmt,
) -> TranslationResult<TargetStmt> {
    let mapper = scope.mapper;
    let collection = nil_chk(rewrite_expr(scope, iterable)?);
    let name = local_name(&var.name);
    let var_desc = scope.map(var_ty)?;
    let mut body = body_block(scope, body)?;

    let iterable_ty = iterable.effective_type().erasure();
    let Some(element) = iterable_ty.element_type().cloned() else {
        if let Some(p) = var_ty.primitive() {
            // Collections hold boxed values.
            let item = scope.temp("e");
            let boxed = SourceType::Class {
                name: p.boxed_name(),
                type_args: vec![],
            };
            let value = convert(mapper, Target::local(item.clone(), mapper.map_type(&boxed)?), &boxed, var_ty)?;
            body.insert(
                0,
                TargetStmt::LocalDecl {
                    name,
                    ty: var_desc,
                    init: Some(value),
                },
            );
            return Ok(TargetStmt::ForIn {
                name: item,
                ty: TypeDescriptor::id(),
                collection,
                body,
            });
        }
        return Ok(TargetStmt::ForIn {
            name,
            ty: var_desc,
            collection,
            body,
        });
    };

    let array = scope.temp("a");
    let index = scope.temp("i");
    let array_desc = mapper.map_type(&iterable_ty)?;
    let element_desc = mapper.map_erased(&element)?;
    let getter = format!("{}_Get", TypeDescriptor::array_class_for(&element_desc));
    let array_ref = Target::local(array.clone(), array_desc.clone());
    let index_ref = Target::local(index.clone(), int_type());
    let get = match element_desc.primitive() {
        Some(_) => Target::call(getter, vec![array_ref.clone(), index_ref.clone()], element_desc.clone()),
        None => cast(
            Target::call(getter, vec![array_ref.clone(), index_ref.clone()], TypeDescriptor::id()),
            element_desc.clone(),
        ),
    };
    body.insert(
        0,
        TargetStmt::LocalDecl {
            name,
            ty: var_desc,
            init: Some(convert(mapper, get, &element, var_ty)?),
        },
    );
    let size = Target::ivar(array_ref, "size_", int_type());
    Ok(TargetStmt::Block(vec![
        TargetStmt::LocalDecl {
            name: array,
            ty: array_desc,
            init: Some(collection),
        },
        TargetStmt::For {
            init: vec![TargetStmt::LocalDecl {
                name: index,
                ty: int_type(),
                init: Some(Target::int(0)),
            }],
            cond: Some(Target::binary(BinaryOperator::Lt, index_ref.clone(), size, bool_type())),
            update: vec![Target::new(
                TargetKind::Unary {
                    op: UnaryOperator::PostInc,
                    operand: Box::new(index_ref),
                },
                int_type(),
            )],
            body,
        },
    ]))
}

// ============================================================================
// Exceptions
// ============================================================================

/// Finds statements that would leave a `finally` block other than by
/// falling off its end or throwing
#[derive(Default)]
struct FinallyExits {
    loops: usize,
    switches: usize,
    labels: Vec<String>,
    found: bool,
}

impl Visitor for FinallyExits {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Return(_) => self.found = true,
            StmtKind::Break(None) if self.loops == 0 && self.switches == 0 => self.found = true,
            StmtKind::Continue(None) if self.loops == 0 => self.found = true,
            StmtKind::Break(Some(l)) | StmtKind::Continue(Some(l)) if !self.labels.contains(l) => self.found = true,
            StmtKind::While { .. } | StmtKind::DoWhile { .. } | StmtKind::For { .. } | StmtKind::ForEach { .. } => {
                self.loops += 1;
                walk_stmt(self, stmt);
                self.loops -= 1;
                return;
            }
            StmtKind::Switch { .. } => {
                self.switches += 1;
                walk_stmt(self, stmt);
                self.switches -= 1;
                return;
            }
            StmtKind::Labeled { label, .. } => {
                self.labels.push(label.clone());
                walk_stmt(self, stmt);
                self.labels.pop();
                return;
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    // Expressions hold no statements once lambdas are classes.
    fn visit_expr(&mut self, _expr: &Expr) {}
}

fn exits_finally(block: &[Stmt]) -> bool {
    let mut exits = FinallyExits::default();
    for stmt in block {
        exits.visit_stmt(stmt);
    }
    exits.found
}

fn try_stmt(
    scope: &mut Scope,
    resources: &[Resource],
    body: &[Stmt],
    catches: &[CatchClause],
    finally: Option<&[Stmt]>,
    location: Location,
) -> TranslationResult<TargetStmt> {
    if finally.map_or(false, exits_finally) {
        return Err(TranslationError::unsupported(
            "control transfer out of a finally block",
            location,
        ));
    }
    let body = if resources.is_empty() {
        rewrite_block(scope, body)?
    } else if catches.is_empty() && finally.is_none() {
        return Ok(TargetStmt::Block(with_resources(scope, resources, body)?));
    } else {
        vec![TargetStmt::Block(with_resources(scope, resources, body)?)]
    };

    let mut clauses = vec![];
    for catch in catches {
        let name = local_name(&catch.var.name);
        let handler = rewrite_block(scope, &catch.body)?;
        // A multi-catch handler is repeated for each caught type.
        for ty in &catch.types {
            clauses.push(objc_ir::CatchClause {
                ty: scope.mapper.map_erased(ty)?,
                name: name.clone(),
                body: handler.clone(),
            });
        }
    }
    Ok(TargetStmt::Try {
        body,
        catches: clauses,
        finally: finally.map(|f| rewrite_block(scope, f)).transpose()?,
    })
}

/// ```text
/// R r = init;
/// Throwable primary = nil;
/// @try { body }
/// @catch (Throwable t) { primary = t; @throw t; }
/// @finally {
///   if (r != nil) {
///     if (primary != nil) { @try { [r close]; } @catch (Throwable e) { [primary addSuppressed:e]; } }
///     else { [r close]; }
///   }
/// }
/// ```
fn with_resources(scope: &mut Scope, resources: &[Resource], body: &[Stmt]) -> TranslationResult<objc_ir::Block> {
    let Some((resource, rest)) = resources.split_first() else {
        return rewrite_block(scope, body);
    };
    let mapper = scope.mapper;
    let name = local_name(&resource.var.name);
    let ty = scope.map(&resource.ty)?;
    let init = rewrite_expr(scope, &resource.init)?;
    let inner = with_resources(scope, rest, body)?;

    let throwable = mapper.reference(&QualifiedName::from_binary_name("java.lang.Throwable", NameKind::Class))?;
    let primary_name = scope.temp("primaryExc");
    let primary = Target::local(primary_name.clone(), throwable.clone());
    let caught = scope.temp("t");
    let suppressed = scope.temp("e");
    let resource_ref = Target::local(name.clone(), ty.clone());
    let close = TargetStmt::Expr(Target::message(
        resource_ref.clone(),
        method_selector(&resource.close.name, &[]),
        vec![],
        TypeDescriptor::Void,
    ));
    let add_suppressed = Target::message(
        primary.clone(),
        method_selector("addSuppressed", &[throwable.clone()]),
        vec![Target::local(suppressed.clone(), throwable.clone())],
        TypeDescriptor::Void,
    );
    let not_nil = |e: Target| Target::binary(BinaryOperator::Ne, e, Target::nil(), bool_type());

    let close_all = TargetStmt::If {
        cond: not_nil(resource_ref),
        then_branch: vec![TargetStmt::If {
            cond: not_nil(primary.clone()),
            then_branch: vec![TargetStmt::Try {
                body: vec![close.clone()],
                catches: vec![objc_ir::CatchClause {
                    ty: throwable.clone(),
                    name: suppressed,
                    body: vec![TargetStmt::Expr(add_suppressed)],
                }],
                finally: None,
            }],
            else_branch: Some(vec![close]),
        }],
        else_branch: None,
    };
    Ok(vec![
        TargetStmt::LocalDecl {
            name,
            ty,
            init: Some(init),
        },
        TargetStmt::LocalDecl {
            name: primary_name,
            ty: throwable.clone(),
            init: Some(Target::nil()),
        },
        TargetStmt::Try {
            body: inner,
            catches: vec![objc_ir::CatchClause {
                ty: throwable.clone(),
                name: caught.clone(),
                body: vec![
                    TargetStmt::Expr(Target::assign(primary, Target::local(caught.clone(), throwable.clone()))),
                    TargetStmt::Throw(Target::local(caught, throwable)),
                ],
            }],
            finally: Some(vec![close_all]),
        },
    ])
}

// ============================================================================
// Switch
// ============================================================================

fn switch(scope: &mut Scope, selector: &Expr, cases: &[SwitchCase], location: Location) -> TranslationResult<Vec<TargetStmt>> {
    let mapper = scope.mapper;
    let selector_ty = selector.effective_type().clone();
    let value = rewrite_expr(scope, selector)?;
    let enum_class = selector_ty
        .erasure()
        .class_name()
        .filter(|n| mapper.index().is_enum(n))
        .cloned();

    let strings: Vec<String> = cases
        .iter()
        .flat_map(|c| &c.labels)
        .filter_map(|l| match l {
            CaseLabel::Constant(Literal::String(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();

    let dispatch = if enum_class.is_some() {
        Target::message(nil_chk(value), method_selector("ordinal", &[]), vec![], int_type())
    } else if selector_ty.is_string() {
        let string_ty = mapper.map_type(&SourceType::string())?;
        let constants = strings
            .iter()
            .map(|s| Target::constant(objc_ir::ConstantValue::String(s.clone()), string_ty.clone()))
            .collect();
        Target::call(
            "ort_string_switch_index",
            vec![
                value,
                Target::new(
                    TargetKind::CArrayLiteral {
                        element: string_ty.clone(),
                        values: constants,
                    },
                    string_ty,
                ),
                Target::int(strings.len() as i32),
            ],
            int_type(),
        )
    } else if let Some(p) = selector_ty.unboxed() {
        mapper.unbox_of(value, p)
    } else {
        value
    };

    let mut hoisted = vec![];
    let mut target_cases = vec![];
    for case in cases {
        let mut labels = vec![];
        for label in &case.labels {
            labels.push(match label {
                CaseLabel::Default => objc_ir::CaseValue::Default,
                CaseLabel::Constant(Literal::String(s)) => {
                    let position = strings.iter().position(|c| c == s).unwrap_or_default();
                    objc_ir::CaseValue::Expr(Target::int(position as i32))
                }
                CaseLabel::Constant(literal) => {
                    objc_ir::CaseValue::Expr(Target::constant(constant_value(literal), dispatch.ty.clone()))
                }
                CaseLabel::EnumConstant(constant) => {
                    let Some(class) = &enum_class else {
                        return Err(TranslationError::unsupported("enum case label on a non-enum switch", location));
                    };
                    objc_ir::CaseValue::Expr(Target::new(
                        TargetKind::Macro {
                            class: mapper.resolve(class)?,
                            name: enum_ordinal_name(constant),
                        },
                        int_type(),
                    ))
                }
            });
        }
        let mut body = vec![];
        for stmt in rewrite_block(scope, &case.body)? {
            match stmt {
                // Case bodies share one scope; declarations move above the switch.
                TargetStmt::LocalDecl { name, ty, init } => {
                    if let Some(init) = init {
                        body.push(TargetStmt::Expr(Target::assign(Target::local(name.clone(), ty.clone()), init)));
                    }
                    hoisted.push(TargetStmt::LocalDecl { name, ty, init: None });
                }
                other => body.push(other),
            }
        }
        target_cases.push(objc_ir::SwitchCase { labels, body });
    }

    let switch = TargetStmt::Switch {
        selector: dispatch,
        cases: target_cases,
    };
    if hoisted.is_empty() {
        return Ok(vec![switch]);
    }
    hoisted.push(switch);
    Ok(vec![TargetStmt::Block(hoisted)])
}

// ============================================================================
// Assertions and constructor chaining
// ============================================================================

fn assert(scope: &mut Scope, cond: &Expr, message: Option<&Expr>) -> TranslationResult<TargetStmt> {
    let cond = rewrite_expr(scope, cond)?;
    let message = match message {
        Some(m) => {
            let value = rewrite_expr(scope, m)?;
            match m.effective_type().primitive() {
                Some(p) => scope.mapper.box_of(value, p)?,
                None => value,
            }
        }
        None => Target::nil(),
    };
    Ok(TargetStmt::Expr(Target::call("ORTAssert", vec![cond, message], TypeDescriptor::Void)))
}

/// Name and ordinal parameters, forwarded unchanged up the constructor chain
fn enum_identity(scope: &Scope) -> TranslationResult<Vec<Target>> {
    Ok(vec![
        Target::local(ENUM_NAME_PARAM, scope.map(&SourceType::string())?),
        Target::local(ENUM_ORDINAL_PARAM, int_type()),
    ])
}

fn super_constructor_call(
    scope: &mut Scope,
    ctor: &MethodRef,
    args: &[Expr],
    outer: Option<&Expr>,
    location: Location,
) -> TranslationResult<TargetStmt> {
    let mapper = scope.mapper;
    let superclass = &ctor.owner;
    let mut values = vec![];
    if let Some(super_outer) = mapper.index().get(superclass).and_then(|c| c.outer.clone()) {
        values.push(match outer {
            Some(o) => nil_chk(rewrite_expr(scope, o)?),
            None => scope.enclosing_instance(&super_outer, true, location)?,
        });
    }
    values.extend(call_args(scope, ctor, args)?);
    if mapper.index().takes_enum_identity(superclass) {
        values.extend(enum_identity(scope)?);
    }
    let selector = constructor_selector(&constructor_params(mapper, superclass, &ctor.params)?);
    let init = Target::message(super_ref(scope), selector, values, scope.class.descriptor.clone());
    Ok(TargetStmt::Expr(Target::assign(scope.self_expr(), init)))
}

fn this_constructor_call(scope: &mut Scope, ctor: &MethodRef, args: &[Expr]) -> TranslationResult<TargetStmt> {
    let mapper = scope.mapper;
    let class = scope.class.name.clone();
    let mut values = vec![];
    if let Some(outer) = mapper.index().get(&class).and_then(|c| c.outer.clone()) {
        values.push(Target::local(OUTER_PARAM, mapper.reference(&outer)?));
    }
    values.extend(call_args(scope, ctor, args)?);
    if mapper.index().takes_enum_identity(&class) {
        values.extend(enum_identity(scope)?);
    }
    let selector = constructor_selector(&constructor_params(mapper, &class, &ctor.params)?);
    let init = Target::message(scope.self_expr(), selector, values, scope.class.descriptor.clone());
    Ok(TargetStmt::Expr(Target::assign(scope.self_expr(), init)))
}
