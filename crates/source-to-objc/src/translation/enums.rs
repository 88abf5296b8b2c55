// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Enum classes
//!
//! Constants are pre-constructed singletons held in static variables, built
//! in declaration order by the first initializer of the class. The class
//! also gets `values` and `valueOfWithNSString:`; the ordinal `NS_ENUM` is
//! rendered from the constant list.

use super::declaration_rewriter::{method_descriptor, TypeContext};
use super::expression_rewriter::{call_args, constructor_params, rewrite_expr};
use super::scope::BodyKind;
use super::statement_rewriter::rewrite_block;
use crate::diagnostics::TranslationResult;
use crate::metadata::runtime_annotations;
use crate::naming::{constructor_selector, static_var_name};
use objc_ir::{
    ConstantValue, EnumConstantDecl, Expr as Target, ExprKind as TargetKind, FieldDecl, FieldOwnership,
    InitializerDecl, Member as TargetMember, MethodDecl, MethodKind as TargetMethodKind, Ownership, ParamDecl,
    Stmt as TargetStmt, TypeDecl,
};
use source_model::{
    Expr, ExprKind, FieldRef, MethodRef, Modifiers, NameKind, QualifiedName, SourceType, Stmt, StmtKind,
    VarRef,
};

const CONSTANT_MODIFIERS: u32 = Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL | Modifiers::ENUM;

/// Static fields for the constants, followed by the initializer creating them
pub(super) fn add_enum_constants(ctx: &TypeContext, ty: &mut TypeDecl) -> TranslationResult<()> {
    let mapper = ctx.mapper;
    let ident = ctx.class.ident.clone();
    let enum_ty = ctx.class.descriptor.clone();
    let string_ty = mapper.map_type(&SourceType::string())?;
    let mut scope = ctx.scope(BodyKind::Static);
    let mut creations = vec![];

    for (ordinal, constant) in ctx.decl.enum_constants.iter().enumerate() {
        let class_name = constant.body.as_ref().map_or_else(|| ctx.decl.name.clone(), |b| b.name.clone());
        let class = mapper.resolve(&class_name)?;
        let selector = constructor_selector(&constructor_params(mapper, &class_name, &constant.constructor.params)?);
        let mut args = call_args(&mut scope, &constant.constructor, &constant.args)?;
        args.push(Target::constant(ConstantValue::String(constant.name.clone()), string_ty.clone()));
        args.push(Target::int(ordinal as i32));

        ty.members.push(TargetMember::Field(FieldDecl {
            name: constant.name.clone(),
            target_name: static_var_name(ident.as_str(), &constant.name),
            ty: enum_ty.clone(),
            modifiers: Modifiers::new(CONSTANT_MODIFIERS),
            is_static: true,
            constant: None,
            ownership: FieldOwnership::Strong,
            descriptor: ctx.decl.name.descriptor(),
            generic_signature: None,
            annotations: runtime_annotations(mapper, &constant.annotations)?,
            synthetic: false,
        }));

        let slot = Target::new(
            TargetKind::StaticVar {
                class: ident.clone(),
                name: constant.name.clone(),
            },
            enum_ty.clone(),
        );
        let instance = Target::new(
            TargetKind::New {
                class: class.clone(),
                selector: selector.clone(),
                args: args.clone(),
            },
            mapper.reference(&class_name)?,
        )
        .with_ownership(Ownership::Created);
        creations.push(TargetStmt::Expr(Target::strong_assign(slot, instance)));

        ty.enum_constants.push(EnumConstantDecl {
            name: constant.name.clone(),
            ordinal,
            class,
            selector,
            args,
        });
    }
    if !creations.is_empty() {
        ty.members.push(TargetMember::Initializer(InitializerDecl {
            body: creations,
            synthetic: true,
        }));
    }
    Ok(())
}

fn constant_read(enum_name: &QualifiedName, constant: &str) -> Expr {
    let ty = SourceType::named(enum_name.clone());
    Expr::new(
        ExprKind::Field {
            target: None,
            field: FieldRef {
                owner: enum_name.clone(),
                name: constant.to_string(),
                ty: ty.clone(),
                is_static: true,
                constant_value: None,
            },
        },
        ty,
    )
}

/// `values` and `valueOfWithNSString:`
pub(super) fn add_enum_methods(ctx: &TypeContext, ty: &mut TypeDecl) -> TranslationResult<()> {
    let name = &ctx.decl.name;
    let enum_ty = SourceType::named(name.clone());
    let array_ty = SourceType::array_of(enum_ty.clone());
    let mut scope = ctx.scope(BodyKind::Static);

    // return new E[] { A, B, ... };
    let all = Expr::new(
        ExprKind::NewArray {
            element: enum_ty.clone(),
            dimensions: vec![],
            initializer: Some(
                ctx.decl
                    .enum_constants
                    .iter()
                    .map(|c| constant_read(name, &c.name))
                    .collect(),
            ),
        },
        array_ty.clone(),
    );
    let mut values = MethodDecl::new("values", TargetMethodKind::Static, ctx.mapper.map_type(&array_ty)?);
    values.source_name = Some("values".to_string());
    values.modifiers = Modifiers::new(Modifiers::PUBLIC | Modifiers::STATIC);
    values.descriptor = method_descriptor(&[], &array_ty);
    values.body = Some(vec![TargetStmt::Return(Some(rewrite_expr(&mut scope, &all)?))]);
    ty.members.push(TargetMember::Method(values));

    // if (A.name().equals(name)) return A; ... throw new IllegalArgumentException(name);
    let param = VarRef::new(0, "name");
    let string = SourceType::string();
    let object_name = QualifiedName::from_binary_name("java.lang.Object", NameKind::Class);
    let object = SourceType::named(object_name.clone());
    let enum_base = QualifiedName::from_binary_name("java.lang.Enum", NameKind::Class);
    let iae = QualifiedName::from_binary_name("java.lang.IllegalArgumentException", NameKind::Class);
    let mut body = vec![];
    for constant in &ctx.decl.enum_constants {
        let constant_name = Expr::new(
            ExprKind::MethodCall {
                target: Some(Box::new(constant_read(name, &constant.name))),
                method: MethodRef::method(enum_base.clone(), "name", vec![], string.clone()),
                args: vec![],
                is_super: false,
            },
            string.clone(),
        );
        let matches = Expr::new(
            ExprKind::MethodCall {
                target: Some(Box::new(constant_name)),
                method: MethodRef::method(object_name.clone(), "equals", vec![object.clone()], SourceType::boolean()),
                args: vec![Expr::local(param.clone(), string.clone())],
                is_super: false,
            },
            SourceType::boolean(),
        );
        body.push(Stmt::new(StmtKind::If {
            cond: matches,
            then_branch: Box::new(Stmt::ret(Some(constant_read(name, &constant.name)))),
            else_branch: None,
        }));
    }
    let failure = Expr::new(
        ExprKind::New {
            class: iae.clone(),
            ctor: MethodRef::constructor(iae.clone(), vec![string.clone()]),
            args: vec![Expr::local(param.clone(), string.clone())],
            outer: None,
            body: None,
        },
        SourceType::named(iae),
    );
    body.push(Stmt::new(StmtKind::Throw(failure)));

    let mut value_of = MethodDecl::new(
        "valueOfWithNSString:",
        TargetMethodKind::Static,
        ctx.mapper.map_type(&enum_ty)?,
    );
    value_of.source_name = Some("valueOf".to_string());
    value_of.params = vec![ParamDecl {
        name: param.name.clone(),
        ty: ctx.mapper.map_type(&string)?,
    }];
    value_of.modifiers = Modifiers::new(Modifiers::PUBLIC | Modifiers::STATIC);
    value_of.descriptor = method_descriptor(&[string], &enum_ty);
    value_of.body = Some(rewrite_block(&mut scope, &body)?);
    ty.members.push(TargetMember::Method(value_of));
    Ok(())
}
