// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Interfaces with code
//!
//! An interface becomes a protocol plus a companion class with the same
//! identifier. Static methods are class methods of the companion. A default
//! method is declared in the protocol and its body compiled to a function
//! `Iface_selector_` taking the receiver as `self`; classes inheriting the
//! default without implementing it get a forwarding method.

use super::declaration_rewriter::{describe, method_body, method_descriptor, rewrite_method, signature, TypeContext};
use super::expression_rewriter::erased_params;
use super::scope::BodyKind;
use crate::diagnostics::TranslationResult;
use crate::naming::{default_method_function, method_selector};
use objc_ir::{
    Expr as Target, Member as TargetMember, MethodDecl, MethodKind as TargetMethodKind, Ownership, ParamDecl,
    Stmt as TargetStmt, TypeDecl,
};
use source_model::{MethodDeclaration, Modifiers};

pub(super) fn rewrite_interface_method(
    ctx: &TypeContext,
    method: &MethodDeclaration,
) -> TranslationResult<Vec<TargetMember>> {
    if method.modifiers.is_static() {
        return Ok(vec![TargetMember::Method(rewrite_method(ctx, method)?)]);
    }
    let (selector, params, ret) = signature(ctx.mapper, method)?;
    let mut declared = MethodDecl::new(selector.clone(), TargetMethodKind::Instance, ret.clone());
    declared.params = params.clone();
    describe(ctx, &mut declared, method)?;
    if method.body.is_none() {
        return Ok(vec![TargetMember::Method(declared)]);
    }
    declared.modifiers = declared.modifiers.with(Modifiers::DEFAULT);

    let mut function = MethodDecl::new(
        default_method_function(ctx.class.ident.as_str(), &selector),
        TargetMethodKind::Function,
        ret,
    );
    function.params.push(ParamDecl {
        name: "self".to_string(),
        ty: ctx.class.descriptor.clone(),
    });
    function.params.extend(params);
    describe(ctx, &mut function, method)?;
    function.public = true;
    function.body = method_body(ctx, method, BodyKind::Function)?;
    Ok(vec![TargetMember::Method(declared), TargetMember::Method(function)])
}

/// Forwarding methods for default methods a class inherits without an
/// implementation anywhere in its superclass chain
pub(super) fn add_default_forwarders(ctx: &TypeContext, ty: &mut TypeDecl) -> TranslationResult<()> {
    let mapper = ctx.mapper;
    for (iface, method) in mapper.index().inherited_defaults(&ctx.decl.name) {
        let params = erased_params(mapper, &method.params)?;
        let selector = method_selector(&method.name, &params);
        if ty.has_method(&selector, false) {
            continue;
        }
        let owner = mapper.resolve(&iface)?;
        let ret = mapper.map_erased(&method.return_type)?;

        let mut forwarder = MethodDecl::new(selector.clone(), TargetMethodKind::Instance, ret.clone());
        forwarder.params = params
            .into_iter()
            .enumerate()
            .map(|(i, ty)| ParamDecl {
                name: format!("arg{}", i),
                ty,
            })
            .collect();
        let mut args = vec![Target::self_ref(ctx.class.descriptor.clone())];
        args.extend(forwarder.params.iter().map(|p| Target::local(p.name.clone(), p.ty.clone())));
        let function = default_method_function(owner.as_str(), &selector);
        let mut call = Target::class_call(owner, function, args, ret.clone());
        if ret.is_object() {
            call = call.with_ownership(Ownership::Autoreleased);
        }
        forwarder.body = Some(vec![if ret.is_void() {
            TargetStmt::Expr(call)
        } else {
            TargetStmt::Return(Some(call))
        }]);
        forwarder.source_name = Some(method.name.clone());
        forwarder.modifiers = Modifiers::new(Modifiers::PUBLIC);
        forwarder.descriptor = method_descriptor(&method.params, &method.return_type);
        ty.push_synthetic(TargetMember::Method(forwarder));
    }
    Ok(())
}
