// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Bridge methods
//!
//! Selectors are derived from erased parameter types, so an override whose
//! erasure differs from the method it overrides (`compareTo(Foo)` over
//! `compareTo(Object)`) answers a different selector. A synthetic method
//! under the overridden selector casts its arguments and forwards.

use super::declaration_rewriter::{method_descriptor, TypeContext};
use super::expression_rewriter::{erased_params, reference_cast};
use crate::diagnostics::TranslationResult;
use crate::naming::method_selector;
use objc_ir::{Expr as Target, Member as TargetMember, MethodDecl, MethodKind as TargetMethodKind, Ownership, ParamDecl, Stmt as TargetStmt, TypeDecl};
use source_model::{Member, Modifiers};

const ACCESS: u32 = Modifiers::PUBLIC | Modifiers::PROTECTED | Modifiers::PRIVATE;

pub(super) fn add_bridges(ctx: &TypeContext, ty: &mut TypeDecl) -> TranslationResult<()> {
    let mapper = ctx.mapper;
    for member in &ctx.decl.members {
        let Member::Method(method) = member else {
            continue;
        };
        if method.is_constructor() || method.modifiers.is_static() || method.overrides.is_empty() {
            continue;
        }
        let own_types = method.param_types();
        let own_selector = method_selector(&method.name, &erased_params(mapper, &own_types)?);
        let own_ret = mapper.map_erased(&method.return_type)?;

        for overridden in &method.overrides {
            let params = erased_params(mapper, &overridden.params)?;
            let selector = method_selector(&overridden.name, &params);
            if selector == own_selector || ty.has_method(&selector, false) {
                continue;
            }
            let mut bridge = MethodDecl::new(selector, TargetMethodKind::Instance, mapper.map_erased(&overridden.return_type)?);
            bridge.params = params
                .into_iter()
                .enumerate()
                .map(|(i, ty)| ParamDecl {
                    name: format!("arg{}", i),
                    ty,
                })
                .collect();

            let mut args = vec![];
            for ((param, from), to) in bridge.params.iter().zip(&overridden.params).zip(&own_types) {
                let value = Target::local(param.name.clone(), param.ty.clone());
                args.push(if from.erasure() == to.erasure() {
                    value
                } else {
                    reference_cast(mapper, value, &from.erasure(), &to.erasure())?
                });
            }
            let mut call = Target::message(
                Target::self_ref(ctx.class.descriptor.clone()),
                own_selector.clone(),
                args,
                own_ret.clone(),
            );
            if own_ret.is_object() {
                call = call.with_ownership(Ownership::Autoreleased);
            }
            bridge.body = Some(vec![if bridge.return_type.is_void() {
                TargetStmt::Expr(call)
            } else {
                TargetStmt::Return(Some(call))
            }]);
            bridge.source_name = Some(method.name.clone());
            bridge.modifiers =
                Modifiers::new((method.modifiers.bits() & ACCESS) | Modifiers::BRIDGE | Modifiers::SYNTHETIC);
            bridge.public = !method.modifiers.is_private();
            bridge.descriptor = method_descriptor(&overridden.params, &overridden.return_type);
            ty.push_synthetic(TargetMember::Method(bridge));
        }
    }
    Ok(())
}
