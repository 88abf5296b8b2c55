// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Per-body state threaded through the code rewriters

use crate::diagnostics::{TranslationError, TranslationResult};
use crate::naming::{ivar_name, OUTER_FIELD};
use crate::type_mapper::TypeMapper;
use objc_ir::{Expr, GeneratedIdentifier, TypeDescriptor};
use source_model::{Location, QualifiedName, SourceType};
use std::collections::BTreeSet;

/// The class whose code is being rewritten
#[derive(Debug, Clone)]
pub struct ClassContext {
    pub name: QualifiedName,
    pub ident: GeneratedIdentifier,
    pub descriptor: TypeDescriptor,
}

impl ClassContext {
    pub fn new(mapper: TypeMapper<'_>, name: &QualifiedName) -> TranslationResult<Self> {
        Ok(Self {
            name: name.clone(),
            ident: mapper.resolve(name)?,
            descriptor: mapper.reference(name)?,
        })
    }
}

/// Where the rewritten code will run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Instance,
    Static,
    Constructor,
    /// Interface default method compiled to a function whose first
    /// parameter is named `self`
    Function,
}

pub struct Scope<'a> {
    pub mapper: TypeMapper<'a>,
    pub class: &'a ClassContext,
    pub kind: BodyKind,
    temps: usize,
    /// Labels targeted by `goto`, so unused ones are not emitted
    jumps: BTreeSet<String>,
}

impl<'a> Scope<'a> {
    pub fn new(mapper: TypeMapper<'a>, class: &'a ClassContext, kind: BodyKind) -> Self {
        Self {
            mapper,
            class,
            kind,
            temps: 0,
            jumps: BTreeSet::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Fresh local name for a synthesized temporary
    pub fn temp(&mut self, hint: &str) -> String {
        self.temps += 1;
        format!("{}${}", hint, self.temps)
    }

    pub fn map(&self, ty: &SourceType) -> TranslationResult<TypeDescriptor> {
        self.mapper.map_type(ty)
    }

    pub fn self_expr(&self) -> Expr {
        Expr::self_ref(self.class.descriptor.clone())
    }

    pub fn jump_to(&mut self, label: &str) -> String {
        self.jumps.insert(label.to_string());
        label.to_string()
    }

    pub fn is_jumped_to(&self, label: &str) -> bool {
        self.jumps.contains(label)
    }

    /// An instance of `target` reachable from `self`: `self` itself when it
    /// is one, else the first enclosing instance along the `this$0` chain.
    /// With `skip_self`, the search starts at the enclosing instance (the
    /// implicit outer instance of a superclass constructor).
    pub fn enclosing_instance(
        &self,
        target: &QualifiedName,
        skip_self: bool,
        location: Location,
    ) -> TranslationResult<Expr> {
        let index = self.mapper.index();
        let unreachable = || TranslationError::unsupported(format!("reference to an enclosing instance of `{}`", target), location);
        if self.is_static() {
            return Err(unreachable());
        }
        let mut current = self.class.name.clone();
        let mut instance = self.self_expr();
        let mut first = true;
        loop {
            if !(first && skip_self) && (current == *target || index.is_subtype(&current, target)) {
                return Ok(instance);
            }
            first = false;
            let outer = index.get(&current).and_then(|info| info.outer.clone()).ok_or_else(unreachable)?;
            let ty = self.mapper.reference(&outer)?;
            instance = Expr::ivar(instance, ivar_name(OUTER_FIELD), ty);
            current = outer;
        }
    }
}
