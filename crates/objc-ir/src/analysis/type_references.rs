// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Type reference collection for include and forward-declaration management

use crate::data::declarations::{Member, MethodDecl, TypeDecl};
use crate::data::expressions::{Expr, ExprKind};
use crate::data::statements::Stmt;
use crate::data::types::{GeneratedIdentifier, ReferenceKind, TypeDescriptor};
use source_model::QualifiedName;
use std::collections::{BTreeMap, BTreeSet};

/// Types provided by the platform and runtime headers
const RUNTIME_TYPES: &[&str] = &["NSObject", "NSString", "NSNumber", "NSCopying", "ORTClass", "ORTStringBuilder"];

/// A type some artifact refers to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeReference {
    pub ident: GeneratedIdentifier,
    pub kind: ReferenceKind,
    pub name: QualifiedName,
}

/// Reference sets of one artifact pair. The sets are disjoint: nothing
/// included is also forward declared, nothing the interface provides is
/// repeated for the implementation, and types defined in the pair are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeReferences {
    /// Supertypes, which the interface must include
    pub interface_includes: BTreeSet<TypeReference>,
    /// Types named by public signatures
    pub interface_forwards: BTreeSet<TypeReference>,
    /// Types whose members the implementation uses
    pub implementation_includes: BTreeSet<TypeReference>,
    /// Types the implementation only names
    pub implementation_forwards: BTreeSet<TypeReference>,
}

#[derive(Default)]
struct Collector {
    refs: BTreeMap<GeneratedIdentifier, TypeReference>,
}

impl Collector {
    fn add_type(&mut self, ty: &TypeDescriptor) {
        ty.for_each_reference(&mut |ident, kind, name| {
            if kind != ReferenceKind::Id {
                self.add(ident, kind, name);
            }
        });
    }

    fn add(&mut self, ident: &GeneratedIdentifier, kind: ReferenceKind, name: &QualifiedName) {
        if RUNTIME_TYPES.contains(&ident.as_str()) {
            return;
        }
        self.refs.entry(ident.clone()).or_insert_with(|| TypeReference {
            ident: ident.clone(),
            kind,
            name: name.clone(),
        });
    }

    /// Class identifiers without a descriptor (`[Foo bar]`, `Foo_baz`)
    fn add_class(&mut self, ident: &GeneratedIdentifier, known: &BTreeMap<GeneratedIdentifier, TypeReference>) {
        if let Some(r) = known.get(ident) {
            self.refs.entry(ident.clone()).or_insert_with(|| r.clone());
        }
    }

    fn into_set(self) -> BTreeSet<TypeReference> {
        self.refs.into_values().collect()
    }
}

/// Collect the reference sets for an artifact pair holding `types`.
///
/// `known` maps class identifiers that appear without a type descriptor
/// (class receivers, static variables, helper functions) back to their
/// source names.
pub fn collect_references(
    types: &[TypeDecl],
    known: &BTreeMap<GeneratedIdentifier, TypeReference>,
) -> TypeReferences {
    let defined: BTreeSet<&GeneratedIdentifier> = types.iter().map(|t| &t.ident).collect();

    let mut supertypes = Collector::default();
    let mut signatures = Collector::default();
    let mut used = Collector::default();
    let mut named = Collector::default();

    for ty in types {
        if let Some(superclass) = &ty.superclass {
            supertypes.add_type(superclass);
        }
        for protocol in &ty.protocols {
            supertypes.add_type(protocol);
        }
        for member in &ty.members {
            match member {
                Member::Field(f) => {
                    // Ivars are declared in the interface, statics through accessors.
                    signatures.add_type(&f.ty);
                }
                Member::Method(m) => {
                    let target = if m.public { &mut signatures } else { &mut named };
                    collect_signature(m, target);
                    if let Some(body) = &m.body {
                        collect_body(body, &mut used, &mut named, known);
                    }
                }
                Member::Initializer(i) => collect_body(&i.body, &mut used, &mut named, known),
            }
        }
        for constant in &ty.enum_constants {
            used.add_class(&constant.class, known);
            for arg in &constant.args {
                collect_expr(arg, &mut used, &mut named, known);
            }
        }
    }

    let keep = |r: &TypeReference| !defined.contains(&r.ident);
    let interface_includes: BTreeSet<_> = supertypes.into_set().into_iter().filter(keep).collect();
    let in_interface = |r: &TypeReference| interface_includes.iter().any(|i| i.ident == r.ident);
    let interface_forwards: BTreeSet<_> = signatures
        .into_set()
        .into_iter()
        .filter(keep)
        .filter(|r| !in_interface(r))
        .collect();
    let implementation_includes: BTreeSet<_> = used
        .into_set()
        .into_iter()
        .filter(keep)
        .filter(|r| !in_interface(r))
        .collect();
    let implementation_forwards: BTreeSet<_> = named
        .into_set()
        .into_iter()
        .filter(keep)
        .filter(|r| !in_interface(r))
        .filter(|r| !interface_forwards.iter().any(|f| f.ident == r.ident))
        .filter(|r| !implementation_includes.iter().any(|i| i.ident == r.ident))
        .collect();

    TypeReferences {
        interface_includes,
        interface_forwards,
        implementation_includes,
        implementation_forwards,
    }
}

fn collect_signature(method: &MethodDecl, target: &mut Collector) {
    target.add_type(&method.return_type);
    for p in &method.params {
        target.add_type(&p.ty);
    }
}

fn collect_body(
    body: &[Stmt],
    used: &mut Collector,
    named: &mut Collector,
    known: &BTreeMap<GeneratedIdentifier, TypeReference>,
) {
    for stmt in body {
        stmt.for_each_stmt(&mut |s| match s {
            Stmt::LocalDecl { ty, .. } | Stmt::ForIn { ty, .. } => named.add_type(ty),
            Stmt::Try { catches, .. } => {
                for c in catches {
                    named.add_type(&c.ty);
                }
            }
            _ => {}
        });
        stmt.for_each_stmt(&mut |s| {
            for e in s.exprs() {
                collect_expr(e, used, named, known);
            }
        });
    }
}

fn collect_expr(
    expr: &Expr,
    used: &mut Collector,
    named: &mut Collector,
    known: &BTreeMap<GeneratedIdentifier, TypeReference>,
) {
    expr.for_each(&mut |e| {
        named.add_type(&e.ty);
        match &e.kind {
            ExprKind::Message { receiver, .. } => used.add_type(&receiver.ty),
            ExprKind::Ivar { target, .. } => used.add_type(&target.ty),
            ExprKind::ClassRef(class)
            | ExprKind::ProtocolRef(class)
            | ExprKind::New { class, .. }
            | ExprKind::StaticVar { class, .. }
            | ExprKind::Macro { class, .. }
            | ExprKind::Call {
                owner: Some(class), ..
            } => used.add_class(class, known),
            ExprKind::Cast { ty, .. } => named.add_type(ty),
            _ => {}
        }
    });
}
