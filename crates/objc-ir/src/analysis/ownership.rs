// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Ownership balancing pass
//!
//! Every `Created` expression must end up in exactly one consuming position:
//!
//! - the initializer of an object local whose releases this pass can place
//!   on every exit of the local's scope,
//! - the value of a `StrongAssign`/`ArraySet`, which takes the reference over,
//! - an `Autorelease` wrapper, which the autorelease pool balances.
//!
//! Anything the pass cannot prove is demoted to `Autorelease`, which is
//! always balanced. That covers escape through `return` or `throw`, copies
//! into other locals or plain stores, reassignment, locals inside `@try` and
//! jumps out of `@try` bodies. Receivers, arguments, operands and strong
//! stores do not keep the local alive.

use crate::data::expressions::{Expr, ExprKind, Ownership};
use crate::data::statements::{Block, Stmt};
use log::debug;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Counters describing what the pass did to one body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipReport {
    /// Locals released on every exit of their scope
    pub released_locals: usize,
    /// Locals whose value was demoted to autorelease
    pub demoted_locals: usize,
    /// Created values autoreleased in place (arguments, returns, receivers)
    pub autoreleased: usize,
    /// Created values consumed by strong stores
    pub consumed: usize,
}

/// Balance every created value in a body
pub fn balance_ownership(body: &mut Block) -> OwnershipReport {
    let mut report = OwnershipReport::default();
    for stmt in body.iter_mut() {
        normalize_stmt(stmt, &mut report);
    }
    place_releases(body, false, &mut report);
    debug!(
        "ownership: {} released, {} demoted, {} autoreleased, {} consumed",
        report.released_locals, report.demoted_locals, report.autoreleased, report.consumed
    );
    report
}

// ============================================================================
// Normalization: every created value not in a consuming position is autoreleased
// ============================================================================

fn normalize_stmt(stmt: &mut Stmt, report: &mut OwnershipReport) {
    match stmt {
        Stmt::LocalDecl {
            ty, init: Some(init), ..
        } if ty.is_object() => {
            // Candidate consuming position; decided by `place_releases`.
            normalize_children(init, report);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            for s in init.iter_mut() {
                normalize_stmt(s, report);
                // Loop headers are not release scopes.
                if let Stmt::LocalDecl { init: Some(e), .. } = s {
                    autorelease_if_created(e, report);
                }
            }
            if let Some(cond) = cond {
                normalize_expr(cond, report);
            }
            for e in update.iter_mut() {
                normalize_expr(e, report);
            }
            for s in body.iter_mut() {
                normalize_stmt(s, report);
            }
        }
        _ => {
            for e in stmt.exprs_mut() {
                normalize_expr(e, report);
            }
            for block in stmt.blocks_mut() {
                for s in block.iter_mut() {
                    normalize_stmt(s, report);
                }
            }
        }
    }
}

/// Normalize an expression in a non-consuming position
fn normalize_expr(e: &mut Expr, report: &mut OwnershipReport) {
    normalize_children(e, report);
    autorelease_if_created(e, report);
}

fn normalize_children(e: &mut Expr, report: &mut OwnershipReport) {
    match &mut e.kind {
        ExprKind::StrongAssign { target, value, consume } => {
            normalize_expr(target, report);
            normalize_children(value, report);
            if value.is_created() {
                *consume = true;
                report.consumed += 1;
            }
        }
        ExprKind::ArraySet {
            array,
            index,
            value,
            consume,
        } => {
            normalize_expr(array, report);
            normalize_expr(index, report);
            normalize_children(value, report);
            if value.is_created() {
                *consume = true;
                report.consumed += 1;
            }
        }
        ExprKind::Autorelease(inner) => normalize_children(inner, report),
        _ => {
            for child in e.children_mut() {
                normalize_expr(child, report);
            }
        }
    }
}

fn autorelease_if_created(e: &mut Expr, report: &mut OwnershipReport) {
    if e.is_created() {
        let inner = std::mem::replace(e, Expr::nil());
        *e = inner.autorelease();
        report.autoreleased += 1;
    }
}

// ============================================================================
// Release placement for locals holding created values
// ============================================================================

fn place_releases(block: &mut Block, in_try: bool, report: &mut OwnershipReport) {
    // Nested scopes first; their releases are ordinary statements for the outer scope.
    for stmt in block.iter_mut() {
        match stmt {
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                place_releases(body, true, report);
                for c in catches.iter_mut() {
                    place_releases(&mut c.body, true, report);
                }
                if let Some(finally) = finally {
                    place_releases(finally, true, report);
                }
            }
            Stmt::For { body, .. } => place_releases(body, in_try, report),
            other => {
                for b in other.blocks_mut() {
                    place_releases(b, in_try, report);
                }
            }
        }
    }

    let candidates: Vec<usize> = block
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            matches!(s, Stmt::LocalDecl { ty, init: Some(init), .. } if ty.is_object() && init.is_created())
        })
        .map(|(i, _)| i)
        .collect();

    for &i in candidates.iter().rev() {
        let name = match &block[i] {
            Stmt::LocalDecl { name, .. } => name.clone(),
            _ => continue,
        };
        if in_try || !provable(&block[i + 1..], &name) {
            if let Stmt::LocalDecl { init: Some(init), .. } = &mut block[i] {
                autorelease_if_created(init, report);
            }
            report.demoted_locals += 1;
            continue;
        }
        let labels = labels_in(&block[i + 1..]);
        let mut rest: Block = block.drain(i + 1..).collect();
        insert_exit_releases(&mut rest, &name, &labels, Nesting::default());
        let falls_through = rest.last().map_or(true, |s| !s.is_abrupt());
        block.extend(rest);
        if falls_through {
            block.push(Stmt::Release(name));
        }
        report.released_locals += 1;
    }
}

/// Whether releases can be placed for `name` over the remainder of its scope
fn provable(rest: &[Stmt], name: &str) -> bool {
    let mut ok = true;
    for stmt in rest {
        stmt.for_each_stmt(&mut |s| match s {
            Stmt::Try { .. } if s.mentions_local(name) || contains_jump(s) => ok = false,
            Stmt::Expr(e) => ok &= !escapes(e, name, true),
            Stmt::LocalDecl { init: Some(e), .. } | Stmt::Return(Some(e)) | Stmt::Throw(e) => {
                ok &= !escapes(e, name, false)
            }
            _ => {
                for e in s.exprs() {
                    ok &= !escapes(e, name, true);
                }
            }
        });
    }
    ok
}

/// Whether `e` lets the value of `name` outlive the local: reassigning it,
/// copying it into another unretained slot, or yielding it where `in_use`
/// is false (initializers, returned and thrown values, assigned values)
fn escapes(e: &Expr, name: &str, in_use: bool) -> bool {
    match &e.kind {
        ExprKind::Local(n) => n == name && !in_use,
        ExprKind::Assign { target, value, .. } => {
            matches!(&target.kind, ExprKind::Local(n) if n == name)
                || escapes(target, name, true)
                || escapes(value, name, false)
        }
        ExprKind::Cast { expr, .. } | ExprKind::Autorelease(expr) => escapes(expr, name, in_use),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            escapes(cond, name, true) || escapes(then_expr, name, in_use) || escapes(else_expr, name, in_use)
        }
        ExprKind::AddressOf(_) | ExprKind::CArrayLiteral { .. } => e.mentions_local(name),
        // Receivers, arguments, operands and strong stores.
        _ => e.children().into_iter().any(|c| escapes(c, name, true)),
    }
}

fn contains_jump(stmt: &Stmt) -> bool {
    let mut found = false;
    for block in stmt.blocks() {
        for s in block {
            s.for_each_stmt(&mut |s| {
                found |= matches!(
                    s,
                    Stmt::Return(_) | Stmt::Break | Stmt::Continue | Stmt::Goto(_)
                );
            });
        }
    }
    found
}

fn labels_in(stmts: &[Stmt]) -> Vec<String> {
    let mut labels = vec![];
    for stmt in stmts {
        stmt.for_each_stmt(&mut |s| {
            if let Stmt::Label(l) = s {
                labels.push(l.clone());
            }
        });
    }
    labels
}

/// Enclosing constructs between an exit and the local's scope
#[derive(Debug, Clone, Copy, Default)]
struct Nesting {
    loops: usize,
    switches: usize,
}

fn leaves_scope(stmt: &Stmt, labels: &[String], nesting: Nesting) -> bool {
    match stmt {
        Stmt::Return(_) | Stmt::Throw(_) => true,
        Stmt::Break => nesting.loops == 0 && nesting.switches == 0,
        Stmt::Continue => nesting.loops == 0,
        Stmt::Goto(label) => !labels.contains(label),
        _ => false,
    }
}

fn insert_exit_releases(block: &mut Block, name: &str, labels: &[String], nesting: Nesting) {
    let mut i = 0;
    while i < block.len() {
        if leaves_scope(&block[i], labels, nesting) {
            block.insert(i, Stmt::Release(name.to_string()));
            i += 2;
            continue;
        }
        let inner = Nesting {
            loops: nesting.loops + usize::from(block[i].is_loop()),
            switches: nesting.switches + usize::from(matches!(block[i], Stmt::Switch { .. })),
        };
        for b in block[i].blocks_mut() {
            insert_exit_releases(b, name, labels, inner);
        }
        i += 1;
    }
}

// ============================================================================
// Verification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipViolation {
    /// A created value outside any consuming position
    Unbalanced { description: String },
    /// A path through a local's scope that releases it `count` times
    ReleaseCount { local: String, count: usize },
}

impl Display for OwnershipViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipViolation::Unbalanced { description } => {
                write!(f, "created value is never balanced: {}", description)
            }
            OwnershipViolation::ReleaseCount { local, count } => {
                write!(f, "local `{}` is released {} times on some path", local, count)
            }
        }
    }
}

/// Check that every created value is consumed exactly once on every path
pub fn verify_ownership(body: &Block) -> Vec<OwnershipViolation> {
    let mut violations = vec![];
    verify_block(body, &mut violations);
    violations
}

fn verify_block(block: &Block, violations: &mut Vec<OwnershipViolation>) {
    for (i, stmt) in block.iter().enumerate() {
        match stmt {
            Stmt::LocalDecl {
                name,
                ty,
                init: Some(init),
            } if ty.is_object() && init.is_created() => {
                verify_expr_children(init, violations);
                let labels = labels_in(&block[i + 1..]);
                let mut exits = vec![];
                let end = count_releases(
                    &block[i + 1..],
                    name,
                    BTreeSet::from([0]),
                    &labels,
                    Nesting::default(),
                    &mut exits,
                );
                exits.extend(end);
                for count in exits {
                    if count != 1 {
                        violations.push(OwnershipViolation::ReleaseCount {
                            local: name.clone(),
                            count,
                        });
                    }
                }
            }
            _ => {
                for e in stmt.exprs() {
                    verify_expr(e, violations);
                }
            }
        }
        for b in stmt.blocks() {
            verify_block(b, violations);
        }
    }
}

fn verify_expr(e: &Expr, violations: &mut Vec<OwnershipViolation>) {
    if e.ownership == Ownership::Created {
        violations.push(OwnershipViolation::Unbalanced {
            description: format!("{:?}", e.kind).chars().take(80).collect(),
        });
    }
    verify_expr_children(e, violations);
}

fn verify_expr_children(e: &Expr, violations: &mut Vec<OwnershipViolation>) {
    match &e.kind {
        ExprKind::StrongAssign { target, value, consume } => {
            verify_expr(target, violations);
            if *consume {
                verify_expr_children(value, violations);
            } else {
                verify_expr(value, violations);
            }
        }
        ExprKind::ArraySet {
            array,
            index,
            value,
            consume,
        } => {
            verify_expr(array, violations);
            verify_expr(index, violations);
            if *consume {
                verify_expr_children(value, violations);
            } else {
                verify_expr(value, violations);
            }
        }
        ExprKind::Autorelease(inner) => verify_expr_children(inner, violations),
        _ => {
            for child in e.children() {
                verify_expr(child, violations);
            }
        }
    }
}

/// Possible release counts of `name` along paths through `stmts`. Counts at
/// exits leaving the scope are pushed to `exits`; the result holds the counts
/// on fall-through and is empty when control cannot fall through.
fn count_releases(
    stmts: &[Stmt],
    name: &str,
    mut counts: BTreeSet<usize>,
    labels: &[String],
    nesting: Nesting,
    exits: &mut Vec<usize>,
) -> BTreeSet<usize> {
    for stmt in stmts {
        if counts.is_empty() {
            break;
        }
        if leaves_scope(stmt, labels, nesting) {
            exits.extend(counts.iter().copied());
            return BTreeSet::new();
        }
        match stmt {
            Stmt::Release(n) if n == name => counts = counts.iter().map(|c| c + 1).collect(),
            Stmt::Break | Stmt::Continue | Stmt::Goto(_) => return BTreeSet::new(),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut joined = count_releases(then_branch, name, counts.clone(), labels, nesting, exits);
                match else_branch {
                    Some(b) => joined.extend(count_releases(b, name, counts, labels, nesting, exits)),
                    None => joined.extend(counts),
                }
                counts = joined;
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                let mut joined = count_releases(body, name, counts.clone(), labels, nesting, exits);
                for c in catches {
                    joined.extend(count_releases(&c.body, name, counts.clone(), labels, nesting, exits));
                }
                counts = match finally {
                    Some(f) => count_releases(f, name, joined, labels, nesting, exits),
                    None => joined,
                };
            }
            Stmt::Block(b) | Stmt::Synchronized { body: b, .. } => {
                counts = count_releases(b, name, counts, labels, nesting, exits);
            }
            s if s.is_loop() || matches!(s, Stmt::Switch { .. }) => {
                let inner = Nesting {
                    loops: nesting.loops + usize::from(s.is_loop()),
                    switches: nesting.switches + usize::from(!s.is_loop()),
                };
                let max_before = counts.iter().copied().max().unwrap_or(0);
                let mut joined = counts.clone();
                for b in s.blocks() {
                    let before = exits.len();
                    let after = count_releases(b, name, counts.clone(), labels, inner, exits);
                    let released_inside = after.iter().any(|&c| c > max_before)
                        || exits[before..].iter().any(|&c| c > max_before);
                    if released_inside && s.is_loop() {
                        // The body may run more than once.
                        exits.push(max_before + 2);
                    }
                    joined.extend(after);
                }
                counts = joined;
            }
            _ => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::expressions::BinaryOperator;
    use crate::data::types::{GeneratedIdentifier, PrimitiveType, TypeDescriptor};

    fn created() -> Expr {
        Expr::new(
            ExprKind::New {
                class: GeneratedIdentifier::new("Foo"),
                selector: "init".to_string(),
                args: vec![],
            },
            TypeDescriptor::id(),
        )
        .with_ownership(Ownership::Created)
    }

    fn decl(name: &str) -> Stmt {
        Stmt::LocalDecl {
            name: name.to_string(),
            ty: TypeDescriptor::id(),
            init: Some(created()),
        }
    }

    fn use_local(name: &str) -> Stmt {
        Stmt::Expr(Expr::message(
            Expr::local(name, TypeDescriptor::id()),
            "run",
            vec![],
            TypeDescriptor::Void,
        ))
    }

    #[test]
    fn local_released_at_block_end() {
        let mut body = vec![decl("x"), use_local("x")];
        let report = balance_ownership(&mut body);
        assert_eq!(report.released_locals, 1);
        assert_eq!(body.last(), Some(&Stmt::Release("x".to_string())));
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn local_released_before_each_exit() {
        let mut body = vec![
            decl("x"),
            Stmt::If {
                cond: Expr::bool(true),
                then_branch: vec![Stmt::Return(None)],
                else_branch: None,
            },
            use_local("x"),
        ];
        balance_ownership(&mut body);
        match &body[1] {
            Stmt::If { then_branch, .. } => {
                assert_eq!(then_branch[0], Stmt::Release("x".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn returned_local_is_demoted() {
        let mut body = vec![decl("x"), Stmt::Return(Some(Expr::local("x", TypeDescriptor::id())))];
        let report = balance_ownership(&mut body);
        assert_eq!(report.demoted_locals, 1);
        match &body[0] {
            Stmt::LocalDecl { init: Some(init), .. } => {
                assert_eq!(init.ownership, Ownership::Autoreleased)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!body.iter().any(|s| matches!(s, Stmt::Release(_))));
        assert!(verify_ownership(&body).is_empty());
    }

    fn init_of<'a>(body: &'a [Stmt], name: &str) -> Option<&'a Expr> {
        for stmt in body {
            if let Stmt::LocalDecl { name: n, init: Some(init), .. } = stmt {
                if n == name {
                    return Some(init);
                }
            }
            if let Some(init) = stmt.blocks().into_iter().find_map(|b| init_of(b, name)) {
                return Some(init);
            }
        }
        None
    }

    fn released(body: &[Stmt], name: &str) -> bool {
        let mut found = false;
        for stmt in body {
            stmt.for_each_stmt(&mut |s| found |= matches!(s, Stmt::Release(n) if n == name));
        }
        found
    }

    #[test]
    fn aliased_local_is_demoted() {
        let mut body = vec![
            decl("x"),
            Stmt::LocalDecl {
                name: "y".to_string(),
                ty: TypeDescriptor::id(),
                init: Some(Expr::local("x", TypeDescriptor::id())),
            },
            Stmt::Return(Some(Expr::local("y", TypeDescriptor::id()))),
        ];
        let report = balance_ownership(&mut body);
        assert_eq!(report.demoted_locals, 1);
        assert_eq!(report.released_locals, 0);
        assert_eq!(init_of(&body, "x").unwrap().ownership, Ownership::Autoreleased);
        assert!(!released(&body, "x"));
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn copy_out_of_loop_is_demoted() {
        let mut body = vec![
            Stmt::LocalDecl {
                name: "last".to_string(),
                ty: TypeDescriptor::id(),
                init: Some(Expr::nil()),
            },
            Stmt::While {
                cond: Expr::bool(true),
                body: vec![
                    decl("item"),
                    Stmt::Expr(Expr::assign(
                        Expr::local("last", TypeDescriptor::id()),
                        Expr::local("item", TypeDescriptor::id()),
                    )),
                ],
            },
            use_local("last"),
        ];
        let report = balance_ownership(&mut body);
        assert_eq!(report.demoted_locals, 1);
        assert_eq!(init_of(&body, "item").unwrap().ownership, Ownership::Autoreleased);
        assert!(!released(&body, "item"));
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn conditional_return_is_demoted() {
        let choice = Expr::new(
            ExprKind::Conditional {
                cond: Box::new(Expr::bool(true)),
                then_expr: Box::new(Expr::local("x", TypeDescriptor::id())),
                else_expr: Box::new(Expr::nil()),
            },
            TypeDescriptor::id(),
        );
        let mut body = vec![decl("x"), Stmt::Return(Some(choice))];
        let report = balance_ownership(&mut body);
        assert_eq!(report.demoted_locals, 1);
        assert_eq!(init_of(&body, "x").unwrap().ownership, Ownership::Autoreleased);
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn in_place_uses_keep_the_release() {
        let x = || Expr::local("x", TypeDescriptor::id());
        let field = Expr::ivar(Expr::self_ref(TypeDescriptor::id()), "f_", TypeDescriptor::id());
        let mut body = vec![
            decl("x"),
            use_local("x"),
            Stmt::Expr(Expr::message(
                Expr::self_ref(TypeDescriptor::id()),
                "takeWithId:",
                vec![x()],
                TypeDescriptor::Void,
            )),
            Stmt::If {
                cond: Expr::binary(BinaryOperator::Eq, x(), Expr::nil(), TypeDescriptor::Primitive(PrimitiveType::Bool)),
                then_branch: vec![Stmt::Return(None)],
                else_branch: None,
            },
            Stmt::Expr(Expr::strong_assign(field, x())),
        ];
        let report = balance_ownership(&mut body);
        assert_eq!(report.released_locals, 1);
        assert_eq!(report.demoted_locals, 0);
        assert_eq!(init_of(&body, "x").unwrap().ownership, Ownership::Created);
        assert_eq!(body.last(), Some(&Stmt::Release("x".to_string())));
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn arguments_are_autoreleased_and_stores_consume() {
        let field = Expr::ivar(Expr::self_ref(TypeDescriptor::id()), "f_", TypeDescriptor::id());
        let mut body = vec![
            Stmt::Expr(Expr::message(
                Expr::self_ref(TypeDescriptor::id()),
                "takeWithId:",
                vec![created()],
                TypeDescriptor::Void,
            )),
            Stmt::Expr(Expr::strong_assign(field, created())),
        ];
        let report = balance_ownership(&mut body);
        assert_eq!(report.autoreleased, 1);
        assert_eq!(report.consumed, 1);
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn break_inside_nested_loop_stays_in_scope() {
        let mut body = vec![
            decl("x"),
            Stmt::While {
                cond: Expr::bool(true),
                body: vec![Stmt::Break],
            },
            Stmt::Continue,
        ];
        balance_ownership(&mut body);
        match &body[1] {
            Stmt::While { body, .. } => assert_eq!(body, &vec![Stmt::Break]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(body[2], Stmt::Release("x".to_string()));
        assert!(verify_ownership(&body).is_empty());
    }

    #[test]
    fn verifier_flags_double_release_in_loop() {
        let body = vec![
            decl("x"),
            Stmt::While {
                cond: Expr::bool(true),
                body: vec![Stmt::Release("x".to_string())],
            },
        ];
        assert!(!verify_ownership(&body).is_empty());
    }
}
