// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Definite assignment of instance fields in constructor bodies

use crate::data::expressions::{BinaryOperator, Expr, ExprKind};
use crate::data::statements::{Block, CaseValue, Stmt};
use std::collections::BTreeSet;

/// Result of analyzing one constructor body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldInitialization {
    /// Ivars assigned on every path that completes the constructor
    pub assigned: BTreeSet<String>,
    /// Ivars that may be read (directly, or by code `self` escapes to)
    /// before they are assigned
    pub read_early: BTreeSet<String>,
}

impl FieldInitialization {
    /// Ivars that need explicit zero-initialization before the body runs
    pub fn needs_zeroing<'a>(&'a self, fields: &'a BTreeSet<String>) -> impl Iterator<Item = &'a String> + 'a {
        fields
            .iter()
            .filter(move |f| !self.assigned.contains(*f) || self.read_early.contains(*f))
    }
}

struct Analyzer<'a> {
    fields: &'a BTreeSet<String>,
    read_early: BTreeSet<String>,
    /// States at `return` statements
    exits: Vec<BTreeSet<String>>,
}

/// Analyze a constructor body for the given ivar names
pub fn analyze_constructor(body: &Block, fields: &BTreeSet<String>) -> FieldInitialization {
    let mut analyzer = Analyzer {
        fields,
        read_early: BTreeSet::new(),
        exits: vec![],
    };
    let end = analyzer.block(body, Some(BTreeSet::new()));
    let assigned = analyzer
        .exits
        .iter()
        .cloned()
        .chain(end)
        .reduce(|a, b| a.intersection(&b).cloned().collect())
        // No completing path: every field is vacuously assigned.
        .unwrap_or_else(|| fields.clone());
    FieldInitialization {
        assigned,
        read_early: analyzer.read_early,
    }
}

fn join(a: Option<BTreeSet<String>>, b: Option<BTreeSet<String>>) -> Option<BTreeSet<String>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.intersection(&b).cloned().collect()),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

fn self_ivar(e: &Expr) -> Option<&str> {
    match &e.kind {
        ExprKind::Ivar { target, name } if matches!(target.kind, ExprKind::SelfRef) => Some(name),
        _ => None,
    }
}

impl<'a> Analyzer<'a> {
    fn block(&mut self, stmts: &[Stmt], mut state: Option<BTreeSet<String>>) -> Option<BTreeSet<String>> {
        for stmt in stmts {
            let current = state?;
            state = self.stmt(stmt, current);
        }
        state
    }

    /// Returns the state on normal completion, `None` if the statement never completes normally
    fn stmt(&mut self, stmt: &Stmt, mut state: BTreeSet<String>) -> Option<BTreeSet<String>> {
        match stmt {
            Stmt::Expr(e) => {
                self.expr(e, &mut state);
                Some(state)
            }
            Stmt::LocalDecl { init, .. } => {
                if let Some(init) = init {
                    self.expr(init, &mut state);
                }
                Some(state)
            }
            Stmt::Block(b) | Stmt::Synchronized { body: b, .. } => {
                if let Stmt::Synchronized { lock, .. } = stmt {
                    self.expr(lock, &mut state);
                }
                self.block(b, Some(state))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond, &mut state);
                let t = self.block(then_branch, Some(state.clone()));
                let e = match else_branch {
                    Some(b) => self.block(b, Some(state)),
                    None => Some(state),
                };
                join(t, e)
            }
            Stmt::While { cond, body } => {
                self.expr(cond, &mut state);
                self.block(body, Some(state.clone()));
                Some(state)
            }
            Stmt::DoWhile { body, cond } => {
                let mut after = self.block(body, Some(state.clone())).unwrap_or(state);
                self.expr(cond, &mut after);
                Some(after)
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let mut state = self.block(init, Some(state))?;
                if let Some(cond) = cond {
                    self.expr(cond, &mut state);
                }
                if let Some(mut inner) = self.block(body, Some(state.clone())) {
                    for u in update {
                        self.expr(u, &mut inner);
                    }
                }
                Some(state)
            }
            Stmt::ForIn { collection, body, .. } => {
                self.expr(collection, &mut state);
                self.block(body, Some(state.clone()));
                Some(state)
            }
            Stmt::Switch { selector, cases } => {
                self.expr(selector, &mut state);
                let has_default = cases
                    .iter()
                    .any(|c| c.labels.iter().any(|l| matches!(l, CaseValue::Default)));
                let mut result = if has_default { None } else { Some(state.clone()) };
                for case in cases {
                    result = join(result, self.block(&case.body, Some(state.clone())));
                }
                result
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                let mut result = self.block(body, Some(state.clone()));
                for c in catches {
                    result = join(result, self.block(&c.body, Some(state.clone())));
                }
                match finally {
                    Some(f) => {
                        // A finally block also runs on abrupt exits; only its own
                        // assignments are certain then.
                        let base = result.unwrap_or(state);
                        self.block(f, Some(base))
                    }
                    None => result,
                }
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value, &mut state);
                }
                self.exits.push(state);
                None
            }
            Stmt::Throw(e) => {
                self.expr(e, &mut state);
                None
            }
            // Jumps stay inside the constructor; loops and switches already
            // discount their bodies.
            Stmt::Break | Stmt::Continue | Stmt::Goto(_) => Some(state),
            Stmt::Native(_) => {
                self.escape(&state);
                Some(state)
            }
            Stmt::Label(_) | Stmt::Release(_) => Some(state),
        }
    }

    /// Evaluate an expression in order, recording reads and assignments
    fn expr(&mut self, e: &Expr, state: &mut BTreeSet<String>) {
        match &e.kind {
            ExprKind::Assign { target, value, .. } | ExprKind::StrongAssign { target, value, .. } => {
                let compound = matches!(&e.kind, ExprKind::Assign { op: Some(_), .. });
                match self_ivar(target) {
                    Some(name) => {
                        if compound && !state.contains(name) {
                            self.read_early.insert(name.to_string());
                        }
                        self.expr(value, state);
                        state.insert(name.to_string());
                    }
                    None => {
                        self.expr(target, state);
                        self.expr(value, state);
                    }
                }
            }
            ExprKind::Ivar { .. } if self_ivar(e).is_some() => {
                if let Some(name) = self_ivar(e) {
                    if !state.contains(name) {
                        self.read_early.insert(name.to_string());
                    }
                }
            }
            ExprKind::Message { receiver, args, .. } => {
                self.expr(receiver, state);
                for a in args {
                    self.expr(a, state);
                }
                // Methods on self (and objects self is handed to) may read anything.
                let escapes = matches!(receiver.kind, ExprKind::SelfRef)
                    || args.iter().any(|a| matches!(a.kind, ExprKind::SelfRef));
                if escapes {
                    self.escape(state);
                }
            }
            ExprKind::New { args, .. } | ExprKind::Call { args, .. } => {
                for a in args {
                    self.expr(a, state);
                }
                if args.iter().any(|a| matches!(a.kind, ExprKind::SelfRef)) {
                    self.escape(state);
                }
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond, state);
                let mut t = state.clone();
                self.expr(then_expr, &mut t);
                let mut f = state.clone();
                self.expr(else_expr, &mut f);
                *state = t.intersection(&f).cloned().collect();
            }
            ExprKind::Binary { op, lhs, rhs } if matches!(op, BinaryOperator::And | BinaryOperator::Or) => {
                self.expr(lhs, state);
                let mut r = state.clone();
                self.expr(rhs, &mut r);
            }
            _ => {
                for child in e.children() {
                    self.expr(child, state);
                }
            }
        }
    }

    fn escape(&mut self, state: &BTreeSet<String>) {
        for f in self.fields {
            if !state.contains(f) {
                self.read_early.insert(f.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::TypeDescriptor;

    fn assign(field: &str) -> Stmt {
        Stmt::Expr(Expr::assign(
            Expr::ivar(Expr::self_ref(TypeDescriptor::id()), field, TypeDescriptor::id()),
            Expr::int(1),
        ))
    }

    fn fields(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn both_branches_assign() {
        let body = vec![Stmt::If {
            cond: Expr::bool(true),
            then_branch: vec![assign("a_"), assign("b_")],
            else_branch: Some(vec![assign("a_")]),
        }];
        let f = fields(&["a_", "b_"]);
        let result = analyze_constructor(&body, &f);
        assert_eq!(result.assigned, fields(&["a_"]));
        assert_eq!(result.needs_zeroing(&f).collect::<Vec<_>>(), vec!["b_"]);
    }

    #[test]
    fn loop_bodies_are_not_definite() {
        let body = vec![Stmt::While {
            cond: Expr::bool(true),
            body: vec![assign("a_")],
        }];
        let result = analyze_constructor(&body, &fields(&["a_"]));
        assert!(result.assigned.is_empty());
    }

    #[test]
    fn calling_methods_on_self_counts_as_early_read() {
        let call = Stmt::Expr(Expr::message(
            Expr::self_ref(TypeDescriptor::id()),
            "setup",
            vec![],
            TypeDescriptor::Void,
        ));
        let body = vec![call, assign("a_")];
        let f = fields(&["a_"]);
        let result = analyze_constructor(&body, &f);
        assert!(result.assigned.contains("a_"));
        assert!(result.read_early.contains("a_"));
        assert_eq!(result.needs_zeroing(&f).count(), 1);
    }

    #[test]
    fn early_return_paths_count() {
        let body = vec![
            Stmt::If {
                cond: Expr::bool(true),
                then_branch: vec![Stmt::Return(None)],
                else_branch: None,
            },
            assign("a_"),
        ];
        let result = analyze_constructor(&body, &fields(&["a_"]));
        assert!(result.assigned.is_empty());
    }
}
