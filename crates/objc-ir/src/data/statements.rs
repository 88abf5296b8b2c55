// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Target statements

use super::expressions::Expr;
use super::types::TypeDescriptor;
use serde::{Deserialize, Serialize};

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Caught class; the unconstrained `id` catches everything
    pub ty: TypeDescriptor,
    pub name: String,
    pub body: Block,
}

/// A `case` label in a C switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseValue {
    Default,
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<CaseValue>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    LocalDecl {
        name: String,
        ty: TypeDescriptor,
        init: Option<Expr>,
    },
    Block(Block),
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Block,
    },
    /// Fast enumeration (`for (id x in collection)`)
    ForIn {
        name: String,
        ty: TypeDescriptor,
        collection: Expr,
        body: Block,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Break,
    Continue,
    Goto(String),
    /// A label on an empty statement (`name: ;`)
    Label(String),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Synchronized {
        lock: Expr,
        body: Block,
    },
    /// `[name release]` at the end of a local's ownership
    Release(String),
    /// Target code supplied verbatim
    Native(String),
}

impl Stmt {
    pub fn expr(e: Expr) -> Self {
        Stmt::Expr(e)
    }

    /// Statements after which control never falls through
    pub fn is_abrupt(&self) -> bool {
        match self {
            Stmt::Return(_) | Stmt::Throw(_) | Stmt::Break | Stmt::Continue | Stmt::Goto(_) => true,
            Stmt::Block(block) => block.last().map_or(false, Stmt::is_abrupt),
            Stmt::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => {
                then_branch.last().map_or(false, Stmt::is_abrupt)
                    && else_branch.last().map_or(false, Stmt::is_abrupt)
            }
            _ => false,
        }
    }

    /// Child blocks of a compound statement, in source order
    pub fn blocks(&self) -> Vec<&Block> {
        match self {
            Stmt::Block(b)
            | Stmt::While { body: b, .. }
            | Stmt::DoWhile { body: b, .. }
            | Stmt::ForIn { body: b, .. }
            | Stmt::Synchronized { body: b, .. } => vec![b],
            Stmt::For { init, body, .. } => vec![init, body],
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => std::iter::once(then_branch).chain(else_branch.iter()).collect(),
            Stmt::Switch { cases, .. } => cases.iter().map(|c| &c.body).collect(),
            Stmt::Try {
                body,
                catches,
                finally,
            } => std::iter::once(body)
                .chain(catches.iter().map(|c| &c.body))
                .chain(finally.iter())
                .collect(),
            _ => vec![],
        }
    }

    /// Expressions evaluated directly by this statement (not nested blocks)
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Stmt::Expr(e) | Stmt::Throw(e) => vec![e],
            Stmt::LocalDecl { init, .. } | Stmt::Return(init) => init.iter().collect(),
            Stmt::If { cond, .. } | Stmt::While { cond, .. } | Stmt::DoWhile { cond, .. } => {
                vec![cond]
            }
            Stmt::For { cond, update, .. } => cond.iter().chain(update.iter()).collect(),
            Stmt::ForIn { collection, .. } => vec![collection],
            Stmt::Switch { selector, cases } => std::iter::once(selector)
                .chain(cases.iter().flat_map(|c| {
                    c.labels.iter().filter_map(|l| match l {
                        CaseValue::Expr(e) => Some(e),
                        CaseValue::Default => None,
                    })
                }))
                .collect(),
            Stmt::Synchronized { lock, .. } => vec![lock],
            _ => vec![],
        }
    }

    pub fn blocks_mut(&mut self) -> Vec<&mut Block> {
        match self {
            Stmt::Block(b)
            | Stmt::While { body: b, .. }
            | Stmt::DoWhile { body: b, .. }
            | Stmt::ForIn { body: b, .. }
            | Stmt::Synchronized { body: b, .. } => vec![b],
            Stmt::For { init, body, .. } => vec![init, body],
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => std::iter::once(then_branch).chain(else_branch.iter_mut()).collect(),
            Stmt::Switch { cases, .. } => cases.iter_mut().map(|c| &mut c.body).collect(),
            Stmt::Try {
                body,
                catches,
                finally,
            } => std::iter::once(body)
                .chain(catches.iter_mut().map(|c| &mut c.body))
                .chain(finally.iter_mut())
                .collect(),
            _ => vec![],
        }
    }

    pub fn exprs_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Stmt::Expr(e) | Stmt::Throw(e) => vec![e],
            Stmt::LocalDecl { init, .. } | Stmt::Return(init) => init.iter_mut().collect(),
            Stmt::If { cond, .. } | Stmt::While { cond, .. } | Stmt::DoWhile { cond, .. } => {
                vec![cond]
            }
            Stmt::For { cond, update, .. } => cond.iter_mut().chain(update.iter_mut()).collect(),
            Stmt::ForIn { collection, .. } => vec![collection],
            Stmt::Switch { selector, .. } => vec![selector],
            Stmt::Synchronized { lock, .. } => vec![lock],
            _ => vec![],
        }
    }

    /// True if the statement is a loop (unlabeled `break`/`continue` target)
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::ForIn { .. }
        )
    }

    /// Pre-order walk over every statement nested in this one
    pub fn for_each_stmt(&self, f: &mut impl FnMut(&Stmt)) {
        f(self);
        for block in self.blocks() {
            for stmt in block {
                stmt.for_each_stmt(f);
            }
        }
    }

    /// Every expression evaluated anywhere inside this statement
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        self.for_each_stmt(&mut |s| {
            for e in s.exprs() {
                e.for_each(f);
            }
        });
    }

    pub fn mentions_local(&self, name: &str) -> bool {
        let mut found = false;
        self.for_each_stmt(&mut |s| {
            if let Stmt::Release(n) = s {
                found |= n == name;
            }
            for e in s.exprs() {
                found |= e.mentions_local(name);
            }
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abrupt_if_requires_both_branches() {
        let ret = Stmt::Return(None);
        let both = Stmt::If {
            cond: Expr::bool(true),
            then_branch: vec![ret.clone()],
            else_branch: Some(vec![Stmt::Throw(Expr::nil())]),
        };
        assert!(both.is_abrupt());
        let one = Stmt::If {
            cond: Expr::bool(true),
            then_branch: vec![ret],
            else_branch: None,
        };
        assert!(!one.is_abrupt());
    }

    #[test]
    fn mentions_local_reaches_nested_blocks() {
        let stmt = Stmt::While {
            cond: Expr::bool(true),
            body: vec![Stmt::Block(vec![Stmt::Return(Some(Expr::local(
                "x",
                TypeDescriptor::id(),
            )))])],
        };
        assert!(stmt.mentions_local("x"));
    }
}
