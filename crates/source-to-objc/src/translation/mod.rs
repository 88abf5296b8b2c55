// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Source code to target declarations
//!
//! - synthetic, captures, lambdas, renaming: desugaring of nested classes,
//!   lambdas and captured locals, run before scanning
//! - scope: per-body state of the code rewriters
//! - expression_rewriter, statement_rewriter: code
//! - declaration_rewriter: one unit to one declaration tree, with
//!   constructors, enums, interfaces and bridges built by their own modules

mod bridges;
mod captures;
mod constructors;
mod declaration_rewriter;
mod enums;
mod expression_rewriter;
mod interfaces;
mod lambdas;
mod renaming;
mod scope;
mod statement_rewriter;
mod synthetic;

#[cfg(test)]
pub(crate) mod fixtures;

pub use declaration_rewriter::{method_descriptor, rewrite_type, rewrite_unit};
pub use synthetic::desugar_unit;
