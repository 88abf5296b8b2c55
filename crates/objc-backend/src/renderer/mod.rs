// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! ObjC renderer - pure translation of declaration trees into text.
//!
//! Every decision (names, ownership operations, member order, reference
//! sets) is already made in the declaration tree; the renderers pattern
//! match IR nodes and emit the corresponding ObjC.

mod context;
mod expression_renderer;
mod implementation_renderer;
mod interface_renderer;
mod metadata_renderer;
mod method_renderer;
mod objc_writer;
mod statement_renderer;
mod type_renderer;

pub use context::ArtifactContext;
pub use expression_renderer::render_to as render_expression;
pub use implementation_renderer::render_implementation;
pub use interface_renderer::render_interface;
pub use metadata_renderer::{annotation, annotation_value};
pub use objc_writer::{render_to_string, ObjcWriter};
pub use type_renderer::type_name;
