// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Source to ObjC translation core
//!
//! Takes resolved compilation units and produces one declaration tree and
//! its metadata tables per unit. Rendering the trees to text belongs to the
//! backend crate.

pub mod class_index;
pub mod diagnostics;
pub mod frontend;
pub mod metadata;
pub mod naming;
pub mod options;
pub mod pipeline;
pub mod scan;
pub mod translation;
pub mod type_mapper;

pub use diagnostics::{report_diagnostics, Diagnostic, Severity, Tally, TranslationError, TranslationResult};
pub use frontend::{collect_units, AnnotationProcessor, CollectedUnits, FrontEnd, FrontEndFailure, ResolvedUnits};
pub use options::{FileNaming, OutputStyle, PrefixOptions, TranslationOptions};
pub use pipeline::{translate, TranslatedUnit, Translation, UnitOutcome};
