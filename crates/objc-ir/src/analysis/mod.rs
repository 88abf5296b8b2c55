// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Analyses and passes over declaration trees and method bodies

mod declaration_order;
mod field_initialization;
mod ownership;
mod type_references;

pub use declaration_order::order_by_supertypes;
pub use field_initialization::{analyze_constructor, FieldInitialization};
pub use ownership::{balance_ownership, verify_ownership, OwnershipReport, OwnershipViolation};
pub use type_references::{collect_references, TypeReference, TypeReferences};
