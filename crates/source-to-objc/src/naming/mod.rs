// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Naming of generated code
//!
//! - mangle: qualified names to type identifiers
//! - registry: the run-wide, two-phase name registry
//! - reserved: reserved words and root-class selectors
//! - selectors: member names derived from signatures

mod mangle;
mod registry;
mod reserved;
mod selectors;

pub use mangle::{camel_case_package, mangle_package_info, mangle_type, package_prefix, well_known};
pub use registry::{NameRegistry, RegistryBuilder};
pub use reserved::{escape_identifier, is_reserved_identifier, is_reserved_selector};
pub use selectors::{
    capture_field_name, capture_param_name, constructor_selector, default_method_function, enum_ordinal_name,
    ivar_name, local_name, method_selector, selector_arity, static_getter, static_ref_getter, static_var_name,
    ENUM_NAME_PARAM, ENUM_ORDINAL_PARAM, OUTER_FIELD, OUTER_PARAM,
};
