// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Member naming: selectors, ivars, static variables and helper functions.
//!
//! These are pure functions of the member and its parameter types; members
//! are never registered, since their names are scoped by the owning type.

use super::reserved::{escape_identifier, is_reserved_selector, mapped_root_selector};
use objc_ir::TypeDescriptor;

/// Keyword part for one parameter: `withInt:`, `withNSString:`
fn param_keywords(params: &[TypeDescriptor]) -> String {
    params
        .iter()
        .map(|p| format!("with{}:", p.selector_keyword()))
        .collect()
}

/// Selector of a method: `foo`, `fooWithInt:withNSString:`
pub fn method_selector(name: &str, params: &[TypeDescriptor]) -> String {
    if let Some(mapped) = mapped_root_selector(name, params.len()) {
        return mapped.to_string();
    }
    let selector = format!("{}{}", name, param_keywords(params));
    if is_reserved_selector(&selector) {
        format!("{}__", selector)
    } else {
        selector
    }
}

/// Selector of a constructor: `init`, `initWithInt:`
pub fn constructor_selector(params: &[TypeDescriptor]) -> String {
    let keywords = param_keywords(params);
    if keywords.is_empty() {
        "init".to_string()
    } else {
        // `initWith...` keeps the capital of the first keyword.
        format!("init{}", capitalize_keywords(&keywords))
    }
}

fn capitalize_keywords(keywords: &str) -> String {
    let mut chars = keywords.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Number of arguments a selector takes
pub fn selector_arity(selector: &str) -> usize {
    selector.matches(':').count()
}

/// Instance variable for a source field
pub fn ivar_name(field: &str) -> String {
    format!("{}_", field)
}

/// Static variable for a source field: `Foo_bar`
pub fn static_var_name(class: &str, field: &str) -> String {
    format!("{}_{}", class, field)
}

/// Accessor functions of a static variable, for code outside its class
pub fn static_getter(class: &str, field: &str) -> String {
    format!("{}_get_{}", class, field)
}

pub fn static_ref_getter(class: &str, field: &str) -> String {
    format!("{}_getRef_{}", class, field)
}

/// Function holding an interface default method body: `Foo_barWithInt_`
pub fn default_method_function(class: &str, selector: &str) -> String {
    format!("{}_{}", class, selector.replace(':', "_"))
}

/// Constant of the ordinal `NS_ENUM`: `Color_Enum_RED`
pub fn enum_ordinal_name(constant: &str) -> String {
    format!("Enum_{}", constant)
}

/// Back-reference field to the enclosing instance
pub const OUTER_FIELD: &str = "this$0";

/// Constructor parameter carrying the enclosing instance
pub const OUTER_PARAM: &str = "outer$";

/// Trailing constructor parameters of enums and enum constant classes
pub const ENUM_NAME_PARAM: &str = "__name";
pub const ENUM_ORDINAL_PARAM: &str = "__ordinal";

/// Field holding a captured local
pub fn capture_field_name(local: &str) -> String {
    format!("val${}", local)
}

/// Constructor parameter carrying a captured local
pub fn capture_param_name(local: &str) -> String {
    format!("capture${}", local)
}

/// Local or parameter name
pub fn local_name(name: &str) -> String {
    escape_identifier(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_ir::{GeneratedIdentifier, PrimitiveType, ReferenceKind};
    use source_model::{NameKind, QualifiedName};

    fn string() -> TypeDescriptor {
        TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new("NSString"),
            kind: ReferenceKind::Class,
            name: QualifiedName::from_binary_name("java.lang.String", NameKind::Class),
        }
    }

    #[test]
    fn selectors_name_parameter_types() {
        let int = TypeDescriptor::Primitive(PrimitiveType::Int32);
        assert_eq!(method_selector("foo", &[]), "foo");
        assert_eq!(method_selector("foo", &[int.clone(), string()]), "fooWithInt:withNSString:");
        assert_eq!(constructor_selector(&[]), "init");
        assert_eq!(constructor_selector(&[int]), "initWithInt:");
        assert_eq!(selector_arity("fooWithInt:withNSString:"), 2);
    }

    #[test]
    fn reserved_selectors_are_escaped_unless_mapped() {
        assert_eq!(method_selector("hash", &[]), "hash__");
        assert_eq!(method_selector("hashCode", &[]), "hash");
        assert_eq!(method_selector("toString", &[]), "description");
        assert_eq!(method_selector("equals", &[TypeDescriptor::id()]), "isEqual:");
        assert_eq!(method_selector("copy", &[]), "copy__");
    }

    #[test]
    fn member_names() {
        assert_eq!(ivar_name("count"), "count_");
        assert_eq!(static_var_name("Foo", "bar"), "Foo_bar");
        assert_eq!(static_getter("Foo", "bar"), "Foo_get_bar");
        assert_eq!(default_method_function("Api", "runWithInt:"), "Api_runWithInt_");
        assert_eq!(local_name("id"), "id_");
    }
}
