// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Reserved words of the target language and its root class
//!
//! Identifiers that clash with C, Objective-C or runtime names get a
//! trailing `_`; selectors that clash with `NSObject` methods get `__`.

/// True if `name` cannot be used as a C/Objective-C identifier as-is
pub fn is_reserved_identifier(name: &str) -> bool {
    matches!(
        name,
        // C keywords
        "auto"
            | "break"
            | "case"
            | "char"
            | "const"
            | "continue"
            | "default"
            | "do"
            | "double"
            | "else"
            | "enum"
            | "extern"
            | "float"
            | "for"
            | "goto"
            | "if"
            | "inline"
            | "int"
            | "long"
            | "register"
            | "restrict"
            | "return"
            | "short"
            | "signed"
            | "sizeof"
            | "static"
            | "struct"
            | "switch"
            | "typedef"
            | "union"
            | "unsigned"
            | "void"
            | "volatile"
            | "while"
            | "_Bool"
            | "_Complex"
            | "_Imaginary"
            | "asm"
            | "typeof"

            // Objective-C
            | "id"
            | "self"
            | "super"
            | "nil"
            | "Nil"
            | "YES"
            | "NO"
            | "BOOL"
            | "SEL"
            | "IMP"
            | "Class"
            | "Protocol"
            | "instancetype"
            | "in"
            | "out"
            | "inout"
            | "bycopy"
            | "byref"
            | "oneway"
            | "readonly"
            | "readwrite"
            | "atomic"
            | "nonatomic"
            | "retain"
            | "assign"
            | "getter"
            | "setter"

            // C library and runtime names likely to be macros
            | "bool"
            | "true"
            | "false"
            | "NULL"
            | "errno"
            | "stdin"
            | "stdout"
            | "stderr"
            | "assert"
            | "EOF"
            | "INFINITY"
            | "NAN"
            | "DEBUG"
            | "NDEBUG"
            | "TRUE"
            | "FALSE"
            | "TYPE_BOOL"
            | "TYPE_INT"
            | "TYPE_LONG"
    )
}

/// Escape a local, parameter or member identifier
pub fn escape_identifier(name: &str) -> String {
    if is_reserved_identifier(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Zero-argument selectors with a meaning on `NSObject` or under manual
/// reference counting. A source method producing one of these is renamed.
pub fn is_reserved_selector(selector: &str) -> bool {
    matches!(
        selector,
        "alloc"
            | "autorelease"
            | "class"
            | "copy"
            | "dealloc"
            | "debugDescription"
            | "description"
            | "finalize"
            | "hash"
            | "init"
            | "initialize"
            | "isProxy"
            | "load"
            | "mutableCopy"
            | "new"
            | "release"
            | "retain"
            | "retainCount"
            | "self"
            | "superclass"
            | "zone"
    )
}

/// Source methods of the root class that map onto `NSObject` methods
/// instead of being escaped
pub fn mapped_root_selector(name: &str, arity: usize) -> Option<&'static str> {
    match (name, arity) {
        ("toString", 0) => Some("description"),
        ("hashCode", 0) => Some("hash"),
        ("equals", 1) => Some("isEqual:"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_keywords_only() {
        assert_eq!(escape_identifier("id"), "id_");
        assert_eq!(escape_identifier("register"), "register_");
        assert_eq!(escape_identifier("count"), "count");
    }

    #[test]
    fn root_methods_map_instead_of_escaping() {
        assert_eq!(mapped_root_selector("toString", 0), Some("description"));
        assert_eq!(mapped_root_selector("equals", 2), None);
        assert!(is_reserved_selector("description"));
        assert!(!is_reserved_selector("isEqual:"));
    }
}
