// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Mangling of qualified names into target identifiers
//!
//! The result is a pure function of the qualified name and the prefix
//! options: `com.google.test.Outer$Inner` becomes `ComGoogleTestOuter_Inner`,
//! or `CBTOuter_Inner` with the package mapped to `CBT`.

use super::reserved::is_reserved_identifier;
use crate::options::PrefixOptions;
use once_cell::sync::Lazy;
use regex::Regex;
use source_model::QualifiedName;

static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Platform types with fixed target names
const WELL_KNOWN: &[(&str, &str)] = &[
    ("java.lang.Object", "NSObject"),
    ("java.lang.String", "NSString"),
    ("java.lang.Number", "NSNumber"),
    ("java.lang.Cloneable", "NSCopying"),
    ("java.lang.Class", "ORTClass"),
    ("java.lang.StringBuilder", "ORTStringBuilder"),
];

/// Fixed target name of a platform type
pub fn well_known(name: &QualifiedName) -> Option<&'static str> {
    let binary = name.binary_name();
    WELL_KNOWN.iter().find(|(src, _)| *src == binary).map(|(_, target)| *target)
}

/// Replace every character that cannot appear in a C identifier with `_`
pub fn escape_segment(segment: &str) -> String {
    INVALID_CHARS.replace_all(segment, "_").into_owned()
}

/// Capitalize first character
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// `com.google.test` -> `ComGoogleTest`
pub fn camel_case_package(package: &[String]) -> String {
    package.iter().map(|s| capitalize_first(&escape_segment(s))).collect()
}

/// Prefix for the types of a package: a configured short code (exact
/// entries win over `pkg.*` wildcards, longer wildcards over shorter ones),
/// else the camel-cased package.
pub fn package_prefix(package: &[String], prefixes: &PrefixOptions) -> String {
    let dotted = package.join(".");
    if let Some(code) = prefixes.packages.get(&dotted) {
        return code.clone();
    }
    let wildcard = prefixes
        .packages
        .iter()
        .filter_map(|(pattern, code)| {
            let base = pattern.strip_suffix(".*")?;
            let matches = dotted == base || dotted.starts_with(&format!("{}.", base));
            matches.then_some((base.len(), code))
        })
        .max_by_key(|(len, _)| *len);
    match wildcard {
        Some((_, code)) => code.clone(),
        None => camel_case_package(package),
    }
}

fn finish(ident: String) -> String {
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", ident)
    } else if is_reserved_identifier(&ident) {
        format!("{}_", ident)
    } else {
        ident
    }
}

/// Identifier of a type
pub fn mangle_type(name: &QualifiedName, prefixes: &PrefixOptions) -> String {
    if let Some(fixed) = well_known(name) {
        return fixed.to_string();
    }
    let types = name
        .types
        .iter()
        .map(|s| escape_segment(s))
        .collect::<Vec<_>>()
        .join("_");
    let global = prefixes.global.as_deref().unwrap_or("");
    finish(format!("{}{}{}", global, package_prefix(&name.package, prefixes), types))
}

/// Identifier with camel-cased packages and no configured prefixes, used as
/// a readable alias when a prefix changed the identifier
pub fn unprefixed_alias(name: &QualifiedName, prefixes: &PrefixOptions) -> Option<String> {
    if prefixes.packages.is_empty() && prefixes.global.is_none() {
        return None;
    }
    let plain = mangle_type(name, &PrefixOptions::default());
    (plain != mangle_type(name, prefixes)).then_some(plain)
}

/// Identifier of the holder class for a package's annotations
pub fn mangle_package_info(package: &[String], prefixes: &PrefixOptions) -> String {
    let global = prefixes.global.as_deref().unwrap_or("");
    format!("{}{}package_info", global, package_prefix(package, prefixes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_model::NameKind;

    fn name(binary: &str) -> QualifiedName {
        QualifiedName::from_binary_name(binary, NameKind::Class)
    }

    #[test]
    fn camel_cases_packages_and_joins_nesting() {
        let prefixes = PrefixOptions::default();
        assert_eq!(mangle_type(&name("com.google.test.Example"), &prefixes), "ComGoogleTestExample");
        assert_eq!(mangle_type(&name("com.google.Outer$Inner"), &prefixes), "ComGoogleOuter_Inner");
        assert_eq!(mangle_type(&name("Outer$1"), &prefixes), "Outer_1");
        assert_eq!(mangle_type(&name("java.lang.String"), &prefixes), "NSString");
    }

    #[test]
    fn configured_prefixes() {
        let mut prefixes = PrefixOptions::default();
        prefixes.packages.insert("com.google.test".to_string(), "CBT".to_string());
        prefixes.packages.insert("org.*".to_string(), "O".to_string());
        prefixes.packages.insert("org.deep.*".to_string(), "OD".to_string());
        assert_eq!(mangle_type(&name("com.google.test.Example"), &prefixes), "CBTExample");
        assert_eq!(mangle_type(&name("com.google.test.sub.Example"), &prefixes), "ComGoogleTestSubExample");
        assert_eq!(mangle_type(&name("org.a.B"), &prefixes), "OB");
        assert_eq!(mangle_type(&name("org.deep.x.B"), &prefixes), "ODB");
        assert_eq!(
            unprefixed_alias(&name("com.google.test.Example"), &prefixes).as_deref(),
            Some("ComGoogleTestExample")
        );
        assert_eq!(mangle_package_info(&["com".into(), "google".into(), "test".into()], &prefixes), "CBTpackage_info");
    }

    #[test]
    fn escapes_invalid_characters_and_reserved_words() {
        let prefixes = PrefixOptions::default();
        assert_eq!(escape_segment("a-b"), "a_b");
        assert_eq!(mangle_type(&name("id"), &prefixes), "id_");
        let odd = QualifiedName::new(Vec::<String>::new(), vec!["1st", "$Lambda$1"], NameKind::Class);
        assert_eq!(mangle_type(&odd, &prefixes), "_1st__Lambda_1");
    }
}
