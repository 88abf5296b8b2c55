// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Fully qualified source names

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// What a qualified name denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Package,
}

/// A fully scoped source identifier: package segments, then the enclosing
/// types from outermost to the simple name.
///
/// Identity (equality, ordering, hashing) is defined by the segments alone.
/// The kind is an attribute of the entity, not part of its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifiedName {
    pub package: Vec<String>,
    pub types: Vec<String>,
    pub kind: NameKind,
}

impl QualifiedName {
    pub fn new<P, T>(package: P, types: T, kind: NameKind) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            package: package.into_iter().map(Into::into).collect(),
            types: types.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    /// Parse a binary name such as `com.google.Outer$Inner`.
    pub fn from_binary_name(binary_name: &str, kind: NameKind) -> Self {
        let (package, types) = match binary_name.rfind('.') {
            Some(pos) => (&binary_name[..pos], &binary_name[pos + 1..]),
            None => ("", binary_name),
        };
        Self::new(
            package.split('.').filter(|s| !s.is_empty()),
            types.split('$').filter(|s| !s.is_empty()),
            kind,
        )
    }

    /// A package name (no type segments)
    pub fn package_of(package: &[String]) -> Self {
        Self::new(package.iter().cloned(), Vec::<String>::new(), NameKind::Package)
    }

    pub fn is_package(&self) -> bool {
        self.types.is_empty()
    }

    /// Simple name; the last package segment for package names
    pub fn simple_name(&self) -> &str {
        self.types
            .last()
            .or_else(|| self.package.last())
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn package_name(&self) -> String {
        self.package.join(".")
    }

    pub fn is_nested(&self) -> bool {
        self.types.len() > 1
    }

    /// The directly enclosing type, if this is a nested type
    pub fn outer(&self) -> Option<QualifiedName> {
        if self.types.len() < 2 {
            return None;
        }
        Some(Self {
            package: self.package.clone(),
            types: self.types[..self.types.len() - 1].to_vec(),
            kind: NameKind::Class,
        })
    }

    /// The outermost enclosing type (itself for top-level types)
    pub fn top_level(&self) -> QualifiedName {
        Self {
            package: self.package.clone(),
            types: self.types.iter().take(1).cloned().collect(),
            kind: if self.types.len() == 1 { self.kind } else { NameKind::Class },
        }
    }

    /// A type nested directly in this one
    pub fn nested(&self, simple_name: &str, kind: NameKind) -> QualifiedName {
        let mut types = self.types.clone();
        types.push(simple_name.to_string());
        Self {
            package: self.package.clone(),
            types,
            kind,
        }
    }

    /// `com.google.Outer$Inner`
    pub fn binary_name(&self) -> String {
        let types = self.types.join("$");
        if self.package.is_empty() {
            types
        } else if types.is_empty() {
            self.package_name()
        } else {
            format!("{}.{}", self.package_name(), types)
        }
    }

    /// `com/google/Outer$Inner`
    pub fn internal_name(&self) -> String {
        self.binary_name().replace('.', "/")
    }

    /// `Lcom/google/Outer$Inner;`
    pub fn descriptor(&self) -> String {
        format!("L{};", self.internal_name())
    }

    pub fn is(&self, binary_name: &str) -> bool {
        self.binary_name() == binary_name
    }

    fn key(&self) -> (&[String], &[String]) {
        (&self.package, &self.types)
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let segments = self.package.iter().chain(self.types.iter());
        write!(f, "{}", itertools::join(segments, "."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_name_round_trips_nesting() {
        let name = QualifiedName::from_binary_name("com.google.Outer$Inner", NameKind::Class);
        assert_eq!(name.package, vec!["com", "google"]);
        assert_eq!(name.types, vec!["Outer", "Inner"]);
        assert_eq!(name.binary_name(), "com.google.Outer$Inner");
        assert_eq!(name.to_string(), "com.google.Outer.Inner");
        assert_eq!(name.descriptor(), "Lcom/google/Outer$Inner;");
        assert_eq!(name.outer().unwrap().binary_name(), "com.google.Outer");
    }

    #[test]
    fn identity_ignores_kind() {
        let a = QualifiedName::from_binary_name("a.B", NameKind::Class);
        let b = QualifiedName::from_binary_name("a.B", NameKind::Interface);
        assert_eq!(a, b);
    }

    #[test]
    fn default_package_names() {
        let name = QualifiedName::from_binary_name("ProcessingResult", NameKind::Class);
        assert!(name.package.is_empty());
        assert_eq!(name.binary_name(), "ProcessingResult");
        assert_eq!(name.simple_name(), "ProcessingResult");
    }
}
