// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Two-phase name registry
//!
//! [`RegistryBuilder`] accepts concurrent registrations while units are
//! scanned; [`RegistryBuilder::freeze`] turns it into an immutable
//! [`NameRegistry`] that rewriting threads share without locking.

use super::mangle::{mangle_package_info, mangle_type, unprefixed_alias};
use crate::diagnostics::{TranslationError, TranslationResult};
use crate::options::PrefixOptions;
use bimap::BiHashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use log::debug;
use objc_ir::GeneratedIdentifier;
use source_model::{NameKind, QualifiedName};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct Entry {
    name: QualifiedName,
    /// Source path of the unit declaring the name, if any unit does
    declared_by: Option<String>,
}

/// Open phase of the registry
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    prefixes: PrefixOptions,
    /// Keyed by mangled identifier so that collisions surface on insert
    entries: DashMap<String, Entry>,
    /// Every distinct name seen per colliding identifier
    collisions: DashMap<String, BTreeSet<QualifiedName>>,
    /// Names declared by more than one unit
    duplicates: DashMap<QualifiedName, BTreeSet<String>>,
}

impl RegistryBuilder {
    pub fn new(prefixes: PrefixOptions) -> Self {
        Self {
            prefixes,
            ..Default::default()
        }
    }

    /// Register a name referenced by some unit
    pub fn register(&self, name: &QualifiedName, kind: NameKind) -> TranslationResult<GeneratedIdentifier> {
        let ident = mangle_type(name, &self.prefixes);
        self.insert(ident, name, kind, None)
    }

    /// Register a type declared by the unit at `origin`
    pub fn register_declared(
        &self,
        name: &QualifiedName,
        kind: NameKind,
        origin: &str,
    ) -> TranslationResult<GeneratedIdentifier> {
        let ident = mangle_type(name, &self.prefixes);
        self.insert(ident, name, kind, Some(origin))
    }

    /// Register the annotation holder of a package
    pub fn register_package_info(&self, package: &[String], origin: &str) -> TranslationResult<GeneratedIdentifier> {
        let ident = mangle_package_info(package, &self.prefixes);
        self.insert(ident, &QualifiedName::package_of(package), NameKind::Package, Some(origin))
    }

    fn insert(
        &self,
        ident: String,
        name: &QualifiedName,
        kind: NameKind,
        origin: Option<&str>,
    ) -> TranslationResult<GeneratedIdentifier> {
        let mut name = name.clone();
        name.kind = kind;
        match self.entries.entry(ident.clone()) {
            MapEntry::Vacant(slot) => {
                slot.insert(Entry {
                    name,
                    declared_by: origin.map(str::to_string),
                });
            }
            MapEntry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if existing.name != name {
                    let mut seen = self.collisions.entry(ident.clone()).or_default();
                    seen.insert(existing.name.clone());
                    seen.insert(name.clone());
                    let mut pair = seen.iter();
                    let (first, second) = (pair.next().cloned(), pair.next().cloned());
                    return Err(TranslationError::NameCollision {
                        ident,
                        first: first.unwrap_or_else(|| existing.name.clone()),
                        second: second.unwrap_or(name),
                    });
                }
                let declared_by = existing.declared_by.clone();
                match (declared_by, origin) {
                    (Some(first), Some(second)) if first != second => {
                        let mut origins = self.duplicates.entry(name.clone()).or_default();
                        origins.insert(first);
                        origins.insert(second.to_string());
                    }
                    (None, Some(origin)) => {
                        existing.declared_by = Some(origin.to_string());
                        existing.name.kind = kind;
                    }
                    // Undeclared names keep the highest kind seen, independent of order.
                    (None, None) if kind > existing.name.kind => existing.name.kind = kind,
                    _ => {}
                }
            }
        }
        Ok(GeneratedIdentifier::new(ident))
    }

    /// Close registration. Every collision is reported once per identifier,
    /// every duplicate declaration once per name.
    pub fn freeze(self) -> (NameRegistry, Vec<TranslationError>) {
        let mut errors: Vec<TranslationError> = self
            .collisions
            .into_iter()
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .filter_map(|(ident, names)| {
                let mut names = names.into_iter();
                Some(TranslationError::NameCollision {
                    ident,
                    first: names.next()?,
                    second: names.next()?,
                })
            })
            .collect();
        let duplicates: BTreeMap<_, _> = self.duplicates.into_iter().collect();
        for (name, _) in duplicates {
            errors.push(TranslationError::NameCollision {
                ident: mangle_type(&name, &self.prefixes),
                first: name.clone(),
                second: name,
            });
        }

        let mut names = BiHashMap::new();
        let mut aliases = HashMap::new();
        for (ident, entry) in self.entries {
            if let Some(alias) = unprefixed_alias(&entry.name, &self.prefixes) {
                aliases.insert(entry.name.clone(), alias);
            }
            names.insert(entry.name, GeneratedIdentifier::new(ident));
        }
        debug!("name registry frozen with {} names, {} errors", names.len(), errors.len());
        (
            NameRegistry {
                prefixes: self.prefixes,
                names,
                aliases,
            },
            errors,
        )
    }
}

/// Frozen phase of the registry: read-only, shared across threads
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    prefixes: PrefixOptions,
    names: BiHashMap<QualifiedName, GeneratedIdentifier>,
    aliases: HashMap<QualifiedName, String>,
}

impl NameRegistry {
    pub fn resolve(&self, name: &QualifiedName) -> TranslationResult<GeneratedIdentifier> {
        self.names
            .get_by_left(name)
            .cloned()
            .ok_or_else(|| TranslationError::UnknownSymbol {
                name: name.binary_name(),
            })
    }

    pub fn resolve_package_info(&self, package: &[String]) -> TranslationResult<GeneratedIdentifier> {
        self.resolve(&QualifiedName::package_of(package))
    }

    /// Registered name (with its kind) for a source name
    pub fn registered(&self, name: &QualifiedName) -> Option<&QualifiedName> {
        self.names.get_by_left(name).and_then(|ident| self.names.get_by_right(ident))
    }

    pub fn kind_of(&self, name: &QualifiedName) -> Option<NameKind> {
        self.registered(name).map(|n| n.kind)
    }

    pub fn lookup(&self, ident: &GeneratedIdentifier) -> Option<&QualifiedName> {
        self.names.get_by_right(ident)
    }

    pub fn alias(&self, name: &QualifiedName) -> Option<&str> {
        self.aliases.get(name).map(|s| s.as_str())
    }

    pub fn prefixes(&self) -> &PrefixOptions {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every registered name in identifier order
    pub fn entries(&self) -> Vec<(&QualifiedName, &GeneratedIdentifier)> {
        let mut all: Vec<_> = self.names.iter().collect();
        all.sort_by(|a, b| a.1.cmp(b.1));
        all
    }
}
