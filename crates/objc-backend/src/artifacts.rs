// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Generated files and how they are named

use crate::options::EmitOptions;
use objc_ir::analysis::TypeReference;
use objc_ir::{DeclarationTree, GeneratedIdentifier, TypeDecl};
use source_model::QualifiedName;
use source_to_objc::naming::NameRegistry;
use source_to_objc::FileNaming;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One generated file; `path` is relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Interface and implementation generated together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    pub interface: Artifact,
    pub implementation: Artifact,
}

impl ArtifactPair {
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        [&self.interface, &self.implementation].into_iter()
    }
}

/// Artifact stem (path without extension) of a unit's pair
pub fn unit_stem(tree: &DeclarationTree, naming: FileNaming) -> String {
    match naming {
        FileNaming::Identifier => tree.primary.to_string(),
        FileNaming::PackageDirectories => {
            let name = &tree.primary_name;
            if name.is_package() {
                package_path(&name.package, "package-info")
            } else {
                package_path(&name.package, name.top_level().simple_name())
            }
        }
        FileNaming::SourceRelative => source_relative_stem(tree.provenance.source_path()),
    }
}

fn package_path(package: &[String], file: &str) -> String {
    package
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(file))
        .collect::<Vec<_>>()
        .join("/")
}

/// `src/a/B.java` → `src/a/B`. Root, `.` and `..` components are dropped
/// so the artifact always lands inside the output directory.
fn source_relative_stem(path: &str) -> String {
    let parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
        .collect();
    let Some((file, dirs)) = parts.split_last() else {
        return "unnamed".to_string();
    };
    let stem = match file.rfind('.') {
        Some(pos) if pos > 0 => &file[..pos],
        _ => file,
    };
    dirs.iter().copied().chain(std::iter::once(stem)).collect::<Vec<_>>().join("/")
}

/// Header each referenced type is declared in
pub struct IncludePaths<'a> {
    naming: FileNaming,
    extension: String,
    /// Headers of the types translated in this run
    defined: BTreeMap<GeneratedIdentifier, String>,
    registry: &'a NameRegistry,
}

impl<'a> IncludePaths<'a> {
    pub fn new(naming: FileNaming, options: &EmitOptions, registry: &'a NameRegistry) -> Self {
        Self {
            naming,
            extension: options.interface_extension.clone(),
            defined: BTreeMap::new(),
            registry,
        }
    }

    /// Record that `types` are declared in the header with `stem`
    pub fn define(&mut self, types: &[TypeDecl], stem: &str) {
        let header = self.header(stem);
        for ty in types {
            self.defined.insert(ty.ident.clone(), header.clone());
        }
    }

    pub fn header(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension)
    }

    /// Types outside the run are expected where the same naming would have
    /// put them: under their top-level type.
    pub fn header_for(&self, reference: &TypeReference) -> String {
        if let Some(header) = self.defined.get(&reference.ident) {
            return header.clone();
        }
        let top = reference.name.top_level();
        let stem = match self.naming {
            FileNaming::Identifier => self.top_level_ident(&top, &reference.ident).to_string(),
            FileNaming::PackageDirectories | FileNaming::SourceRelative => {
                package_path(&top.package, top.simple_name())
            }
        };
        self.header(&stem)
    }

    fn top_level_ident(&self, top: &QualifiedName, fallback: &GeneratedIdentifier) -> GeneratedIdentifier {
        self.registry.resolve(top).unwrap_or_else(|_| fallback.clone())
    }
}
