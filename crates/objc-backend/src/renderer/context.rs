// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! What an artifact pair is rendered from

use super::objc_writer::ObjcWriter;
use crate::artifacts::IncludePaths;
use crate::escape::comment_line;
use crate::options::EmitOptions;
use objc_ir::analysis::{TypeReference, TypeReferences};
use objc_ir::{GeneratedIdentifier, MetadataTable, ReferenceKind, TypeDecl};
use source_model::Provenance;
use std::collections::{BTreeMap, BTreeSet};

pub struct ArtifactContext<'a> {
    pub banner: &'a str,
    /// Units whose declarations the pair holds, in input order
    pub sources: Vec<&'a Provenance>,
    /// Include guard macro of the interface
    pub guard: String,
    /// Path of the interface, as other artifacts include it
    pub own_header: String,
    /// Declarations in dependency order
    pub types: &'a [TypeDecl],
    pub metadata: BTreeMap<&'a GeneratedIdentifier, &'a MetadataTable>,
    pub references: TypeReferences,
    pub includes: &'a IncludePaths<'a>,
    pub options: &'a EmitOptions,
}

impl<'a> ArtifactContext<'a> {
    pub fn metadata_for(&self, ty: &TypeDecl) -> Option<&'a MetadataTable> {
        self.metadata.get(&ty.ident).copied()
    }

    /// Leading comment naming the origin of every unit in the pair
    pub fn write_banner(&self, w: &mut ObjcWriter) {
        w.line("//");
        w.line(&format!("//  {}", comment_line(self.banner)));
        for source in &self.sources {
            w.line(&format!("//  source: {}", comment_line(&source.to_string())));
        }
        w.line("//");
        w.blank_line();
    }

    /// `#include` lines for `references`, without the pair's own header
    pub fn write_includes<'r>(&self, references: impl IntoIterator<Item = &'r TypeReference>, w: &mut ObjcWriter) {
        let headers: BTreeSet<String> = references
            .into_iter()
            .map(|r| self.includes.header_for(r))
            .filter(|h| *h != self.own_header)
            .collect();
        for header in headers {
            w.line(&format!("#include \"{}\"", header));
        }
    }

    /// `@class` and `@protocol` forward declarations
    pub fn write_forwards<'r>(&self, references: impl IntoIterator<Item = &'r TypeReference>, w: &mut ObjcWriter) {
        for r in references {
            match r.kind {
                ReferenceKind::Class => w.line(&format!("@class {};", r.ident)),
                ReferenceKind::Protocol => w.line(&format!("@protocol {};", r.ident)),
                ReferenceKind::Id => {}
            }
        }
    }
}
