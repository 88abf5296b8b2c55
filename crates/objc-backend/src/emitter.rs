// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Groups translated units into artifact pairs and renders them
//!
//! Per-unit output writes one pair for each translated unit, in input
//! order. Combined output writes a single pair holding every translated
//! declaration. Failed and skipped units contribute nothing; their
//! diagnostics are already part of the translation.

use crate::artifacts::{unit_stem, Artifact, ArtifactPair, IncludePaths};
use crate::escape::c_identifier;
use crate::options::EmitOptions;
use crate::renderer::{render_implementation, render_interface, ArtifactContext};
use log::{debug, info};
use objc_ir::analysis::{collect_references, order_by_supertypes, TypeReference};
use objc_ir::{GeneratedIdentifier, MetadataTable, ReferenceKind, TypeDecl};
use source_model::NameKind;
use source_to_objc::naming::NameRegistry;
use source_to_objc::{TranslatedUnit, Translation};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Render every artifact of a finished translation
pub fn emit(translation: &Translation, options: &EmitOptions) -> Vec<ArtifactPair> {
    let units: Vec<&TranslatedUnit> = translation.translated().collect();
    let known = known_types(&translation.registry);
    let pairs = if translation.options.is_combined() {
        emit_combined(translation, &units, &known, options).into_iter().collect()
    } else {
        emit_units(translation, &units, &known, options)
    };
    info!("emitted {} artifact pairs", pairs.len());
    pairs
}

/// Source names of every registered identifier, for references made without
/// a type descriptor
fn known_types(registry: &NameRegistry) -> BTreeMap<GeneratedIdentifier, TypeReference> {
    registry
        .entries()
        .into_iter()
        .map(|(name, ident)| {
            let kind = match name.kind {
                NameKind::Interface | NameKind::Annotation => ReferenceKind::Protocol,
                NameKind::Class | NameKind::Enum | NameKind::Package => ReferenceKind::Class,
            };
            let reference = TypeReference {
                ident: ident.clone(),
                kind,
                name: name.clone(),
            };
            (ident.clone(), reference)
        })
        .collect()
}

fn emit_units(
    translation: &Translation,
    units: &[&TranslatedUnit],
    known: &BTreeMap<GeneratedIdentifier, TypeReference>,
    options: &EmitOptions,
) -> Vec<ArtifactPair> {
    let naming = translation.options.file_naming;
    let mut includes = IncludePaths::new(naming, options, &translation.registry);
    let stems: Vec<String> = units.iter().map(|u| unit_stem(&u.tree, naming)).collect();
    for (unit, stem) in units.iter().zip(&stems) {
        includes.define(&unit.tree.types, stem);
    }

    units
        .iter()
        .zip(&stems)
        .map(|(unit, stem)| {
            debug!("emitting {} as {}", unit.tree.provenance, stem);
            let ctx = ArtifactContext {
                banner: &translation.options.banner,
                sources: vec![&unit.tree.provenance],
                guard: unit.tree.primary.include_guard(),
                own_header: includes.header(stem),
                types: &unit.tree.types,
                metadata: metadata_by_ident(&unit.metadata),
                references: collect_references(&unit.tree.types, known),
                includes: &includes,
                options,
            };
            render_pair(&ctx, stem, options)
        })
        .collect()
}

fn emit_combined(
    translation: &Translation,
    units: &[&TranslatedUnit],
    known: &BTreeMap<GeneratedIdentifier, TypeReference>,
    options: &EmitOptions,
) -> Option<ArtifactPair> {
    if units.is_empty() {
        return None;
    }
    let stem = translation.options.combined_name.as_str();
    let mut types: Vec<TypeDecl> = units.iter().flat_map(|u| u.tree.types.iter().cloned()).collect();
    order_by_supertypes(&mut types);

    let mut includes = IncludePaths::new(translation.options.file_naming, options, &translation.registry);
    includes.define(&types, stem);
    let tables: Vec<&MetadataTable> = units.iter().flat_map(|u| u.metadata.iter()).collect();

    debug!("emitting {} units combined as {}", units.len(), stem);
    let ctx = ArtifactContext {
        banner: &translation.options.banner,
        sources: units.iter().map(|u| &u.tree.provenance).collect(),
        guard: format!("_{}_H_", c_identifier(stem)),
        own_header: includes.header(stem),
        types: &types,
        metadata: tables.into_iter().map(|t| (&t.ident, t)).collect(),
        references: collect_references(&types, known),
        includes: &includes,
        options,
    };
    Some(render_pair(&ctx, stem, options))
}

fn metadata_by_ident(tables: &[MetadataTable]) -> BTreeMap<&GeneratedIdentifier, &MetadataTable> {
    tables.iter().map(|t| (&t.ident, t)).collect()
}

fn render_pair(ctx: &ArtifactContext<'_>, stem: &str, options: &EmitOptions) -> ArtifactPair {
    ArtifactPair {
        interface: Artifact {
            path: PathBuf::from(format!("{}.{}", stem, options.interface_extension)),
            contents: render_interface(ctx),
        },
        implementation: Artifact {
            path: PathBuf::from(format!("{}.{}", stem, options.implementation_extension)),
            contents: render_implementation(ctx),
        },
    }
}
