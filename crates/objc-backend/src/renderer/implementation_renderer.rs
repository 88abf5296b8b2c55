// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Implementation (`.m`) artifacts

use super::context::ArtifactContext;
use super::metadata_renderer::{render_annotation_functions, render_metadata_method, render_type_annotations};
use super::method_renderer::{render_declaration, render_definition};
use super::objc_writer::ObjcWriter;
use super::statement_renderer::{render_block, render_stmt};
use super::type_renderer::declaration;
use objc_ir::{DeclKind, FieldOwnership, MethodDecl, MethodKind, Stmt, TypeDecl};

pub fn render_implementation(ctx: &ArtifactContext<'_>) -> String {
    let mut w = ObjcWriter::new();
    ctx.write_banner(&mut w);
    w.line(&format!("#include \"{}\"", ctx.own_header));
    ctx.write_includes(&ctx.references.implementation_includes, &mut w);
    w.blank_line();
    if !ctx.references.implementation_forwards.is_empty() {
        ctx.write_forwards(&ctx.references.implementation_forwards, &mut w);
        w.blank_line();
    }
    for ty in ctx.types {
        render_type(ctx, ty, &mut w);
    }
    w.into_inner()
}

/// Methods defined inside `@implementation`
fn implemented(ty: &TypeDecl) -> impl Iterator<Item = &MethodDecl> {
    let is_protocol = ty.kind.has_protocol();
    ty.methods().filter(move |m| match m.kind {
        MethodKind::Function => false,
        // Protocol requirements are implemented by the adopting classes.
        MethodKind::Instance if is_protocol => false,
        _ => true,
    })
}

fn render_type(ctx: &ArtifactContext<'_>, ty: &TypeDecl, w: &mut ObjcWriter) {
    let ident = &ty.ident;

    let private: Vec<&MethodDecl> = implemented(ty).filter(|m| !m.public).collect();
    if !private.is_empty() {
        w.line(&format!("@interface {} ()", ident));
        w.blank_line();
        for m in private {
            render_declaration(m, w);
            w.blank_line();
        }
        w.line("@end");
        w.blank_line();
    }

    let mut has_statics = false;
    for f in ty.static_fields().filter(|f| f.constant.is_none()) {
        w.line(&format!("{};", declaration(&f.ty, &f.target_name)));
        has_statics = true;
    }
    if has_statics {
        w.blank_line();
    }
    if ty.needs_initialize() {
        w.line(&format!("ORT_INITIALIZED_DEFN({})", ident));
        w.blank_line();
    }

    let metadata = ctx.metadata_for(ty);
    if let Some(table) = metadata {
        render_annotation_functions(table, w);
    }

    w.line(&format!("@implementation {}", ident));
    w.blank_line();
    for m in implemented(ty) {
        render_definition(m, w);
        w.blank_line();
    }
    if ty.needs_initialize() {
        render_initialize(ty, w);
        w.blank_line();
    }
    if !ty.kind.has_protocol() {
        render_dealloc(ty, w);
    }
    if !ty.annotations.is_empty() {
        render_type_annotations(&ty.annotations, w);
        w.blank_line();
    }
    if let Some(table) = metadata {
        render_metadata_method(table, w);
        w.blank_line();
    }
    w.line("@end");
    w.blank_line();

    for f in ty.methods().filter(|m| m.kind == MethodKind::Function) {
        render_definition(f, w);
        w.blank_line();
    }

    if ty.kind.has_protocol() {
        w.line(&format!("ORT_INTERFACE_TYPE_LITERAL_SOURCE({})", ident));
    } else {
        w.line(&format!("ORT_CLASS_TYPE_LITERAL_SOURCE({})", ident));
    }
    w.blank_line();
}

/// Static initializers run once, from the class itself and not a subclass
fn render_initialize(ty: &TypeDecl, w: &mut ObjcWriter) {
    w.write("+ (void)initialize");
    w.braced(|w| {
        write!(w, "if (self == [{} class])", ty.ident);
        w.braced(|w| {
            for init in ty.initializers() {
                render_block(&init.body, w);
            }
            w.line(&format!("ORT_SET_INITIALIZED({})", ty.ident));
        });
        w.newline();
    });
    w.newline();
}

/// Releases retained ivars; back-references are never released
fn render_dealloc(ty: &TypeDecl, w: &mut ObjcWriter) {
    let released: Vec<Stmt> = ty
        .instance_fields()
        .filter(|f| f.ownership == FieldOwnership::Strong)
        .map(|f| Stmt::Release(f.target_name.clone()))
        .collect();
    if released.is_empty() || ty.kind == DeclKind::PackageInfo {
        return;
    }
    w.write("- (void)dealloc");
    w.braced(|w| {
        for stmt in &released {
            render_stmt(stmt, w);
            w.newline();
        }
        w.line("[super dealloc];");
    });
    w.newline();
    w.blank_line();
}
