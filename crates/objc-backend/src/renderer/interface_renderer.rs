// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Interface (`.h`) artifacts

use super::context::ArtifactContext;
use super::method_renderer::render_declaration;
use super::objc_writer::ObjcWriter;
use super::type_renderer::{declaration, type_name, weak_declaration};
use crate::escape;
use objc_ir::{DeclKind, FieldDecl, FieldOwnership, MethodDecl, MethodKind, TypeDecl, TypeDescriptor};

pub fn render_interface(ctx: &ArtifactContext<'_>) -> String {
    let mut w = ObjcWriter::new();
    ctx.write_banner(&mut w);
    w.line(&format!("#ifndef {}", ctx.guard));
    w.line(&format!("#define {}", ctx.guard));
    w.blank_line();
    w.line(&format!("#include \"{}\"", ctx.options.runtime_header));
    ctx.write_includes(&ctx.references.interface_includes, &mut w);
    w.blank_line();
    if !ctx.references.interface_forwards.is_empty() {
        ctx.write_forwards(&ctx.references.interface_forwards, &mut w);
        w.blank_line();
    }
    for ty in ctx.types {
        render_type(ctx, ty, &mut w);
    }
    w.line(&format!("#endif // {}", ctx.guard));
    w.into_inner()
}

fn render_type(ctx: &ArtifactContext<'_>, ty: &TypeDecl, w: &mut ObjcWriter) {
    let ident = &ty.ident;
    render_constants(ty, w);
    if ty.kind == DeclKind::Enum {
        render_ordinals(ty, w);
    }

    if ty.kind.has_protocol() {
        write!(w, "@protocol {} < {} >", ident, supertypes(&ty.protocols, "NSObject"));
        w.newline();
        w.blank_line();
        for m in ty.methods().filter(|m| m.kind == MethodKind::Instance) {
            render_declaration(m, w);
            w.blank_line();
        }
        w.line("@end");
        w.blank_line();
        w.line(&format!("@interface {} : NSObject", ident));
        w.blank_line();
        for m in ty.methods().filter(|m| m.kind.is_static() && m.public) {
            render_declaration(m, w);
            w.blank_line();
        }
        w.line("@end");
    } else {
        let superclass = ty
            .superclass
            .as_ref()
            .and_then(TypeDescriptor::reference_ident)
            .map(|i| i.to_string())
            .unwrap_or_else(|| "NSObject".to_string());
        write!(w, "@interface {} : {}", ident, superclass);
        if !ty.protocols.is_empty() {
            write!(w, " < {} >", supertypes(&ty.protocols, ""));
        }
        let ivars: Vec<&FieldDecl> = ty.instance_fields().collect();
        if ivars.is_empty() {
            w.newline();
        } else {
            w.braced(|w| {
                w.dedent();
                w.line("@public");
                w.indent();
                for f in ivars {
                    w.line(&format!("{};", ivar_declaration(f)));
                }
            });
            w.newline();
        }
        w.blank_line();
        for m in ty.methods().filter(|m| m.public && m.kind != MethodKind::Function) {
            render_declaration(m, w);
            w.blank_line();
        }
        w.line("@end");
    }
    w.blank_line();

    if ty.needs_initialize() {
        w.line(&format!("ORT_STATIC_INIT({})", ident));
    } else {
        w.line(&format!("ORT_EMPTY_STATIC_INIT({})", ident));
    }
    w.blank_line();

    let statics: Vec<&FieldDecl> = ty.static_fields().filter(|f| f.constant.is_none()).collect();
    for f in &statics {
        render_static_variable(ty, f, w);
    }
    if !statics.is_empty() {
        w.blank_line();
    }

    let functions: Vec<&MethodDecl> = ty.methods().filter(|m| m.kind == MethodKind::Function).collect();
    for f in &functions {
        render_declaration(f, w);
    }
    if !functions.is_empty() {
        w.blank_line();
    }

    w.line(&format!("ORT_TYPE_LITERAL_HEADER({})", ident));
    w.blank_line();

    if ctx.options.emit_aliases {
        if let Some(alias) = &ty.alias {
            if ty.kind.has_protocol() {
                w.line(&format!("#define {} {}", alias, ident));
            } else {
                w.line(&format!("typedef {} {};", ident, alias));
            }
            w.blank_line();
        }
    }
}

/// Compile-time constants are macros and have no storage
fn render_constants(ty: &TypeDecl, w: &mut ObjcWriter) {
    let constants: Vec<_> = ty
        .static_fields()
        .filter_map(|f| f.constant.as_ref().map(|c| (f, c)))
        .collect();
    for (f, value) in &constants {
        w.line(&format!("#define {} {}", f.target_name, escape::constant(value)));
    }
    if !constants.is_empty() {
        w.blank_line();
    }
}

/// `typedef NS_ENUM(NSUInteger, AColor_Enum) { AColor_Enum_RED = 0, };`
fn render_ordinals(ty: &TypeDecl, w: &mut ObjcWriter) {
    write!(w, "typedef NS_ENUM(NSUInteger, {}_Enum)", ty.ident);
    w.braced(|w| {
        for c in &ty.enum_constants {
            w.line(&format!("{}_Enum_{} = {},", ty.ident, c.name, c.ordinal));
        }
    });
    w.line(";");
    w.blank_line();
}

/// `FOUNDATION_EXPORT` storage plus the accessors other classes call
fn render_static_variable(ty: &TypeDecl, f: &FieldDecl, w: &mut ObjcWriter) {
    w.line(&format!("FOUNDATION_EXPORT {};", declaration(&f.ty, &f.target_name)));
    let kind = if f.ty.is_object() { "OBJ" } else { "PRIMITIVE" };
    let suffix = if f.modifiers.is_final() { "_FINAL" } else { "" };
    w.line(&format!(
        "ORT_STATIC_FIELD_{}{}({}, {}, {})",
        kind,
        suffix,
        ty.ident,
        f.name,
        type_name(&f.ty)
    ));
}

fn ivar_declaration(f: &FieldDecl) -> String {
    match f.ownership {
        FieldOwnership::Weak => weak_declaration(&f.ty, &f.target_name),
        FieldOwnership::Strong | FieldOwnership::Value => declaration(&f.ty, &f.target_name),
    }
}

fn supertypes(protocols: &[TypeDescriptor], fallback: &str) -> String {
    let names: Vec<String> = protocols
        .iter()
        .filter_map(TypeDescriptor::reference_ident)
        .map(|i| i.to_string())
        .collect();
    if names.is_empty() {
        fallback.to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::IncludePaths;
    use crate::options::EmitOptions;
    use objc_ir::analysis::TypeReferences;
    use objc_ir::{
        ConstantValue, EnumConstantDecl, GeneratedIdentifier, Member, PrimitiveType, ReferenceKind,
    };
    use source_model::{Modifiers, NameKind, Provenance, QualifiedName};
    use source_to_objc::naming::NameRegistry;
    use source_to_objc::FileNaming;
    use std::collections::BTreeMap;

    fn reference(ident: &str, kind: ReferenceKind, binary: &str) -> TypeDescriptor {
        TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new(ident),
            kind,
            name: QualifiedName::from_binary_name(binary, NameKind::Class),
        }
    }

    fn field(name: &str, target: &str, ty: TypeDescriptor, is_static: bool, ownership: FieldOwnership) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            target_name: target.to_string(),
            ty,
            modifiers: Modifiers::default(),
            is_static,
            constant: None,
            ownership,
            descriptor: "I".to_string(),
            generic_signature: None,
            annotations: vec![],
            synthetic: false,
        }
    }

    fn render(types: &[TypeDecl]) -> String {
        let registry = NameRegistry::default();
        let options = EmitOptions::default();
        let includes = IncludePaths::new(FileNaming::Identifier, &options, &registry);
        let provenance = Provenance::File {
            path: "a/Holder.java".to_string(),
        };
        let ctx = ArtifactContext {
            banner: "Generated by the ObjC translator.",
            sources: vec![&provenance],
            guard: "_AHolder_H_".to_string(),
            own_header: "AHolder.h".to_string(),
            types,
            metadata: BTreeMap::new(),
            references: TypeReferences::default(),
            includes: &includes,
            options: &options,
        };
        render_interface(&ctx)
    }

    fn holder() -> TypeDecl {
        let name = QualifiedName::from_binary_name("a.Holder", NameKind::Class);
        let mut ty = TypeDecl::new(GeneratedIdentifier::new("AHolder"), name, DeclKind::Class);
        ty.superclass = Some(reference("NSObject", ReferenceKind::Class, "java.lang.Object"));
        ty.protocols.push(reference("JavaIoSerializable", ReferenceKind::Protocol, "java.io.Serializable"));
        let mut max = field("MAX", "AHolder_MAX", TypeDescriptor::Primitive(PrimitiveType::Int32), true, FieldOwnership::Value);
        max.constant = Some(ConstantValue::Int(10));
        ty.members.push(Member::Field(max));
        ty.members.push(Member::Field(field(
            "label",
            "AHolder_label",
            reference("NSString", ReferenceKind::Class, "java.lang.String"),
            true,
            FieldOwnership::Strong,
        )));
        ty.members.push(Member::Field(field(
            "this$0",
            "this$0_",
            reference("AOuter", ReferenceKind::Class, "a.Outer"),
            false,
            FieldOwnership::Weak,
        )));
        ty.members.push(Member::Field(field(
            "count",
            "count_",
            TypeDescriptor::Primitive(PrimitiveType::Int32),
            false,
            FieldOwnership::Value,
        )));
        let mut hidden = MethodDecl::new("secret", MethodKind::Instance, TypeDescriptor::Void);
        hidden.public = false;
        ty.members.push(Member::Method(hidden));
        ty.members.push(Member::Method(MethodDecl::new("size", MethodKind::Instance, TypeDescriptor::Primitive(PrimitiveType::Int32))));
        ty
    }

    #[test]
    fn class_interface_layout() {
        let text = render(&[holder()]);
        assert!(text.starts_with("//\n//  Generated by the ObjC translator.\n//  source: a/Holder.java\n//\n\n#ifndef _AHolder_H_\n"));
        assert!(text.contains("#include \"ORTRuntime.h\"\n"));
        assert!(text.contains("#define AHolder_MAX 10\n"));
        assert!(text.contains(
            "@interface AHolder : NSObject < JavaIoSerializable > {\n@public\n  __unsafe_unretained AOuter *this$0_;\n  int32_t count_;\n}\n"
        ));
        assert!(text.contains("- (int32_t)size;\n"));
        assert!(!text.contains("secret"));
        assert!(text.contains("ORT_EMPTY_STATIC_INIT(AHolder)\n"));
        assert!(text.contains("FOUNDATION_EXPORT NSString *AHolder_label;\nORT_STATIC_FIELD_OBJ(AHolder, label, NSString *)\n"));
        assert!(!text.contains("AHolder_MAX;"));
        assert!(text.ends_with("ORT_TYPE_LITERAL_HEADER(AHolder)\n\n#endif // _AHolder_H_\n"));
    }

    #[test]
    fn enums_declare_ordinals() {
        let name = QualifiedName::from_binary_name("a.Color", NameKind::Enum);
        let mut color = TypeDecl::new(GeneratedIdentifier::new("AColor"), name, DeclKind::Enum);
        for (ordinal, constant) in ["RED", "GREEN"].iter().enumerate() {
            color.enum_constants.push(EnumConstantDecl {
                name: constant.to_string(),
                ordinal,
                class: GeneratedIdentifier::new("AColor"),
                selector: "initWithNSString:withInt:".to_string(),
                args: vec![],
            });
        }
        let text = render(&[color]);
        assert!(text.contains(
            "typedef NS_ENUM(NSUInteger, AColor_Enum) {\n  AColor_Enum_RED = 0,\n  AColor_Enum_GREEN = 1,\n};\n"
        ));
        assert!(text.contains("ORT_STATIC_INIT(AColor)\n"));
    }

    #[test]
    fn interfaces_are_protocols_with_companions() {
        let name = QualifiedName::from_binary_name("a.Greeter", NameKind::Interface);
        let mut greeter = TypeDecl::new(GeneratedIdentifier::new("AGreeter"), name, DeclKind::Interface);
        greeter.alias = Some("Greeter".to_string());
        greeter
            .members
            .push(Member::Method(MethodDecl::new("greet", MethodKind::Instance, TypeDescriptor::Void)));
        greeter
            .members
            .push(Member::Method(MethodDecl::new("create", MethodKind::Static, TypeDescriptor::id())));
        let mut function = MethodDecl::new("AGreeter_greet", MethodKind::Function, TypeDescriptor::Void);
        function.params.push(objc_ir::ParamDecl {
            name: "self".to_string(),
            ty: reference("AGreeter", ReferenceKind::Protocol, "a.Greeter"),
        });
        greeter.members.push(Member::Method(function));

        let text = render(&[greeter]);
        assert!(text.contains("@protocol AGreeter < NSObject >\n\n- (void)greet;\n\n@end\n"));
        assert!(text.contains("@interface AGreeter : NSObject\n\n+ (id)create;\n\n@end\n"));
        assert!(text.contains("FOUNDATION_EXPORT void AGreeter_greet(id<AGreeter> self);\n"));
        assert!(text.contains("#define Greeter AGreeter\n"));
    }
}
