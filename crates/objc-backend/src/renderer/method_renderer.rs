// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Method and function signatures and bodies

use super::objc_writer::ObjcWriter;
use super::statement_renderer::render_block;
use super::type_renderer::{declaration, type_name};
use itertools::Itertools;
use objc_ir::{MethodDecl, MethodKind};

/// `- (NSString *)getWithInt:(int32_t)i`, `+ (void)run`,
/// `NSString *AGreeter_greet(id<AGreeter> self)`
pub fn signature(method: &MethodDecl) -> String {
    let ret = match method.kind {
        MethodKind::Constructor => "instancetype".to_string(),
        _ => type_name(&method.return_type),
    };
    if method.kind == MethodKind::Function {
        let params = if method.params.is_empty() {
            "void".to_string()
        } else {
            method.params.iter().map(|p| declaration(&p.ty, &p.name)).join(", ")
        };
        let sep = if ret.ends_with('*') { "" } else { " " };
        return format!("{}{}{}({})", ret, sep, method.selector, params);
    }

    let marker = if method.kind.is_static() { '+' } else { '-' };
    let mut out = format!("{} ({})", marker, ret);
    if method.params.is_empty() {
        out.push_str(&method.selector);
        return out;
    }
    let keywords: Vec<&str> = method.selector.trim_end_matches(':').split(':').collect();
    for (i, param) in method.params.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let keyword = keywords.get(i).copied().unwrap_or("with");
        out.push_str(&format!("{}:({}){}", keyword, type_name(&param.ty), param.name));
    }
    out
}

/// Declaration line ending in `;`
pub fn render_declaration(method: &MethodDecl, w: &mut ObjcWriter) {
    let prefix = if method.kind == MethodKind::Function { "FOUNDATION_EXPORT " } else { "" };
    w.line(&format!("{}{};", prefix, signature(method)));
}

/// Definition with its body. Abstract methods of classes raise at run time.
pub fn render_definition(method: &MethodDecl, w: &mut ObjcWriter) {
    w.write(&signature(method));
    w.braced(|w| match &method.body {
        Some(body) => render_block(body, w),
        None => {
            w.line("// can't call an abstract method");
            w.line("[self doesNotRecognizeSelector:_cmd];");
            if !method.return_type.is_void() && method.kind != MethodKind::Constructor {
                w.line("return 0;");
            }
        }
    });
    w.newline();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::objc_writer::render_to_string;
    use objc_ir::{
        Expr, GeneratedIdentifier, ParamDecl, PrimitiveType, ReferenceKind, Stmt, TypeDescriptor,
    };
    use source_model::{NameKind, QualifiedName};

    fn string() -> TypeDescriptor {
        TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new("NSString"),
            kind: ReferenceKind::Class,
            name: QualifiedName::from_binary_name("java.lang.String", NameKind::Class),
        }
    }

    fn int() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveType::Int32)
    }

    #[test]
    fn selectors_interleave_parameters() {
        let mut m = MethodDecl::new("putWithInt:withNSString:", MethodKind::Instance, string());
        m.params = vec![
            ParamDecl {
                name: "k".to_string(),
                ty: int(),
            },
            ParamDecl {
                name: "v".to_string(),
                ty: string(),
            },
        ];
        assert_eq!(signature(&m), "- (NSString *)putWithInt:(int32_t)k withNSString:(NSString *)v");

        let ctor = MethodDecl::new("init", MethodKind::Constructor, string());
        assert_eq!(signature(&ctor), "- (instancetype)init");

        let values = MethodDecl::new("values", MethodKind::Static, TypeDescriptor::id());
        assert_eq!(signature(&values), "+ (id)values");
    }

    #[test]
    fn functions_take_the_receiver_first() {
        let mut f = MethodDecl::new("AGreeter_greet", MethodKind::Function, string());
        f.params.push(ParamDecl {
            name: "self".to_string(),
            ty: TypeDescriptor::id(),
        });
        assert_eq!(signature(&f), "NSString *AGreeter_greet(id self)");
        let text = render_to_string(|w| render_declaration(&f, w));
        assert_eq!(text, "FOUNDATION_EXPORT NSString *AGreeter_greet(id self);\n");
    }

    #[test]
    fn definitions_and_abstract_bodies() {
        let mut answer = MethodDecl::new("answer", MethodKind::Instance, int());
        answer.body = Some(vec![Stmt::Return(Some(Expr::int(42)))]);
        let text = render_to_string(|w| render_definition(&answer, w));
        assert_eq!(text, "- (int32_t)answer {\n  return 42;\n}\n");

        answer.body = None;
        let text = render_to_string(|w| render_definition(&answer, w));
        assert!(text.contains("[self doesNotRecognizeSelector:_cmd];\n  return 0;\n"));
    }
}
