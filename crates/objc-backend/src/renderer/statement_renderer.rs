// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Statement rendering - one statement per line, blocks indented

use super::expression_renderer::{render, render_to};
use super::objc_writer::ObjcWriter;
use super::type_renderer::{declaration, type_name};
use objc_ir::{CaseValue, ReferenceKind, Stmt, TypeDescriptor};

/// Render statements in order, each ending its own line
pub fn render_block(block: &[Stmt], w: &mut ObjcWriter) {
    for stmt in block {
        render_stmt(stmt, w);
        w.newline();
    }
}

/// Render a statement without its trailing newline
pub fn render_stmt(stmt: &Stmt, w: &mut ObjcWriter) {
    match stmt {
        Stmt::Expr(e) => {
            render(e, w);
            w.write(";");
        }
        Stmt::LocalDecl { name, ty, init } => {
            w.write(&declaration(ty, name));
            if let Some(init) = init {
                w.write(" = ");
                render(init, w);
            }
            w.write(";");
        }
        Stmt::Block(block) => {
            w.write("{");
            body(block, w);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            w.write("if (");
            render(cond, w);
            w.write(")");
            w.braced(|w| render_block(then_branch, w));
            match else_branch.as_deref() {
                None => {}
                // `else if` chains stay flat
                Some([nested @ Stmt::If { .. }]) => {
                    w.write(" else ");
                    render_stmt(nested, w);
                }
                Some(else_branch) => {
                    w.write(" else");
                    w.braced(|w| render_block(else_branch, w));
                }
            }
        }
        Stmt::While { cond, body } => {
            w.write("while (");
            render(cond, w);
            w.write(")");
            w.braced(|w| render_block(body, w));
        }
        Stmt::DoWhile { body, cond } => {
            w.write("do");
            w.braced(|w| render_block(body, w));
            w.write(" while (");
            render(cond, w);
            w.write(");");
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => render_for(init, cond.as_ref(), update, body, w),
        Stmt::ForIn {
            name,
            ty,
            collection,
            body,
        } => {
            write!(w, "for ({} in ", declaration(ty, name));
            render(collection, w);
            w.write(")");
            w.braced(|w| render_block(body, w));
        }
        Stmt::Switch { selector, cases } => {
            w.write("switch (");
            render(selector, w);
            w.write(")");
            w.braced(|w| {
                for (i, case) in cases.iter().enumerate() {
                    for label in &case.labels {
                        match label {
                            CaseValue::Default => w.line("default:"),
                            CaseValue::Expr(e) => w.line(&format!("case {}:", render_to(e))),
                        }
                    }
                    w.indent();
                    render_block(&case.body, w);
                    // A label must be followed by a statement.
                    if case.body.is_empty() && i + 1 == cases.len() {
                        w.line("break;");
                    }
                    w.dedent();
                }
            });
        }
        Stmt::Break => w.write("break;"),
        Stmt::Continue => w.write("continue;"),
        Stmt::Goto(label) => write!(w, "goto {};", label),
        Stmt::Label(label) => write!(w, "{}: ;", label),
        Stmt::Return(None) => w.write("return;"),
        Stmt::Return(Some(e)) => {
            w.write("return ");
            render(e, w);
            w.write(";");
        }
        Stmt::Throw(e) => {
            w.write("@throw ");
            render(e, w);
            w.write(";");
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            w.write("@try");
            w.braced(|w| render_block(body, w));
            for catch in catches {
                w.newline();
                write!(w, "@catch ({})", catch_declaration(&catch.ty, &catch.name));
                w.braced(|w| render_block(&catch.body, w));
            }
            if let Some(finally) = finally {
                w.newline();
                w.write("@finally");
                w.braced(|w| render_block(finally, w));
            }
        }
        Stmt::Synchronized { lock, body } => {
            w.write("@synchronized(");
            render(lock, w);
            w.write(")");
            w.braced(|w| render_block(body, w));
        }
        Stmt::Release(name) => write!(w, "[{} release];", name),
        Stmt::Native(code) => {
            let mut lines = code.trim_matches('\n').lines().peekable();
            while let Some(line) = lines.next() {
                w.write(line.trim_end());
                if lines.peek().is_some() {
                    w.newline();
                }
            }
        }
    }
}

fn body(block: &[Stmt], w: &mut ObjcWriter) {
    w.newline();
    w.indent();
    render_block(block, w);
    w.dedent();
    w.write("}");
}

/// `@catch (id e)` catches everything; class catches name a pointer type
fn catch_declaration(ty: &TypeDescriptor, name: &str) -> String {
    match ty.erased() {
        TypeDescriptor::Reference {
            kind: ReferenceKind::Id, ..
        } => format!("id {}", name),
        _ => declaration(ty, name),
    }
}

/// A `for` header holds either declarations of one type or expressions;
/// anything else is written ahead of the loop inside an enclosing block.
fn render_for(
    init: &[Stmt],
    cond: Option<&objc_ir::Expr>,
    update: &[objc_ir::Expr],
    loop_body: &[Stmt],
    w: &mut ObjcWriter,
) {
    let header_init = for_init(init);
    if header_init.is_none() {
        w.write("{");
        w.newline();
        w.indent();
        render_block(init, w);
    }
    write!(w, "for ({}; ", header_init.as_deref().unwrap_or(""));
    if let Some(cond) = cond {
        render(cond, w);
    }
    w.write("; ");
    w.sep_with(", ", update, |w, e| render(e, w));
    w.write(")");
    w.braced(|w| render_block(loop_body, w));
    if header_init.is_none() {
        w.newline();
        w.dedent();
        w.write("}");
    }
}

fn for_init(init: &[Stmt]) -> Option<String> {
    if init.is_empty() {
        return Some(String::new());
    }
    if init.iter().all(|s| matches!(s, Stmt::Expr(_))) {
        let exprs: Vec<String> = init
            .iter()
            .filter_map(|s| match s {
                Stmt::Expr(e) => Some(render_to(e)),
                _ => None,
            })
            .collect();
        return Some(exprs.join(", "));
    }
    let Some(Stmt::LocalDecl { ty: first, .. }) = init.first() else {
        return None;
    };
    let base = type_name(first);
    let mut declarators = vec![];
    for stmt in init {
        match stmt {
            Stmt::LocalDecl { name, ty, init } if type_name(ty) == base => {
                let mut d = if base.ends_with('*') {
                    format!("*{}", name)
                } else {
                    name.clone()
                };
                if let Some(init) = init {
                    d = format!("{} = {}", d, render_to(init));
                }
                declarators.push(d);
            }
            _ => return None,
        }
    }
    let base = base.trim_end_matches('*').trim_end();
    Some(format!("{} {}", base, declarators.join(", ")))
}
