// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Expression rendering - writes target expressions directly to the writer
//!
//! Compound operands are always parenthesized, so the output never depends
//! on C operator precedence.

use super::objc_writer::{render_to_string, ObjcWriter};
use super::type_renderer::type_name;
use crate::escape;
use objc_ir::{Expr, ExprKind};

/// Render a target expression
pub fn render(expr: &Expr, w: &mut ObjcWriter) {
    match &expr.kind {
        ExprKind::Constant(value) => w.write(&escape::constant(value)),
        ExprKind::Local(name) => w.write(name),
        ExprKind::SelfRef => w.write("self"),
        ExprKind::Super => w.write("super"),
        ExprKind::ClassRef(ident) => write!(w, "[{} class]", ident),
        ExprKind::ProtocolRef(ident) => write!(w, "@protocol({})", ident),
        ExprKind::Ivar { target, name } => {
            render_operand(target, w);
            write!(w, "->{}", name);
        }
        ExprKind::StaticVar { class, name } | ExprKind::Macro { class, name } => write!(w, "{}_{}", class, name),
        ExprKind::Message { receiver, selector, args } => {
            w.write("[");
            render_receiver(receiver, w);
            render_selector(selector, args, w);
            w.write("]");
        }
        ExprKind::New { class, selector, args } => {
            write!(w, "[[{} alloc]", class);
            render_selector(selector, args, w);
            w.write("]");
        }
        ExprKind::Call { function, args, .. } => render_call(function, args.iter(), w),
        ExprKind::Unary { op, operand } => {
            if op.is_postfix() {
                render_operand(operand, w);
                w.write(op.symbol());
            } else {
                w.write(op.symbol());
                render_operand(operand, w);
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            render_operand(lhs, w);
            write!(w, " {} ", op.symbol());
            render_operand(rhs, w);
        }
        ExprKind::Assign { op, target, value } => {
            render_operand(target, w);
            match op {
                Some(op) => write!(w, " {}= ", op.symbol()),
                None => w.write(" = "),
            }
            render_operand(value, w);
        }
        ExprKind::StrongAssign { target, value, consume } => {
            let helper = if *consume { "ORTStrongAssignAndConsume" } else { "ORTStrongAssign" };
            write!(w, "{}(", helper);
            render_address(target, w);
            w.write(", ");
            render(value, w);
            w.write(")");
        }
        ExprKind::ArraySet { array, index, value, consume } => {
            let helper = if *consume { "ORTObjectArray_SetAndConsume" } else { "ORTObjectArray_Set" };
            render_call(helper, [&**array, &**index, &**value], w);
        }
        ExprKind::Conditional { cond, then_expr, else_expr } => {
            render_operand(cond, w);
            w.write(" ? ");
            render_operand(then_expr, w);
            w.write(" : ");
            render_operand(else_expr, w);
        }
        ExprKind::Cast { ty, expr } => {
            write!(w, "({}) ", type_name(ty));
            render_operand(expr, w);
        }
        ExprKind::Deref(inner) => {
            w.write("*");
            render_operand(inner, w);
        }
        ExprKind::AddressOf(inner) => render_address(inner, w),
        ExprKind::CArrayLiteral { element, values } => {
            write!(w, "({}[]){{ ", type_name(element));
            w.sep_with(", ", values, |w, v| render(v, w));
            w.write(" }");
        }
        ExprKind::Retain(inner) => {
            w.write("[");
            render_receiver(inner, w);
            w.write(" retain]");
        }
        ExprKind::Autorelease(inner) => {
            w.write("[");
            render_receiver(inner, w);
            w.write(" autorelease]");
        }
    }
}

pub fn render_to(expr: &Expr) -> String {
    render_to_string(|w| render(expr, w))
}

/// Expressions that never need parentheses as an operand
fn is_atomic(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Constant(value) => !escape::constant(value).starts_with('-'),
        ExprKind::Local(_)
        | ExprKind::SelfRef
        | ExprKind::Super
        | ExprKind::ClassRef(_)
        | ExprKind::ProtocolRef(_)
        | ExprKind::Ivar { .. }
        | ExprKind::StaticVar { .. }
        | ExprKind::Macro { .. }
        | ExprKind::Message { .. }
        | ExprKind::New { .. }
        | ExprKind::Call { .. }
        | ExprKind::StrongAssign { .. }
        | ExprKind::ArraySet { .. }
        | ExprKind::Retain(_)
        | ExprKind::Autorelease(_) => true,
        _ => false,
    }
}

fn render_operand(expr: &Expr, w: &mut ObjcWriter) {
    if is_atomic(expr) {
        render(expr, w);
    } else {
        w.write("(");
        render(expr, w);
        w.write(")");
    }
}

/// Class objects are named directly when they receive a message
fn render_receiver(receiver: &Expr, w: &mut ObjcWriter) {
    match &receiver.kind {
        ExprKind::ClassRef(ident) => w.write(ident.as_str()),
        _ => render_operand(receiver, w),
    }
}

/// `&slot`; a dereferenced pointer is its own address
fn render_address(target: &Expr, w: &mut ObjcWriter) {
    match &target.kind {
        ExprKind::Deref(pointer) => render(pointer, w),
        _ => {
            w.write("&");
            render_operand(target, w);
        }
    }
}

/// ` key1:a1 key2:a2` after the receiver; the selector's keywords are
/// paired with the arguments in order.
fn render_selector(selector: &str, args: &[Expr], w: &mut ObjcWriter) {
    if args.is_empty() || !selector.contains(':') {
        write!(w, " {}", selector);
        for arg in args {
            w.write(", ");
            render(arg, w);
        }
        return;
    }
    let keywords: Vec<&str> = selector.trim_end_matches(':').split(':').collect();
    let mut args = args.iter();
    for keyword in keywords {
        write!(w, " {}:", keyword);
        if let Some(arg) = args.next() {
            render(arg, w);
        }
    }
    // Variadic tail
    for arg in args {
        w.write(", ");
        render(arg, w);
    }
}

fn render_call<'a>(function: &str, args: impl IntoIterator<Item = &'a Expr>, w: &mut ObjcWriter) {
    write!(w, "{}(", function);
    w.sep_with(", ", args, |w, a| render(a, w));
    w.write(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use objc_ir::{
        BinaryOperator, ConstantValue, GeneratedIdentifier, Ownership, PrimitiveType, ReferenceKind, TypeDescriptor,
        UnaryOperator,
    };
    use source_model::{NameKind, QualifiedName};

    fn int() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveType::Int32)
    }

    fn class(ident: &str) -> TypeDescriptor {
        TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new(ident),
            kind: ReferenceKind::Class,
            name: QualifiedName::from_binary_name("a.B", NameKind::Class),
        }
    }

    #[test]
    fn messages_pair_keywords_with_arguments() {
        let send = Expr::message(
            Expr::local("list", class("AList")),
            "putWithInt:withId:",
            vec![Expr::int(1), Expr::nil()],
            TypeDescriptor::Void,
        );
        assert_eq!(render_to(&send), "[list putWithInt:1 withId:nil]");

        let class_send = Expr::message(
            Expr::new(ExprKind::ClassRef(GeneratedIdentifier::new("AB")), class("AB")),
            "values",
            vec![],
            TypeDescriptor::id(),
        );
        assert_eq!(render_to(&class_send), "[AB values]");

        let created = Expr::new(
            ExprKind::New {
                class: GeneratedIdentifier::new("AB"),
                selector: "initWithInt:".to_string(),
                args: vec![Expr::int(3)],
            },
            class("AB"),
        )
        .with_ownership(Ownership::Created);
        assert_eq!(render_to(&created.autorelease()), "[[[AB alloc] initWithInt:3] autorelease]");
    }

    #[test]
    fn operands_are_parenthesized() {
        let sum = Expr::binary(BinaryOperator::Add, Expr::int(1), Expr::int(-2), int());
        let product = Expr::binary(BinaryOperator::Mul, sum, Expr::local("x", int()), int());
        assert_eq!(render_to(&product), "(1 + (-2)) * x");

        let neg = Expr::new(
            ExprKind::Unary {
                op: UnaryOperator::Neg,
                operand: Box::new(Expr::int(-1)),
            },
            int(),
        );
        assert_eq!(render_to(&neg), "-(-1)");

        let post = Expr::new(
            ExprKind::Unary {
                op: UnaryOperator::PostInc,
                operand: Box::new(Expr::ivar(Expr::self_ref(class("AB")), "count_", int())),
            },
            int(),
        );
        assert_eq!(render_to(&post), "self->count_++");
    }

    #[test]
    fn strong_stores_go_through_helpers() {
        let slot = Expr::ivar(Expr::self_ref(class("AB")), "name_", class("NSString"));
        let value = Expr::constant(ConstantValue::String("x".to_string()), class("NSString"));
        assert_eq!(
            render_to(&Expr::strong_assign(slot, value.clone())),
            "ORTStrongAssign(&self->name_, @\"x\")"
        );

        let getter = Expr::class_call(GeneratedIdentifier::new("AB"), "AB_getRef_name", vec![], class("NSString"));
        let deref = Expr::new(ExprKind::Deref(Box::new(getter)), class("NSString"));
        let store = Expr::new(
            ExprKind::StrongAssign {
                target: Box::new(deref),
                value: Box::new(value),
                consume: true,
            },
            class("NSString"),
        );
        assert_eq!(render_to(&store), "ORTStrongAssignAndConsume(AB_getRef_name(), @\"x\")");
    }

    #[test]
    fn casts_literals_and_statics() {
        let cast = Expr::new(
            ExprKind::Cast {
                ty: class("AB"),
                expr: Box::new(Expr::call("ort_nil_chk", vec![Expr::local("o", TypeDescriptor::id())], TypeDescriptor::id())),
            },
            class("AB"),
        );
        let field = Expr::ivar(cast, "x_", int());
        assert_eq!(render_to(&field), "((AB *) ort_nil_chk(o))->x_");

        let literal = Expr::new(
            ExprKind::CArrayLiteral {
                element: int(),
                values: vec![Expr::int(1), Expr::int(2)],
            },
            int(),
        );
        assert_eq!(render_to(&literal), "(int32_t[]){ 1, 2 }");

        let constant = Expr::new(
            ExprKind::Macro {
                class: GeneratedIdentifier::new("AColor"),
                name: "Enum_RED".to_string(),
            },
            int(),
        );
        assert_eq!(render_to(&constant), "AColor_Enum_RED");
    }
}
