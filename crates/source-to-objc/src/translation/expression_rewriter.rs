// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Expression rewriting
//!
//! Every source expression becomes a target expression tagged with its
//! ownership: allocations are `Created`, ordinary method results
//! `Autoreleased`, strong stores `Retained`, everything else borrowed.
//! Implicit conversions recorded by the type checker are applied after the
//! expression they annotate and never re-inferred.

use super::scope::{BodyKind, Scope};
use crate::diagnostics::{TranslationError, TranslationResult};
use crate::naming::{
    constructor_selector, default_method_function, ivar_name, local_name, method_selector, static_getter,
    static_ref_getter,
};
use crate::type_mapper::{map_primitive, nil_chk, TypeMapper};
use objc_ir::{
    BinaryOperator, ConstantValue, ExprKind as TargetKind, GeneratedIdentifier, Ownership, PrimitiveType,
    ReferenceKind, TypeDescriptor, UnaryOperator,
};
use source_model::{
    BinaryOp, Expr, ExprKind, FieldRef, Literal, Location, MethodRef, NameKind, PrimitiveKind, QualifiedName,
    SourceType, UnaryOp,
};

type Target = objc_ir::Expr;

const NIL_CHECK: &str = "ort_nil_chk";

pub fn rewrite_expr(scope: &mut Scope, expr: &Expr) -> TranslationResult<Target> {
    let value = rewrite_value(scope, expr)?;
    match &expr.converted_to {
        Some(to) => convert(scope.mapper, value, &expr.ty, to),
        None => Ok(value),
    }
}

pub fn rewrite_exprs(scope: &mut Scope, exprs: &[Expr]) -> TranslationResult<Vec<Target>> {
    exprs.iter().map(|e| rewrite_expr(scope, e)).collect()
}

fn rewrite_value(scope: &mut Scope, expr: &Expr) -> TranslationResult<Target> {
    let location = expr.location;
    match &expr.kind {
        ExprKind::Literal(literal) => Ok(Target::constant(constant_value(literal), scope.map(&expr.ty)?)),
        ExprKind::Local(var) => Ok(Target::local(local_name(&var.name), scope.map(&expr.ty)?)),
        ExprKind::This => this(scope, location),
        ExprKind::QualifiedThis(name) => scope.enclosing_instance(name, false, location),
        ExprKind::Field { target, field } => {
            let value = field_read(scope, target.as_deref(), field, location)?;
            narrow(scope.mapper, value, &field.ty, &expr.ty)
        }
        ExprKind::MethodCall {
            target,
            method,
            args,
            is_super,
        } => {
            let value = method_call(scope, target.as_deref(), method, args, *is_super, location)?;
            narrow(scope.mapper, value, &method.return_type, &expr.ty)
        }
        ExprKind::New {
            class, ctor, args, outer, ..
        } => allocation(scope, class, ctor, args, outer.as_deref(), location),
        ExprKind::NewArray {
            dimensions,
            initializer,
            ..
        } => match initializer {
            Some(values) => array_literal(scope, &expr.ty, values),
            None => new_array(scope, &expr.ty, dimensions, location),
        },
        ExprKind::ArrayAccess { array, index } => {
            let element = ArrayElement::rewrite(scope, array, index)?;
            narrow(scope.mapper, element.read(), &element.source_type, &expr.ty)
        }
        ExprKind::ArrayLength(array) => {
            let array = nil_chk(rewrite_expr(scope, array)?);
            Ok(Target::ivar(array, "size_", TypeDescriptor::Primitive(PrimitiveType::Int32)))
        }
        ExprKind::Unary { op, operand } => unary(scope, *op, operand, &expr.ty, location),
        ExprKind::Binary { op, lhs, rhs } => binary(scope, *op, lhs, rhs, &expr.ty, location),
        ExprKind::Assign { op, target, value } => assignment(scope, *op, target, value, location),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => Ok(Target::new(
            TargetKind::Conditional {
                cond: Box::new(rewrite_expr(scope, cond)?),
                then_expr: Box::new(rewrite_expr(scope, then_expr)?),
                else_expr: Box::new(rewrite_expr(scope, else_expr)?),
            },
            scope.map(&expr.ty)?,
        )),
        ExprKind::Cast { ty, expr: inner } => {
            let value = rewrite_expr(scope, inner)?;
            cast_expr(scope.mapper, value, inner.effective_type(), ty)
        }
        ExprKind::InstanceOf { expr: inner, ty } => {
            let value = rewrite_expr(scope, inner)?;
            Ok(Target::message(
                class_literal(scope.mapper, ty)?,
                "isInstance:",
                vec![value],
                TypeDescriptor::Primitive(PrimitiveType::Bool),
            ))
        }
        ExprKind::ClassLiteral(ty) => class_literal(scope.mapper, ty),
        ExprKind::Lambda { .. } | ExprKind::MethodReference { .. } => Err(TranslationError::unsupported(
            "functional expression outside a class body",
            location,
        )),
        ExprKind::Unsupported { construct } => Err(TranslationError::unsupported(construct.clone(), location)),
    }
}

fn this(scope: &Scope, location: Location) -> TranslationResult<Target> {
    if scope.is_static() {
        return Err(TranslationError::unsupported("`this` in a static context", location));
    }
    Ok(scope.self_expr())
}

// ============================================================================
// Constants, casts and conversions
// ============================================================================

pub fn constant_value(literal: &Literal) -> ConstantValue {
    match literal {
        Literal::Boolean(b) => ConstantValue::Bool(*b),
        Literal::Char(c) => ConstantValue::Char(*c),
        Literal::Int(i) => ConstantValue::Int(*i),
        Literal::Long(l) => ConstantValue::Long(*l),
        Literal::Float(f) => ConstantValue::Float(*f),
        Literal::Double(d) => ConstantValue::Double(*d),
        Literal::String(s) => ConstantValue::String(s.clone()),
        Literal::Null => ConstantValue::Nil,
    }
}

/// C cast to `ty`. The cast takes over the ownership of its operand so that
/// a created value stays in a consuming position.
pub fn cast(mut value: Target, ty: TypeDescriptor) -> Target {
    if value.ty == ty {
        return value;
    }
    let ownership = std::mem::replace(&mut value.ownership, Ownership::Borrowed);
    Target::new(
        TargetKind::Cast {
            ty: ty.clone(),
            expr: Box::new(value),
        },
        ty,
    )
    .with_ownership(ownership)
}

/// Apply an implicit conversion: boxing, unboxing or primitive widening
pub fn convert(mapper: TypeMapper<'_>, value: Target, from: &SourceType, to: &SourceType) -> TranslationResult<Target> {
    match (from.primitive(), to.erasure()) {
        (Some(p), SourceType::Primitive(q)) if p == q => Ok(value),
        (Some(_), SourceType::Primitive(q)) => Ok(cast(value, primitive(q))),
        (Some(p), _) => mapper.box_of(value, p),
        (None, SourceType::Primitive(q)) => Ok(match from.erasure().unboxed() {
            Some(p) if p == q => mapper.unbox_of(value, p),
            Some(p) => cast(mapper.unbox_of(value, p), primitive(q)),
            None => {
                let wrapper = mapper.reference(&q.boxed_name())?;
                mapper.unbox_of(cast(value, wrapper), q)
            }
        }),
        (None, _) => Ok(value),
    }
}

fn primitive(kind: PrimitiveKind) -> TypeDescriptor {
    TypeDescriptor::Primitive(map_primitive(kind))
}

/// Cast a value read through an erased declaration to the type the use site
/// expects (`T get()` called on a `List<String>`)
fn narrow(mapper: TypeMapper<'_>, value: Target, declared: &SourceType, actual: &SourceType) -> TranslationResult<Target> {
    if !actual.is_reference() || *actual == SourceType::Null || declared.erasure() == actual.erasure() {
        return Ok(value);
    }
    let ty = mapper.map_erased(actual)?;
    if ty == TypeDescriptor::id() {
        return Ok(value);
    }
    Ok(cast(value, ty))
}

fn cast_expr(mapper: TypeMapper<'_>, value: Target, from: &SourceType, to: &SourceType) -> TranslationResult<Target> {
    match (from.primitive(), to.primitive()) {
        (Some(p), Some(q)) => Ok(numeric_cast(value, p, q)),
        (None, None) => reference_cast(mapper, value, from, to),
        _ => convert(mapper, value, from, to),
    }
}

fn numeric_cast(value: Target, from: PrimitiveKind, to: PrimitiveKind) -> Target {
    if from == to {
        return value;
    }
    if from.is_floating() && to.is_integral() {
        // C leaves out-of-range conversions undefined; the helpers saturate.
        let (helper, ty) = match to {
            PrimitiveKind::Long => ("ort_fp_to_long", PrimitiveType::Int64),
            _ => ("ort_fp_to_int", PrimitiveType::Int32),
        };
        return cast(Target::call(helper, vec![value], TypeDescriptor::Primitive(ty)), primitive(to));
    }
    cast(value, primitive(to))
}

/// Reference cast, checked at run time unless statically known to hold
pub fn reference_cast(mapper: TypeMapper<'_>, value: Target, from: &SourceType, to: &SourceType) -> TranslationResult<Target> {
    let target = mapper.map_erased(to)?;
    if target == TypeDescriptor::id() || mapper.index().is_source_subtype(from, to) {
        return Ok(cast(value, target));
    }
    let checked = Target::call(
        "ort_cast_chk",
        vec![value, class_literal(mapper, &to.erasure())?],
        TypeDescriptor::id(),
    );
    Ok(cast(checked, target))
}

/// `ORTClass` instance for a type: `[ORTClass classWithClass:[Foo class]]`,
/// `[ORTClass intClass]`, `[ORTClass arrayClassWithComponentType:...]`
pub fn class_literal(mapper: TypeMapper<'_>, ty: &SourceType) -> TranslationResult<Target> {
    let class_name = QualifiedName::from_binary_name("java.lang.Class", NameKind::Class);
    let class_ty = mapper.reference(&class_name)?;
    let receiver = Target::new(TargetKind::ClassRef(mapper.resolve(&class_name)?), class_ty.clone());
    let (selector, args) = match ty.erasure() {
        SourceType::Primitive(p) => (format!("{}Class", p.keyword()), vec![]),
        SourceType::Void => ("voidClass".to_string(), vec![]),
        SourceType::Array(element) => (
            "arrayClassWithComponentType:".to_string(),
            vec![class_literal(mapper, &element)?],
        ),
        other => {
            let name = other
                .class_name()
                .cloned()
                .unwrap_or_else(|| QualifiedName::from_binary_name("java.lang.Object", NameKind::Class));
            let ident = mapper.resolve(&name)?;
            let desc = mapper.reference(&name)?;
            if mapper.is_protocol(&name) {
                (
                    "classWithProtocol:".to_string(),
                    vec![Target::new(TargetKind::ProtocolRef(ident), desc)],
                )
            } else {
                ("classWithClass:".to_string(), vec![Target::new(TargetKind::ClassRef(ident), desc)])
            }
        }
    };
    Ok(Target::message(receiver, selector, args, class_ty))
}

// ============================================================================
// Fields
// ============================================================================

fn field_read(scope: &mut Scope, target: Option<&Expr>, field: &FieldRef, location: Location) -> TranslationResult<Target> {
    let mapper = scope.mapper;
    let ty = mapper.map_type(&field.ty)?;
    if field.is_static {
        let class = mapper.resolve(&field.owner)?;
        if field.constant_value.is_some() {
            return Ok(Target::new(
                TargetKind::Macro {
                    class,
                    name: field.name.clone(),
                },
                ty,
            ));
        }
        if field.owner == scope.class.name {
            return Ok(Target::new(
                TargetKind::StaticVar {
                    class,
                    name: field.name.clone(),
                },
                ty,
            ));
        }
        let getter = static_getter(class.as_str(), &field.name);
        return Ok(Target::class_call(class, getter, vec![], ty));
    }
    let receiver = instance_receiver(scope, target, &field.owner, location)?;
    Ok(Target::ivar(receiver, ivar_name(&field.name), ty))
}

/// Object whose ivar is accessed, typed as the declaring class
fn instance_receiver(
    scope: &mut Scope,
    target: Option<&Expr>,
    owner: &QualifiedName,
    location: Location,
) -> TranslationResult<Target> {
    let receiver = match target {
        Some(t) => nil_chk(rewrite_expr(scope, t)?),
        None => scope.enclosing_instance(owner, false, location)?,
    };
    let index = scope.mapper.index();
    let declared_in_class = match receiver.ty.erased() {
        TypeDescriptor::Reference {
            kind: ReferenceKind::Class,
            name,
            ..
        } => index.is_subtype(name, owner),
        _ => false,
    };
    if declared_in_class {
        Ok(receiver)
    } else {
        Ok(cast(receiver, scope.mapper.reference(owner)?))
    }
}

// ============================================================================
// Calls and allocations
// ============================================================================

pub fn erased_params(mapper: TypeMapper<'_>, params: &[SourceType]) -> TranslationResult<Vec<TypeDescriptor>> {
    params.iter().map(|p| mapper.map_erased(p)).collect()
}

/// Target parameter list of a constructor of `class`: the enclosing
/// instance first, then the declared parameters, then the name and ordinal
/// for enum classes.
pub fn constructor_params(
    mapper: TypeMapper<'_>,
    class: &QualifiedName,
    params: &[SourceType],
) -> TranslationResult<Vec<TypeDescriptor>> {
    let index = mapper.index();
    let mut descs = vec![];
    if let Some(outer) = index.get(class).and_then(|c| c.outer.as_ref()) {
        descs.push(mapper.reference(outer)?);
    }
    descs.extend(erased_params(mapper, params)?);
    if index.takes_enum_identity(class) {
        descs.push(mapper.map_type(&SourceType::string())?);
        descs.push(TypeDescriptor::Primitive(PrimitiveType::Int32));
    }
    Ok(descs)
}

pub fn class_ref(mapper: TypeMapper<'_>, name: &QualifiedName) -> TranslationResult<Target> {
    Ok(Target::new(TargetKind::ClassRef(mapper.resolve(name)?), mapper.reference(name)?))
}

pub fn super_ref(scope: &Scope) -> Target {
    Target::new(TargetKind::Super, scope.class.descriptor.clone())
}

fn method_call(
    scope: &mut Scope,
    target: Option<&Expr>,
    method: &MethodRef,
    args: &[Expr],
    is_super: bool,
    location: Location,
) -> TranslationResult<Target> {
    let mapper = scope.mapper;
    let selector = method_selector(&method.name, &erased_params(mapper, &method.params)?);
    let ret = mapper.map_erased(&method.return_type)?;
    let call = if method.is_static {
        let receiver = class_ref(mapper, &method.owner)?;
        Target::message(receiver, selector, call_args(scope, method, args)?, ret.clone())
    } else if is_super && mapper.is_protocol(&method.owner) {
        // `Iface.super.m()`: the body lives in the interface's function
        let owner = mapper.resolve(&method.owner)?;
        let function = default_method_function(owner.as_str(), &selector);
        let mut values = vec![scope.self_expr()];
        values.extend(call_args(scope, method, args)?);
        Target::class_call(owner, function, values, ret.clone())
    } else if is_super {
        if scope.kind == BodyKind::Function {
            return Err(TranslationError::unsupported(
                "superclass method call from an interface method",
                location,
            ));
        }
        Target::message(super_ref(scope), selector, call_args(scope, method, args)?, ret.clone())
    } else {
        let receiver = match target {
            Some(t) => nil_chk(rewrite_expr(scope, t)?),
            None => scope.enclosing_instance(&method.owner, false, location)?,
        };
        Target::message(receiver, selector, call_args(scope, method, args)?, ret.clone())
    };
    Ok(if ret.is_object() {
        call.with_ownership(Ownership::Autoreleased)
    } else {
        call
    })
}

/// Arguments of a call, with trailing variable arguments packed into an array
pub fn call_args(scope: &mut Scope, method: &MethodRef, args: &[Expr]) -> TranslationResult<Vec<Target>> {
    let Some(array_ty) = method.params.last().filter(|_| method.is_varargs) else {
        return rewrite_exprs(scope, args);
    };
    let passes_array = args.len() == method.params.len()
        && args
            .last()
            .map_or(false, |a| matches!(a.effective_type(), SourceType::Array(_) | SourceType::Null));
    if passes_array {
        return rewrite_exprs(scope, args);
    }
    let fixed = (method.params.len() - 1).min(args.len());
    let mut values = rewrite_exprs(scope, &args[..fixed])?;
    values.push(array_literal(scope, array_ty, &args[fixed..])?);
    Ok(values)
}

fn allocation(
    scope: &mut Scope,
    class: &QualifiedName,
    ctor: &MethodRef,
    args: &[Expr],
    outer: Option<&Expr>,
    location: Location,
) -> TranslationResult<Target> {
    let mapper = scope.mapper;
    let mut values = vec![];
    if let Some(enclosing) = mapper.index().get(class).and_then(|c| c.outer.clone()) {
        values.push(match outer {
            Some(o) => nil_chk(rewrite_expr(scope, o)?),
            None => scope.enclosing_instance(&enclosing, false, location)?,
        });
    }
    values.extend(call_args(scope, ctor, args)?);
    let selector = constructor_selector(&constructor_params(mapper, class, &ctor.params)?);
    Ok(Target::new(
        TargetKind::New {
            class: mapper.resolve(class)?,
            selector,
            args: values,
        },
        mapper.reference(class)?,
    )
    .with_ownership(Ownership::Created))
}

// ============================================================================
// Arrays
// ============================================================================

fn array_class(element: &TypeDescriptor) -> GeneratedIdentifier {
    GeneratedIdentifier::new(TypeDescriptor::array_class_for(element))
}

fn c_array(element: TypeDescriptor, values: Vec<Target>) -> Target {
    let ty = element.clone();
    Target::new(TargetKind::CArrayLiteral { element, values }, ty)
}

/// `[ORTIntArray newArrayWithInts:(int32_t[]){...} count:n]`
fn array_literal(scope: &mut Scope, array_ty: &SourceType, values: &[Expr]) -> TranslationResult<Target> {
    let desc = scope.map(&array_ty.erasure())?;
    let component = array_ty.erasure().element_type().cloned().unwrap_or_else(SourceType::object);
    let element = desc.element().cloned().unwrap_or_else(TypeDescriptor::id);
    let class = array_class(&element);
    let values = rewrite_exprs(scope, values)?;
    let count = Target::int(values.len() as i32);
    let (selector, args) = match element.primitive() {
        Some(p) => (format!("newArrayWith{}s:count:", p.keyword()), vec![c_array(element, values), count]),
        None => (
            "newArrayWithObjects:count:type:".to_string(),
            vec![
                c_array(TypeDescriptor::id(), values),
                count,
                class_literal(scope.mapper, &component)?,
            ],
        ),
    };
    let receiver = Target::new(TargetKind::ClassRef(class), desc.clone());
    Ok(Target::message(receiver, selector, args, desc).with_ownership(Ownership::Created))
}

fn new_array(
    scope: &mut Scope,
    array_ty: &SourceType,
    dimensions: &[Expr],
    location: Location,
) -> TranslationResult<Target> {
    let array_ty = array_ty.erasure();
    let desc = scope.map(&array_ty)?;
    let lengths = rewrite_exprs(scope, dimensions)?;
    let (selector, args, class) = match lengths.len() {
        0 => return Err(TranslationError::unsupported("array creation without a length", location)),
        1 => {
            let element = desc.element().cloned().unwrap_or_else(TypeDescriptor::id);
            let class = array_class(&element);
            match array_ty.element_type().filter(|e| !e.is_primitive()) {
                Some(component) => (
                    "newArrayWithLength:type:".to_string(),
                    vec![lengths.into_iter().next(), Some(class_literal(scope.mapper, component)?)]
                        .into_iter()
                        .flatten()
                        .collect(),
                    class,
                ),
                None => ("newArrayWithLength:".to_string(), lengths, class),
            }
        }
        n => {
            let mut leaf = &array_ty;
            for _ in 0..n {
                leaf = leaf.element_type().unwrap_or(leaf);
            }
            let args = vec![
                Target::int(n as i32),
                c_array(TypeDescriptor::Primitive(PrimitiveType::Int32), lengths),
                class_literal(scope.mapper, leaf)?,
            ];
            (
                "newArrayWithDimensions:lengths:type:".to_string(),
                args,
                array_class(&TypeDescriptor::id()),
            )
        }
    };
    let receiver = Target::new(TargetKind::ClassRef(class), desc.clone());
    Ok(Target::message(receiver, selector, args, desc).with_ownership(Ownership::Created))
}

/// An array element as an operand: the checked array, the index and the
/// element type the runtime stores
struct ArrayElement {
    array: Target,
    index: Target,
    element: TypeDescriptor,
    source_type: SourceType,
}

impl ArrayElement {
    fn rewrite(scope: &mut Scope, array: &Expr, index: &Expr) -> TranslationResult<Self> {
        let source_type = array
            .effective_type()
            .erasure()
            .element_type()
            .cloned()
            .unwrap_or_else(SourceType::object);
        Ok(Self {
            array: nil_chk(rewrite_expr(scope, array)?),
            index: rewrite_expr(scope, index)?,
            element: scope.mapper.map_erased(&source_type)?,
            source_type,
        })
    }

    fn class(&self) -> String {
        TypeDescriptor::array_class_for(&self.element)
    }

    fn read(&self) -> Target {
        let args = vec![self.array.clone(), self.index.clone()];
        match self.element.primitive() {
            Some(_) => Target::call(format!("{}_Get", self.class()), args, self.element.clone()),
            None => cast(
                Target::call(format!("{}_Get", self.class()), args, TypeDescriptor::id()),
                self.element.clone(),
            ),
        }
    }

    /// `*ORTIntArray_GetRef(a, i)`, only for primitive elements
    fn reference(&self) -> Target {
        let call = Target::call(
            format!("{}_GetRef", self.class()),
            vec![self.array.clone(), self.index.clone()],
            self.element.clone(),
        );
        Target::new(TargetKind::Deref(Box::new(call)), self.element.clone())
    }
}

// ============================================================================
// Assignment targets
// ============================================================================

enum Slot {
    /// Plain storage: locals, primitive fields, primitive array elements
    Value(Target),
    /// Object field or static variable, assigned with retain/release
    Strong(Target),
    /// Object array element, assigned through the array
    Element(ArrayElement),
}

impl Slot {
    fn ty(&self) -> &TypeDescriptor {
        match self {
            Slot::Value(place) | Slot::Strong(place) => &place.ty,
            Slot::Element(element) => &element.element,
        }
    }

    /// Whether the place can be evaluated a second time without effects
    fn is_reevaluable(&self) -> bool {
        match self {
            Slot::Value(place) | Slot::Strong(place) => reevaluable(place),
            Slot::Element(element) => reevaluable(&element.array) && reevaluable(&element.index),
        }
    }

    fn read(&self) -> Target {
        match self {
            Slot::Value(place) | Slot::Strong(place) => place.clone(),
            Slot::Element(element) => element.read(),
        }
    }

    fn store(self, value: Target) -> Target {
        match self {
            Slot::Value(place) => Target::assign(place, value),
            Slot::Strong(place) => Target::strong_assign(place, value),
            Slot::Element(element) => {
                let ty = element.element.clone();
                Target::new(
                    TargetKind::ArraySet {
                        array: Box::new(element.array),
                        index: Box::new(element.index),
                        value: Box::new(value),
                        consume: false,
                    },
                    ty,
                )
                .with_ownership(Ownership::Retained)
            }
        }
    }
}

fn reevaluable(e: &Target) -> bool {
    match &e.kind {
        TargetKind::Call {
            owner: None,
            function,
            args,
        } if function == NIL_CHECK || function.ends_with("_GetRef") => args.iter().all(reevaluable),
        TargetKind::Deref(inner) | TargetKind::Cast { expr: inner, .. } => reevaluable(inner),
        TargetKind::Ivar { target, .. } => reevaluable(target),
        _ => e.is_side_effect_free(),
    }
}

fn slot(scope: &mut Scope, target: &Expr, location: Location) -> TranslationResult<Slot> {
    let mapper = scope.mapper;
    match &target.kind {
        ExprKind::Local(var) => Ok(Slot::Value(Target::local(local_name(&var.name), scope.map(&target.ty)?))),
        ExprKind::Field { target: receiver, field } => {
            let ty = mapper.map_type(&field.ty)?;
            let place = if field.is_static {
                let class = mapper.resolve(&field.owner)?;
                if field.owner == scope.class.name {
                    Target::new(
                        TargetKind::StaticVar {
                            class,
                            name: field.name.clone(),
                        },
                        ty.clone(),
                    )
                } else {
                    let getter = static_ref_getter(class.as_str(), &field.name);
                    let call = Target::class_call(class, getter, vec![], ty.clone());
                    Target::new(TargetKind::Deref(Box::new(call)), ty.clone())
                }
            } else {
                let receiver = instance_receiver(scope, receiver.as_deref(), &field.owner, location)?;
                Target::ivar(receiver, ivar_name(&field.name), ty.clone())
            };
            Ok(if ty.is_object() {
                Slot::Strong(place)
            } else {
                Slot::Value(place)
            })
        }
        ExprKind::ArrayAccess { array, index } => {
            let element = ArrayElement::rewrite(scope, array, index)?;
            Ok(if element.element.is_object() {
                Slot::Element(element)
            } else {
                Slot::Value(element.reference())
            })
        }
        _ => Err(TranslationError::unsupported("assignment to a computed expression", location)),
    }
}

fn assignment(
    scope: &mut Scope,
    op: Option<BinaryOp>,
    target: &Expr,
    value: &Expr,
    location: Location,
) -> TranslationResult<Target> {
    let slot = slot(scope, target, location)?;
    let Some(op) = op else {
        let value = rewrite_expr(scope, value)?;
        return Ok(slot.store(value));
    };

    let boxed = target.ty.unboxed();
    let is_concat = op == BinaryOp::Add && target.ty.is_string();
    let floating_rem = op == BinaryOp::Rem && target.ty.primitive().map_or(false, |p| p.is_floating());
    if is_concat || boxed.is_some() || op == BinaryOp::UShr || floating_rem {
        // Expanded to `x = x op y`, which evaluates the target twice.
        if !slot.is_reevaluable() {
            return Err(TranslationError::unsupported(
                "compound assignment to a target with side effects",
                location,
            ));
        }
        let current = slot.read();
        let rhs = rewrite_expr(scope, value)?;
        let combined = if is_concat {
            string_concat(scope.mapper, vec![(current, target.ty.clone()), (rhs, value.effective_type().clone())])?
        } else if let Some(p) = boxed {
            let unboxed = scope.mapper.unbox_of(current, p);
            let result = arithmetic(op, unboxed, rhs, primitive(p), location)?;
            scope.mapper.box_of(result, p)?
        } else {
            let ty = slot.ty().clone();
            arithmetic(op, current, rhs, ty, location)?
        };
        return Ok(slot.store(combined));
    }

    let mut rhs = rewrite_expr(scope, value)?;
    if op.is_shift() {
        rhs = mask_shift_distance(rhs, is_wide(slot.ty()));
    }
    let operator = operator(op, location)?;
    match slot {
        Slot::Value(place) => {
            let ty = place.ty.clone();
            Ok(Target::new(
                TargetKind::Assign {
                    op: Some(operator),
                    target: Box::new(place),
                    value: Box::new(rhs),
                },
                ty,
            ))
        }
        _ => Err(TranslationError::unsupported("compound assignment to an object", location)),
    }
}

// ============================================================================
// Operators
// ============================================================================

fn operator(op: BinaryOp, location: Location) -> TranslationResult<BinaryOperator> {
    Ok(match op {
        BinaryOp::Add => BinaryOperator::Add,
        BinaryOp::Sub => BinaryOperator::Sub,
        BinaryOp::Mul => BinaryOperator::Mul,
        BinaryOp::Div => BinaryOperator::Div,
        BinaryOp::Rem => BinaryOperator::Rem,
        BinaryOp::Shl => BinaryOperator::Shl,
        BinaryOp::Shr => BinaryOperator::Shr,
        BinaryOp::BitAnd => BinaryOperator::BitAnd,
        BinaryOp::BitOr => BinaryOperator::BitOr,
        BinaryOp::BitXor => BinaryOperator::BitXor,
        BinaryOp::And => BinaryOperator::And,
        BinaryOp::Or => BinaryOperator::Or,
        BinaryOp::Eq => BinaryOperator::Eq,
        BinaryOp::Ne => BinaryOperator::Ne,
        BinaryOp::Lt => BinaryOperator::Lt,
        BinaryOp::Le => BinaryOperator::Le,
        BinaryOp::Gt => BinaryOperator::Gt,
        BinaryOp::Ge => BinaryOperator::Ge,
        BinaryOp::UShr => {
            return Err(TranslationError::unsupported("unsigned shift without a runtime helper", location))
        }
    })
}

fn is_wide(ty: &TypeDescriptor) -> bool {
    ty.primitive() == Some(PrimitiveType::Int64)
}

/// Shift distances use only their low 5 (or 6) bits
fn mask_shift_distance(distance: Target, wide: bool) -> Target {
    let mask = if wide { 0x3f } else { 0x1f };
    if let TargetKind::Constant(ConstantValue::Int(k)) = distance.kind {
        return Target::int(k & mask);
    }
    let ty = distance.ty.clone();
    Target::binary(BinaryOperator::BitAnd, distance, Target::int(mask), ty)
}

/// Binary arithmetic on primitive operands
fn arithmetic(op: BinaryOp, lhs: Target, rhs: Target, ty: TypeDescriptor, location: Location) -> TranslationResult<Target> {
    let wide = is_wide(&lhs.ty);
    Ok(match op {
        BinaryOp::UShr => {
            let helper = if wide { "ORTURShift64" } else { "ORTURShift32" };
            Target::call(helper, vec![lhs, mask_shift_distance(rhs, wide)], ty)
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            Target::binary(operator(op, location)?, lhs, mask_shift_distance(rhs, wide), ty)
        }
        BinaryOp::Rem if ty.primitive().map_or(false, |p| p.is_floating()) => {
            let helper = if ty.primitive() == Some(PrimitiveType::Float) { "fmodf" } else { "fmod" };
            Target::call(helper, vec![lhs, rhs], ty)
        }
        _ => Target::binary(operator(op, location)?, lhs, rhs, ty),
    })
}

fn binary(
    scope: &mut Scope,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ty: &SourceType,
    location: Location,
) -> TranslationResult<Target> {
    if op == BinaryOp::Add && ty.is_string() {
        let mut operands = vec![];
        concat_operands(lhs, &mut operands);
        concat_operands(rhs, &mut operands);
        let mut values = vec![];
        for operand in operands {
            values.push((rewrite_expr(scope, operand)?, operand.effective_type().clone()));
        }
        return string_concat(scope.mapper, values);
    }
    let lhs = rewrite_expr(scope, lhs)?;
    let rhs = rewrite_expr(scope, rhs)?;
    arithmetic(op, lhs, rhs, scope.map(ty)?, location)
}

/// Operands of a left-nested string concatenation, in evaluation order
fn concat_operands<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match &expr.kind {
        ExprKind::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        } if expr.ty.is_string() && expr.converted_to.is_none() => {
            concat_operands(lhs, out);
            concat_operands(rhs, out);
        }
        _ => out.push(expr),
    }
}

/// `[[[[ORTStringBuilder alloc] init] appendWithNSString:a] appendWithInt:b] newString]`
fn string_concat(mapper: TypeMapper<'_>, operands: Vec<(Target, SourceType)>) -> TranslationResult<Target> {
    let builder = QualifiedName::from_binary_name("java.lang.StringBuilder", NameKind::Class);
    let builder_ty = mapper.reference(&builder)?;
    let mut chain = Target::new(
        TargetKind::New {
            class: mapper.resolve(&builder)?,
            selector: "init".to_string(),
            args: vec![],
        },
        builder_ty.clone(),
    )
    .with_ownership(Ownership::Created);
    for (value, ty) in operands {
        let keyword = match &ty {
            SourceType::Primitive(p) => map_primitive(*p).keyword(),
            t if t.is_string() => "NSString",
            _ => "Id",
        };
        chain = Target::message(chain, format!("appendWith{}:", keyword), vec![value], builder_ty.clone());
    }
    let string_ty = mapper.map_type(&SourceType::string())?;
    Ok(Target::message(chain, "newString", vec![], string_ty).with_ownership(Ownership::Created))
}

fn unary(scope: &mut Scope, op: UnaryOp, operand: &Expr, ty: &SourceType, location: Location) -> TranslationResult<Target> {
    let target_op = match op {
        UnaryOp::Neg => UnaryOperator::Neg,
        UnaryOp::Plus => UnaryOperator::Plus,
        UnaryOp::Not => UnaryOperator::Not,
        UnaryOp::BitNot => UnaryOperator::BitNot,
        UnaryOp::PreInc => UnaryOperator::PreInc,
        UnaryOp::PreDec => UnaryOperator::PreDec,
        UnaryOp::PostInc => UnaryOperator::PostInc,
        UnaryOp::PostDec => UnaryOperator::PostDec,
    };
    if !op.is_increment() {
        let value = rewrite_expr(scope, operand)?;
        return Ok(Target::new(
            TargetKind::Unary {
                op: target_op,
                operand: Box::new(value),
            },
            scope.map(ty)?,
        ));
    }

    let place = match slot(scope, operand, location)? {
        Slot::Value(place) | Slot::Strong(place) => place,
        Slot::Element(_) => {
            return Err(TranslationError::unsupported("boxed increment on an array element", location))
        }
    };
    let ty = place.ty.clone();
    if let Some(p) = operand.ty.unboxed() {
        let helper = match op {
            UnaryOp::PreInc => "PreIncr",
            UnaryOp::PreDec => "PreDecr",
            UnaryOp::PostInc => "PostIncr",
            _ => "PostDecr",
        };
        let address = Target::new(TargetKind::AddressOf(Box::new(place)), ty.clone());
        return Ok(Target::call(
            format!("ORTBoxed{}{}", helper, map_primitive(p).keyword()),
            vec![address],
            ty,
        ));
    }
    if ty.is_object() {
        return Err(TranslationError::unsupported("increment of an object", location));
    }
    Ok(Target::new(
        TargetKind::Unary {
            op: target_op,
            operand: Box::new(place),
        },
        ty,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::fixtures::{class, field, name, unit, Fixture};
    use crate::translation::scope::ClassContext;
    use source_model::{Modifiers, VarRef};

    fn fixture() -> Fixture {
        let holder = class(
            "a.Holder",
            vec![
                field("label", SourceType::string(), Modifiers::PRIVATE),
                field("count", SourceType::class("java.lang.Integer"), Modifiers::PRIVATE),
                field("size", SourceType::int(), Modifiers::PRIVATE),
            ],
        );
        Fixture::new(vec![unit("a/Holder.java", vec![holder])])
    }

    fn own_field(field: &str, ty: SourceType) -> Expr {
        Expr::new(
            ExprKind::Field {
                target: None,
                field: FieldRef {
                    owner: name("a.Holder"),
                    name: field.to_string(),
                    ty: ty.clone(),
                    is_static: false,
                    constant_value: None,
                },
            },
            ty,
        )
    }

    fn with_scope<T>(f: impl FnOnce(&mut Scope) -> T) -> T {
        let fixture = fixture();
        let context = ClassContext::new(fixture.mapper(), &name("a.Holder")).unwrap();
        let mut scope = Scope::new(fixture.mapper(), &context, BodyKind::Instance);
        f(&mut scope)
    }

    fn selectors(e: &Target, out: &mut Vec<String>) {
        if let TargetKind::Message { selector, .. } = &e.kind {
            out.push(selector.clone());
        }
        for child in e.children() {
            selectors(child, out);
        }
    }

    #[test]
    fn string_concatenation_builds_an_owned_string() {
        let concat = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::new(
                    ExprKind::Binary {
                        op: BinaryOp::Add,
                        lhs: Box::new(Expr::literal(Literal::String("n=".to_string()))),
                        rhs: Box::new(own_field("size", SourceType::int())),
                    },
                    SourceType::string(),
                )),
                rhs: Box::new(Expr::literal(Literal::Char(u16::from(b'!')))),
            },
            SourceType::string(),
        );
        let result = with_scope(|scope| rewrite_expr(scope, &concat)).unwrap();
        assert_eq!(result.ownership, Ownership::Created);
        let mut found = vec![];
        selectors(&result, &mut found);
        assert_eq!(found, vec!["newString", "appendWithChar:", "appendWithInt:", "appendWithNSString:"]);
    }

    #[test]
    fn object_fields_are_assigned_strongly() {
        let assign = Expr::new(
            ExprKind::Assign {
                op: None,
                target: Box::new(own_field("label", SourceType::string())),
                value: Box::new(Expr::literal(Literal::String("x".to_string()))),
            },
            SourceType::string(),
        );
        let result = with_scope(|scope| rewrite_expr(scope, &assign)).unwrap();
        let TargetKind::StrongAssign { target, .. } = &result.kind else { panic!("strong assignment expected") };
        let TargetKind::Ivar { name, target: receiver } = &target.kind else { panic!("ivar expected") };
        assert_eq!(name, "label_");
        assert!(matches!(receiver.kind, TargetKind::SelfRef));
    }

    #[test]
    fn boxed_compound_assignment_unboxes_and_reboxes() {
        let integer = SourceType::class("java.lang.Integer");
        let assign = Expr::new(
            ExprKind::Assign {
                op: Some(BinaryOp::Add),
                target: Box::new(own_field("count", integer.clone())),
                value: Box::new(Expr::literal(Literal::Int(2))),
            },
            integer,
        );
        let result = with_scope(|scope| rewrite_expr(scope, &assign)).unwrap();
        let TargetKind::StrongAssign { value, .. } = &result.kind else { panic!("strong assignment expected") };
        let mut found = vec![];
        selectors(value, &mut found);
        assert_eq!(found, vec!["valueOfWithInt:", "intValue"]);
    }

    #[test]
    fn unsigned_shifts_and_floating_remainders_use_helpers() {
        let local = |id, ty: SourceType| Expr::local(VarRef::new(id, "v"), ty);
        let shift = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::UShr,
                lhs: Box::new(local(1, SourceType::Primitive(PrimitiveKind::Long))),
                rhs: Box::new(Expr::literal(Literal::Int(65))),
            },
            SourceType::Primitive(PrimitiveKind::Long),
        );
        let rem = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Rem,
                lhs: Box::new(local(2, SourceType::Primitive(PrimitiveKind::Float))),
                rhs: Box::new(local(3, SourceType::Primitive(PrimitiveKind::Float))),
            },
            SourceType::Primitive(PrimitiveKind::Float),
        );
        let (shift, rem) = with_scope(|scope| (rewrite_expr(scope, &shift).unwrap(), rewrite_expr(scope, &rem).unwrap()));
        let TargetKind::Call { function, args, .. } = &shift.kind else { panic!("call expected") };
        assert_eq!(function, "ORTURShift64");
        assert_eq!(args[1].kind, TargetKind::Constant(ConstantValue::Int(1)));
        assert!(matches!(&rem.kind, TargetKind::Call { function, .. } if function == "fmodf"));
    }

    #[test]
    fn varargs_are_packed_into_an_array() {
        let mut format = MethodRef::method(
            name("a.Holder"),
            "format",
            vec![SourceType::string(), SourceType::array_of(SourceType::object())],
            SourceType::string(),
        );
        format.is_static = true;
        format.is_varargs = true;
        let args = vec![
            Expr::literal(Literal::String("%s %s".to_string())),
            Expr::literal(Literal::String("a".to_string())),
            Expr::literal(Literal::String("b".to_string())),
        ];
        let values = with_scope(|scope| call_args(scope, &format, &args)).unwrap();
        assert_eq!(values.len(), 2);
        let TargetKind::Message { selector, args, .. } = &values[1].kind else { panic!("array literal expected") };
        assert_eq!(selector, "newArrayWithObjects:count:type:");
        assert_eq!(args[1].kind, TargetKind::Constant(ConstantValue::Int(2)));
        assert!(values[1].is_created());
    }

    #[test]
    fn downcasts_are_checked_and_upcasts_are_not() {
        let object = Expr::local(VarRef::new(1, "o"), SourceType::object());
        let down = Expr::new(
            ExprKind::Cast {
                ty: SourceType::class("a.Holder"),
                expr: Box::new(object),
            },
            SourceType::class("a.Holder"),
        );
        let up = Expr::new(
            ExprKind::Cast {
                ty: SourceType::object(),
                expr: Box::new(Expr::this(SourceType::class("a.Holder"))),
            },
            SourceType::object(),
        );
        let (down, up) = with_scope(|scope| (rewrite_expr(scope, &down).unwrap(), rewrite_expr(scope, &up).unwrap()));
        let TargetKind::Cast { expr, .. } = &down.kind else { panic!("cast expected") };
        assert!(matches!(&expr.kind, TargetKind::Call { function, .. } if function == "ort_cast_chk"));
        assert!(matches!(&up.kind, TargetKind::Cast { expr, .. } if matches!(expr.kind, TargetKind::SelfRef)));
    }

    #[test]
    fn boxed_increment_of_an_array_element_is_unsupported() {
        let integer = SourceType::class("java.lang.Integer");
        let array = Expr::local(VarRef::new(1, "xs"), SourceType::array_of(integer.clone()));
        let element = Expr::new(
            ExprKind::ArrayAccess {
                array: Box::new(array),
                index: Box::new(Expr::literal(Literal::Int(0))),
            },
            integer.clone(),
        );
        let inc = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::PostInc,
                operand: Box::new(element),
            },
            integer,
        );
        let err = with_scope(|scope| rewrite_expr(scope, &inc)).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedConstruct");
    }
}
