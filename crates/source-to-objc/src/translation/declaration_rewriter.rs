// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Declaration rewriting
//!
//! One compilation unit becomes one declaration tree:
//! - nested, local, anonymous and lambda classes are flattened into the
//!   tree, supertypes first, otherwise in declaration order
//! - fields become ivars or static variables; static initialization moves
//!   into initializers run once by `+initialize`
//! - constructors, enums, interface companions and bridge methods are built
//!   by the sibling modules of this one
//!
//! Every body is passed through the ownership balancing pass once its
//! member list is complete.

use super::bridges::add_bridges;
use super::constructors::{default_constructor, rewrite_constructor};
use super::enums::{add_enum_constants, add_enum_methods};
use super::expression_rewriter::{constant_value, erased_params, rewrite_expr};
use super::interfaces::{add_default_forwarders, rewrite_interface_method};
use super::scope::{BodyKind, ClassContext, Scope};
use super::statement_rewriter::rewrite_block;
use crate::diagnostics::{TranslationError, TranslationResult};
use crate::metadata::runtime_annotations;
use crate::naming::{ivar_name, local_name, method_selector, static_var_name, OUTER_FIELD};
use crate::type_mapper::TypeMapper;
use log::debug;
use objc_ir::analysis::{balance_ownership, order_by_supertypes};
use objc_ir::{
    DeclKind, DeclarationTree, FieldDecl, FieldOwnership, InitializerDecl, Member as TargetMember, MethodDecl,
    MethodKind as TargetMethodKind, ParamDecl, Stmt as TargetStmt, TypeDecl, TypeDescriptor,
};
use source_model::visit::for_each_declaration;
use source_model::{
    CompilationUnit, Expr, ExprKind, FieldDeclaration, FieldRef, Location, Member, MethodDeclaration, Modifiers,
    QualifiedName, SourceType, TypeDeclaration, TypeKind, TypeParameter,
};

/// The declaration being rewritten, shared by the member builders
pub(super) struct TypeContext<'a> {
    pub mapper: TypeMapper<'a>,
    pub decl: &'a TypeDeclaration,
    pub class: ClassContext,
}

impl<'a> TypeContext<'a> {
    fn new(mapper: TypeMapper<'a>, decl: &'a TypeDeclaration) -> TranslationResult<Self> {
        Ok(Self {
            mapper,
            decl,
            class: ClassContext::new(mapper, &decl.name)?,
        })
    }

    pub fn scope(&self, kind: BodyKind) -> Scope<'_> {
        Scope::new(self.mapper, &self.class, kind)
    }

    /// Class of the enclosing instance, for inner classes
    pub fn outer(&self) -> Option<QualifiedName> {
        self.mapper.index().get(&self.decl.name).and_then(|info| info.outer.clone())
    }

    pub fn takes_enum_identity(&self) -> bool {
        self.mapper.index().takes_enum_identity(&self.decl.name)
    }
}

/// Rewrite one desugared unit. Every failing declaration contributes an
/// error; a unit with any error produces no tree.
pub fn rewrite_unit(unit: &CompilationUnit, mapper: TypeMapper<'_>) -> Result<DeclarationTree, Vec<TranslationError>> {
    if unit.is_package_info() {
        return package_info(unit, mapper).map_err(|e| vec![e]);
    }
    let Some(primary) = unit.primary_type() else {
        return Err(vec![TranslationError::unsupported(
            "compilation unit without a type declaration",
            Location::default(),
        )]);
    };
    let primary_ident = mapper.resolve(&primary.name).map_err(|e| vec![e])?;

    let mut types = vec![];
    let mut errors = vec![];
    for_each_declaration(&unit.types, &mut |decl| match rewrite_type(decl, mapper) {
        Ok(ty) => types.push(ty),
        Err(e) => errors.push(e),
    });
    if !errors.is_empty() {
        return Err(errors);
    }
    order_by_supertypes(&mut types);
    debug!("{}: {} declarations", unit.provenance, types.len());
    Ok(DeclarationTree {
        provenance: unit.provenance.clone(),
        primary: primary_ident,
        primary_name: primary.name.clone(),
        types,
    })
}

fn package_info(unit: &CompilationUnit, mapper: TypeMapper<'_>) -> TranslationResult<DeclarationTree> {
    let ident = mapper.registry().resolve_package_info(&unit.package)?;
    let name = QualifiedName::package_of(&unit.package);
    let mut holder = TypeDecl::new(ident.clone(), name.clone(), DeclKind::PackageInfo);
    holder.modifiers = Modifiers::new(Modifiers::INTERFACE | Modifiers::ABSTRACT | Modifiers::SYNTHETIC);
    holder.superclass = Some(TypeDescriptor::id());
    holder.annotations = runtime_annotations(mapper, &unit.package_annotations)?;
    holder.synthetic = true;
    Ok(DeclarationTree {
        provenance: unit.provenance.clone(),
        primary: ident,
        primary_name: name,
        types: vec![holder],
    })
}

fn decl_kind(kind: TypeKind) -> DeclKind {
    match kind {
        TypeKind::Class => DeclKind::Class,
        TypeKind::Interface => DeclKind::Interface,
        TypeKind::Enum => DeclKind::Enum,
        TypeKind::Annotation => DeclKind::Annotation,
    }
}

/// Anonymous classes (`Outer$1`) and lambdas (`Outer$$Lambda$1`) have no
/// source-level name. Local classes (`Outer$1Local`) keep theirs.
fn is_synthetic_name(simple_name: &str) -> bool {
    simple_name.contains("$Lambda$") || (!simple_name.is_empty() && simple_name.chars().all(|c| c.is_ascii_digit()))
}

pub fn rewrite_type(decl: &TypeDeclaration, mapper: TypeMapper<'_>) -> TranslationResult<TypeDecl> {
    let ctx = TypeContext::new(mapper, decl)?;
    let mut ty = TypeDecl::new(ctx.class.ident.clone(), decl.name.clone(), decl_kind(decl.kind));
    ty.modifiers = decl.modifiers;
    ty.superclass = superclass(mapper, decl)?;
    ty.protocols = decl
        .interfaces
        .iter()
        .filter_map(|i| i.class_name())
        .map(|n| mapper.reference(n))
        .collect::<TranslationResult<_>>()?;
    ty.enclosing = decl.name.outer();
    ty.generic_signature = class_generic_signature(mapper, decl);
    ty.annotations = runtime_annotations(mapper, &decl.annotations)?;
    ty.synthetic = is_synthetic_name(decl.name.simple_name());
    ty.alias = mapper.registry().alias(&decl.name).map(str::to_string);

    if decl.kind == TypeKind::Enum {
        add_enum_constants(&ctx, &mut ty)?;
    }
    if let Some(outer) = ctx.outer() {
        ty.push_synthetic(TargetMember::Field(outer_field(mapper, &outer)?));
    }

    let mut has_constructor = false;
    for member in &decl.members {
        match member {
            Member::Field(f) => {
                let field = rewrite_field(&ctx, f)?;
                let init = static_initializer(&ctx, &field, f)?;
                ty.members.push(TargetMember::Field(field));
                ty.members.extend(init.map(TargetMember::Initializer));
            }
            Member::Method(m) if m.is_constructor() => {
                has_constructor = true;
                ty.members.push(TargetMember::Method(rewrite_constructor(&ctx, m)?));
            }
            Member::Method(m) if decl.kind.is_interface_like() => {
                ty.members.extend(rewrite_interface_method(&ctx, m)?);
            }
            Member::Method(m) => ty.members.push(TargetMember::Method(rewrite_method(&ctx, m)?)),
            Member::Initializer(init) if init.is_static => {
                let mut scope = ctx.scope(BodyKind::Static);
                ty.members.push(TargetMember::Initializer(InitializerDecl {
                    body: rewrite_block(&mut scope, &init.body)?,
                    synthetic: false,
                }));
            }
            // Instance initializers are inlined into constructors, nested
            // types are flattened by the caller.
            Member::Initializer(_) | Member::Type(_) => {}
        }
    }

    if !decl.kind.is_interface_like() {
        if !has_constructor {
            ty.members.push(TargetMember::Method(default_constructor(&ctx)?));
        }
        if decl.kind == TypeKind::Enum {
            add_enum_methods(&ctx, &mut ty)?;
        }
        add_default_forwarders(&ctx, &mut ty)?;
        add_bridges(&ctx, &mut ty)?;
    }

    for member in ty.members.iter_mut() {
        match member {
            TargetMember::Method(MethodDecl { body: Some(body), .. }) => {
                balance_ownership(body);
            }
            TargetMember::Initializer(init) => {
                balance_ownership(&mut init.body);
            }
            _ => {}
        }
    }
    Ok(ty)
}

fn superclass(mapper: TypeMapper<'_>, decl: &TypeDeclaration) -> TranslationResult<Option<TypeDescriptor>> {
    if decl.kind.is_interface_like() {
        return Ok(None);
    }
    let name = match decl.superclass.as_ref().and_then(|s| s.class_name()) {
        Some(name) => name.clone(),
        None => match mapper.index().superclass_of(&decl.name) {
            Some(name) => name,
            // `java.lang.Object` itself
            None => return Ok(None),
        },
    };
    mapper.reference(&name).map(Some)
}

fn outer_field(mapper: TypeMapper<'_>, outer: &QualifiedName) -> TranslationResult<FieldDecl> {
    Ok(FieldDecl {
        name: OUTER_FIELD.to_string(),
        target_name: ivar_name(OUTER_FIELD),
        ty: mapper.reference(outer)?,
        modifiers: Modifiers::new(Modifiers::FINAL | Modifiers::SYNTHETIC),
        is_static: false,
        constant: None,
        // The enclosing instance usually owns this one.
        ownership: FieldOwnership::Weak,
        descriptor: outer.descriptor(),
        generic_signature: None,
        annotations: vec![],
        synthetic: true,
    })
}

// ============================================================================
// Fields
// ============================================================================

fn rewrite_field(ctx: &TypeContext, f: &FieldDeclaration) -> TranslationResult<FieldDecl> {
    let in_interface = ctx.decl.kind.is_interface_like();
    let is_static = f.modifiers.is_static() || in_interface;
    let modifiers = if in_interface {
        f.modifiers.with(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL)
    } else {
        f.modifiers
    };
    let ty = ctx.mapper.map_type(&f.ty)?;
    let constant = f
        .constant_value
        .as_ref()
        .filter(|_| is_static && modifiers.is_final())
        .map(constant_value);
    Ok(FieldDecl {
        name: f.name.clone(),
        target_name: if is_static {
            static_var_name(ctx.class.ident.as_str(), &f.name)
        } else {
            ivar_name(&f.name)
        },
        ownership: if ty.is_object() {
            FieldOwnership::Strong
        } else {
            FieldOwnership::Value
        },
        ty,
        modifiers,
        is_static,
        constant,
        descriptor: f.ty.descriptor(),
        generic_signature: f.ty.is_generic().then(|| f.ty.generic_signature()),
        annotations: runtime_annotations(ctx.mapper, &f.annotations)?,
        synthetic: f.modifiers.has(Modifiers::SYNTHETIC),
    })
}

/// `this.f = init` or `Owner.f = init`, as source code
pub(super) fn field_store(ctx: &TypeContext, f: &FieldDeclaration, is_static: bool, init: &Expr) -> Expr {
    let field = FieldRef {
        owner: ctx.decl.name.clone(),
        name: f.name.clone(),
        ty: f.ty.clone(),
        is_static,
        constant_value: None,
    };
    let target = Expr::new(ExprKind::Field { target: None, field }, f.ty.clone()).at(f.location);
    Expr::new(
        ExprKind::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(init.clone()),
        },
        f.ty.clone(),
    )
    .at(f.location)
}

/// Static initialization of a non-constant static field
fn static_initializer(
    ctx: &TypeContext,
    field: &FieldDecl,
    source: &FieldDeclaration,
) -> TranslationResult<Option<InitializerDecl>> {
    let Some(init) = source.initializer.as_ref() else {
        return Ok(None);
    };
    if !field.is_static || field.constant.is_some() {
        return Ok(None);
    }
    let mut scope = ctx.scope(BodyKind::Static);
    let store = rewrite_expr(&mut scope, &field_store(ctx, source, true, init))?;
    Ok(Some(InitializerDecl {
        body: vec![TargetStmt::Expr(store)],
        synthetic: false,
    }))
}

// ============================================================================
// Methods
// ============================================================================

/// Selector, parameters and return type of a declared method
pub(super) fn signature(
    mapper: TypeMapper<'_>,
    method: &MethodDeclaration,
) -> TranslationResult<(String, Vec<ParamDecl>, TypeDescriptor)> {
    let selector = method_selector(&method.name, &erased_params(mapper, &method.param_types())?);
    let params = method
        .params
        .iter()
        .map(|p| {
            Ok(ParamDecl {
                name: local_name(&p.var.name),
                ty: mapper.map_type(&p.ty)?,
            })
        })
        .collect::<TranslationResult<_>>()?;
    Ok((selector, params, mapper.map_type(&method.return_type)?))
}

/// Method metadata shared by every kind of method
pub(super) fn describe(ctx: &TypeContext, target: &mut MethodDecl, method: &MethodDeclaration) -> TranslationResult<()> {
    target.source_name = Some(method.name.clone());
    target.modifiers = method.modifiers;
    target.descriptor = method_descriptor(&method.param_types(), &method.return_type);
    target.generic_signature = method_generic_signature(ctx.mapper, method);
    target.throws = method
        .throws
        .iter()
        .filter_map(|t| t.erasure().class_name().map(|n| n.binary_name()))
        .collect();
    target.annotations = runtime_annotations(ctx.mapper, &method.annotations)?;
    target.public = !method.modifiers.is_private();
    target.synthetic = method.modifiers.has(Modifiers::SYNTHETIC);
    Ok(())
}

pub fn method_descriptor(params: &[SourceType], return_type: &SourceType) -> String {
    let params: String = params.iter().map(|p| p.descriptor()).collect();
    format!("({}){}", params, return_type.descriptor())
}

pub(super) fn rewrite_method(ctx: &TypeContext, method: &MethodDeclaration) -> TranslationResult<MethodDecl> {
    let (selector, params, ret) = signature(ctx.mapper, method)?;
    let kind = if method.modifiers.is_static() {
        TargetMethodKind::Static
    } else {
        TargetMethodKind::Instance
    };
    let mut target = MethodDecl::new(selector, kind, ret);
    target.params = params;
    describe(ctx, &mut target, method)?;
    let body_kind = if kind.is_static() {
        BodyKind::Static
    } else {
        BodyKind::Instance
    };
    target.body = method_body(ctx, method, body_kind)?;
    Ok(target)
}

/// Body of a method: native code verbatim, or the rewritten source body,
/// wrapped in `@synchronized` for synchronized methods
pub(super) fn method_body(
    ctx: &TypeContext,
    method: &MethodDeclaration,
    kind: BodyKind,
) -> TranslationResult<Option<objc_ir::Block>> {
    if method.modifiers.is_native() {
        return match &method.native_code {
            Some(code) => Ok(Some(vec![TargetStmt::Native(code.clone())])),
            None => Err(TranslationError::unsupported(
                format!("native method `{}` without a native body", method.name),
                method.location,
            )),
        };
    }
    let Some(body) = &method.body else {
        return Ok(None);
    };
    let mut scope = ctx.scope(kind);
    let block = rewrite_block(&mut scope, body)?;
    if !method.modifiers.is_synchronized() {
        return Ok(Some(block));
    }
    let lock = if kind == BodyKind::Static {
        objc_ir::Expr::new(objc_ir::ExprKind::ClassRef(ctx.class.ident.clone()), ctx.class.descriptor.clone())
    } else {
        scope.self_expr()
    };
    Ok(Some(vec![TargetStmt::Synchronized { lock, body: block }]))
}

// ============================================================================
// Generic signatures
// ============================================================================

/// `<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;>`
fn type_params_signature(mapper: TypeMapper<'_>, params: &[TypeParameter]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let mut sig = String::from("<");
    for param in params {
        sig.push_str(&param.name);
        let (interfaces, classes): (Vec<&SourceType>, Vec<&SourceType>) = param
            .bounds
            .iter()
            .partition(|b| b.class_name().map_or(false, |n| mapper.is_protocol(n)));
        sig.push(':');
        match classes.first() {
            Some(class) => sig.push_str(&class.generic_signature()),
            None if interfaces.is_empty() => sig.push_str("Ljava/lang/Object;"),
            None => {}
        }
        for bound in interfaces {
            sig.push(':');
            sig.push_str(&bound.generic_signature());
        }
    }
    sig.push('>');
    sig
}

fn class_generic_signature(mapper: TypeMapper<'_>, decl: &TypeDeclaration) -> Option<String> {
    let generic_supers =
        decl.superclass.iter().chain(decl.interfaces.iter()).any(|s| s.is_generic());
    if decl.type_params.is_empty() && !generic_supers {
        return None;
    }
    let mut sig = type_params_signature(mapper, &decl.type_params);
    match &decl.superclass {
        Some(s) => sig.push_str(&s.generic_signature()),
        None => sig.push_str("Ljava/lang/Object;"),
    }
    for i in &decl.interfaces {
        sig.push_str(&i.generic_signature());
    }
    Some(sig)
}

fn method_generic_signature(mapper: TypeMapper<'_>, method: &MethodDeclaration) -> Option<String> {
    let generic = !method.type_params.is_empty()
        || method.params.iter().any(|p| p.ty.is_generic())
        || method.return_type.is_generic()
        || method.throws.iter().any(|t| matches!(t, SourceType::TypeVariable { .. }));
    if !generic {
        return None;
    }
    let mut sig = type_params_signature(mapper, &method.type_params);
    sig.push('(');
    for p in &method.params {
        sig.push_str(&p.ty.generic_signature());
    }
    sig.push(')');
    sig.push_str(&method.return_type.generic_signature());
    Some(sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::fixtures::{class, field, method, name, unit, Fixture};
    use objc_ir::{ConstantValue, ExprKind as TargetKind};
    use source_model::{Literal, MethodRef, Stmt, StmtKind, VarRef};

    fn rewrite(fixture: &Fixture, index: usize) -> DeclarationTree {
        rewrite_unit(&fixture.units[index], fixture.mapper()).unwrap()
    }

    #[test]
    fn nested_classes_are_flattened_with_back_references() {
        let inner = class("a.Outer$Inner", vec![]);
        let mut outer = class("a.Outer", vec![Member::Type(inner)]);
        outer.modifiers = Modifiers::new(Modifiers::PUBLIC);
        let fixture = Fixture::new(vec![unit("a/Outer.java", vec![outer])]);
        let tree = rewrite(&fixture, 0);

        assert_eq!(tree.primary.as_str(), "AOuter");
        let idents: Vec<&str> = tree.types.iter().map(|t| t.ident.as_str()).collect();
        assert_eq!(idents, ["AOuter", "AOuter_Inner"]);
        let inner = &tree.types[1];
        assert_eq!(inner.enclosing, Some(name("a.Outer")));
        let back = inner.fields().find(|f| f.name == "this$0").unwrap();
        assert_eq!(back.ownership, FieldOwnership::Weak);
        assert!(back.synthetic);
        let ctor = inner.methods().find(|m| m.kind == TargetMethodKind::Constructor).unwrap();
        assert_eq!(ctor.selector, "initWithAOuter:");
        assert_eq!(ctor.params[0].name, "outer$");
    }

    #[test]
    fn static_constants_stay_out_of_initialize() {
        let mut max = field("MAX", SourceType::int(), Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
        let mut label = field("label", SourceType::string(), Modifiers::STATIC);
        if let Member::Field(f) = &mut max {
            f.initializer = Some(Expr::literal(Literal::Int(10)));
            f.constant_value = Some(Literal::Int(10));
        }
        if let Member::Field(f) = &mut label {
            f.initializer = Some(Expr::literal(Literal::String("x".to_string())));
        }
        let fixture = Fixture::new(vec![unit("a/Holder.java", vec![class("a.Holder", vec![max, label])])]);
        let tree = rewrite(&fixture, 0);
        let holder = &tree.types[0];

        let max = holder.fields().find(|f| f.name == "MAX").unwrap();
        assert_eq!(max.constant, Some(ConstantValue::Int(10)));
        assert_eq!(max.target_name, "AHolder_MAX");
        let inits: Vec<_> = holder.initializers().collect();
        assert_eq!(inits.len(), 1);
        let TargetStmt::Expr(store) = &inits[0].body[0] else { panic!("store expected") };
        let TargetKind::StrongAssign { target, .. } = &store.kind else { panic!("strong store expected") };
        assert!(matches!(&target.kind, TargetKind::StaticVar { name, .. } if name == "label"));
    }

    #[test]
    fn synchronized_methods_lock_the_receiver() {
        let mut m = method("run", vec![], SourceType::Void, vec![Stmt::ret(None)]);
        if let Member::Method(decl) = &mut m {
            decl.modifiers = decl.modifiers.with(Modifiers::SYNCHRONIZED);
        }
        let fixture = Fixture::new(vec![unit("a/Holder.java", vec![class("a.Holder", vec![m])])]);
        let tree = rewrite(&fixture, 0);
        let run = tree.types[0].methods().find(|m| m.selector == "run").unwrap();
        let body = run.body.as_ref().unwrap();
        assert!(matches!(&body[0], TargetStmt::Synchronized { lock, .. } if matches!(lock.kind, TargetKind::SelfRef)));
    }

    #[test]
    fn native_methods_need_native_code() {
        let mut m = method("peek", vec![], SourceType::int(), vec![]);
        if let Member::Method(decl) = &mut m {
            decl.modifiers = decl.modifiers.with(Modifiers::NATIVE);
            decl.body = None;
        }
        let fixture = Fixture::new(vec![unit("a/Holder.java", vec![class("a.Holder", vec![m])])]);
        let errors = rewrite_unit(&fixture.units[0], fixture.mapper()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), "UnsupportedConstruct");
    }

    #[test]
    fn generic_methods_record_their_signature() {
        let t = SourceType::TypeVariable {
            name: "T".to_string(),
            bounds: vec![],
        };
        let mut m = method(
            "first",
            vec![(VarRef::new(1, "items"), SourceType::array_of(t.clone()))],
            t,
            vec![],
        );
        if let Member::Method(decl) = &mut m {
            decl.type_params = vec![TypeParameter {
                name: "T".to_string(),
                bounds: vec![],
            }];
            decl.body = Some(vec![Stmt::new(StmtKind::Return(Some(Expr::literal(Literal::Null))))]);
        }
        let fixture = Fixture::new(vec![unit("a/Holder.java", vec![class("a.Holder", vec![m])])]);
        let tree = rewrite(&fixture, 0);
        let first = tree.types[0].methods().find(|m| m.source_name.as_deref() == Some("first")).unwrap();
        assert_eq!(first.selector, "firstWithIdArray:");
        assert_eq!(first.descriptor, "([Ljava/lang/Object;)Ljava/lang/Object;");
        assert_eq!(first.generic_signature.as_deref(), Some("<T:Ljava/lang/Object;>([TT;)TT;"));
    }

    fn releases(body: &[TargetStmt]) -> usize {
        let mut count = 0;
        for stmt in body {
            stmt.for_each_stmt(&mut |s| count += usize::from(matches!(s, TargetStmt::Release(_))));
        }
        count
    }

    #[test]
    fn translated_bodies_balance_created_locals() {
        let holder = SourceType::class("a.Holder");
        let create = || {
            Expr::new(
                ExprKind::New {
                    class: name("a.Holder"),
                    ctor: MethodRef::constructor(name("a.Holder"), vec![]),
                    args: vec![],
                    outer: None,
                    body: None,
                },
                holder.clone(),
            )
        };
        let (x, y) = (VarRef::new(1, "x"), VarRef::new(2, "y"));
        let local = |var: &VarRef, init: Expr| {
            Stmt::new(StmtKind::LocalVar {
                var: var.clone(),
                ty: holder.clone(),
                init: Some(init),
            })
        };
        // Holder x = new Holder(); Holder y = x; return y;
        let make = method(
            "make",
            vec![],
            holder.clone(),
            vec![
                local(&x, create()),
                local(&y, Expr::local(x.clone(), holder.clone())),
                Stmt::ret(Some(Expr::local(y, holder.clone()))),
            ],
        );
        // Holder x = new Holder(); return;
        let touch = method("touch", vec![], SourceType::Void, vec![local(&x, create()), Stmt::ret(None)]);
        let fixture = Fixture::new(vec![unit("a/Holder.java", vec![class("a.Holder", vec![make, touch])])]);
        let tree = rewrite(&fixture, 0);

        let make = tree.types[0].methods().find(|m| m.selector == "make").unwrap();
        let body = make.body.as_ref().unwrap();
        assert_eq!(releases(body), 0);
        assert!(objc_ir::analysis::verify_ownership(body).is_empty());

        let touch = tree.types[0].methods().find(|m| m.selector == "touch").unwrap();
        let body = touch.body.as_ref().unwrap();
        assert_eq!(releases(body), 1);
        assert!(objc_ir::analysis::verify_ownership(body).is_empty());
    }

    #[test]
    fn anonymous_names_are_synthetic() {
        assert!(is_synthetic_name("1"));
        assert!(is_synthetic_name("Outer$$Lambda$2"));
        assert!(!is_synthetic_name("1Local"));
        assert!(!is_synthetic_name("Inner"));
    }
}
