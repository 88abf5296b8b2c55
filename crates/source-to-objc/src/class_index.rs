// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Run-wide index of declared types
//!
//! Built during scanning from every unit of the run, then shared read-only
//! by the rewriters. It answers the questions a single unit cannot: whether
//! a class takes an enclosing instance, whether a name is an interface,
//! which default methods a class inherits.

use rayon::prelude::*;
use source_model::visit::for_each_declaration;
use source_model::{
    CompilationUnit, MethodKind, MethodRef, Modifiers, NameKind, QualifiedName, SourceType, TypeDeclaration,
    TypeKind,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const OBJECT: &str = "java.lang.Object";
const ENUM: &str = "java.lang.Enum";

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMethod {
    pub method: MethodRef,
    pub is_abstract: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: QualifiedName,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub superclass: Option<QualifiedName>,
    pub interfaces: Vec<QualifiedName>,
    /// Class whose instance this one holds as its enclosing instance
    pub outer: Option<QualifiedName>,
    /// Instance methods, declared order
    pub methods: Vec<IndexedMethod>,
}

impl ClassInfo {
    fn from_declaration(decl: &TypeDeclaration, enclosing_is_interface: bool) -> Self {
        let outer = match decl.kind {
            TypeKind::Class if !decl.modifiers.is_static() && !enclosing_is_interface => decl.name.outer(),
            _ => None,
        };
        let superclass = decl.superclass.as_ref().and_then(|s| s.class_name().cloned()).or_else(|| {
            match decl.kind {
                TypeKind::Enum => Some(QualifiedName::from_binary_name(ENUM, NameKind::Class)),
                TypeKind::Class if !decl.name.is(OBJECT) => {
                    Some(QualifiedName::from_binary_name(OBJECT, NameKind::Class))
                }
                _ => None,
            }
        });
        let methods = decl
            .methods()
            .filter(|m| m.kind == MethodKind::Method && !m.modifiers.is_static())
            .map(|m| IndexedMethod {
                method: MethodRef {
                    owner: decl.name.clone(),
                    name: m.name.clone(),
                    params: m.param_types(),
                    return_type: m.return_type.clone(),
                    is_static: false,
                    is_constructor: false,
                    is_varargs: m.modifiers.has(Modifiers::VARARGS),
                },
                is_abstract: m.body.is_none() && m.native_code.is_none(),
                is_default: decl.kind.is_interface_like() && (m.modifiers.is_default() || m.body.is_some()),
            })
            .collect();
        Self {
            name: decl.name.clone(),
            kind: decl.kind,
            modifiers: decl.modifiers,
            superclass,
            interfaces: decl.interfaces.iter().filter_map(|i| i.class_name().cloned()).collect(),
            outer,
            methods,
        }
    }

    pub fn needs_outer(&self) -> bool {
        self.outer.is_some()
    }

    pub fn is_interface(&self) -> bool {
        self.kind.is_interface_like()
    }

    pub fn declares(&self, method: &MethodRef) -> Option<&IndexedMethod> {
        self.methods.iter().find(|m| m.method.same_erased_signature(method))
    }
}

/// Index of every type declared by the units of a run
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: BTreeMap<QualifiedName, ClassInfo>,
}

impl ClassIndex {
    /// Declarations of one unit, including nested, local and anonymous types
    pub fn collect(unit: &CompilationUnit) -> Vec<ClassInfo> {
        let interfaces: BTreeSet<QualifiedName> = {
            let mut names = BTreeSet::new();
            for_each_declaration(&unit.types, &mut |decl| {
                if decl.kind.is_interface_like() {
                    names.insert(decl.name.clone());
                }
            });
            names
        };
        let mut infos = vec![];
        for_each_declaration(&unit.types, &mut |decl| {
            let enclosing_is_interface = decl.name.outer().map_or(false, |o| interfaces.contains(&o));
            infos.push(ClassInfo::from_declaration(decl, enclosing_is_interface));
        });
        infos
    }

    pub fn build(units: &[CompilationUnit]) -> Self {
        let collected: Vec<Vec<ClassInfo>> = units.par_iter().map(Self::collect).collect();
        let mut classes = BTreeMap::new();
        for info in collected.into_iter().flatten() {
            // Duplicates are reported by the registry; the first unit wins here.
            classes.entry(info.name.clone()).or_insert(info);
        }
        Self { classes }
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn is_interface(&self, name: &QualifiedName) -> bool {
        self.get(name).map_or(
            matches!(name.kind, NameKind::Interface | NameKind::Annotation),
            ClassInfo::is_interface,
        )
    }

    pub fn is_enum(&self, name: &QualifiedName) -> bool {
        name.is(ENUM) || self.get(name).map_or(name.kind == NameKind::Enum, |c| c.kind == TypeKind::Enum)
    }

    /// Constructors of enums, and of the classes of constants with bodies,
    /// take the constant's name and ordinal after their declared parameters.
    pub fn takes_enum_identity(&self, name: &QualifiedName) -> bool {
        self.is_enum(name) || self.superclass_of(name).map_or(false, |s| self.is_enum(&s))
    }

    pub fn superclass_of(&self, name: &QualifiedName) -> Option<QualifiedName> {
        self.get(name).and_then(|c| c.superclass.clone())
    }

    /// Superclass chain, nearest first, as far as the index knows it
    pub fn superclasses(&self, name: &QualifiedName) -> Vec<QualifiedName> {
        let mut chain = vec![];
        let mut current = self.superclass_of(name);
        while let Some(s) = current {
            if chain.contains(&s) {
                break;
            }
            current = self.superclass_of(&s);
            chain.push(s);
        }
        chain
    }

    /// Interfaces implemented by `name` and their superinterfaces, breadth first
    pub fn interface_closure(&self, name: &QualifiedName) -> Vec<QualifiedName> {
        let mut seen = BTreeSet::new();
        let mut order = vec![];
        let mut queue: VecDeque<QualifiedName> = self
            .get(name)
            .map(|c| c.interfaces.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(info) = self.get(&next) {
                queue.extend(info.interfaces.iter().cloned());
            }
            order.push(next);
        }
        order
    }

    /// True if `sub` is `sup` or inherits from it. Types outside the index
    /// are only known to inherit from the root class.
    pub fn is_subtype(&self, sub: &QualifiedName, sup: &QualifiedName) -> bool {
        if sub == sup || sup.is(OBJECT) {
            return true;
        }
        let mut candidates = vec![sub.clone()];
        candidates.extend(self.superclasses(sub));
        candidates.iter().any(|c| c == sup || self.interface_closure(c).contains(sup))
    }

    pub fn is_source_subtype(&self, sub: &SourceType, sup: &SourceType) -> bool {
        if *sub == SourceType::Null {
            return sup.is_reference();
        }
        match (sub.erasure(), sup.erasure()) {
            (_, SourceType::Class { name, .. }) if name.is(OBJECT) => sub.is_reference(),
            (SourceType::Class { name: a, .. }, SourceType::Class { name: b, .. }) => self.is_subtype(&a, &b),
            (a, b) => a == b,
        }
    }

    /// Interface default methods `name` inherits without an implementation
    /// of its own or from a superclass, paired with the declaring interface.
    /// Empty for interfaces.
    pub fn inherited_defaults(&self, name: &QualifiedName) -> Vec<(QualifiedName, MethodRef)> {
        let Some(info) = self.get(name) else {
            return vec![];
        };
        if info.is_interface() {
            return vec![];
        }
        let supers = self.superclasses(name);
        let inherited: BTreeSet<QualifiedName> = supers.iter().flat_map(|s| self.interface_closure(s)).collect();
        let implemented_above = |m: &MethodRef| {
            supers
                .iter()
                .filter_map(|s| self.get(s))
                .any(|s| s.declares(m).map_or(false, |d| !d.is_abstract))
        };

        let mut chosen: Vec<(QualifiedName, MethodRef)> = vec![];
        for iface in self.interface_closure(name) {
            if inherited.contains(&iface) {
                continue;
            }
            let Some(iface_info) = self.get(&iface) else {
                continue;
            };
            for m in iface_info.methods.iter().filter(|m| m.is_default) {
                let sig = &m.method;
                if info.declares(sig).is_some()
                    || implemented_above(sig)
                    || chosen.iter().any(|(_, c)| c.same_erased_signature(sig))
                {
                    continue;
                }
                chosen.push((iface.clone(), sig.clone()));
            }
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_model::{Block, Member, MethodDeclaration, NameKind, Provenance};

    fn method(name: &str, body: Option<Block>) -> Member {
        Member::Method(MethodDeclaration {
            name: name.to_string(),
            kind: MethodKind::Method,
            modifiers: Modifiers::default(),
            type_params: vec![],
            params: vec![],
            return_type: SourceType::Void,
            throws: vec![],
            body,
            native_code: None,
            overrides: vec![],
            annotations: vec![],
            default_value: None,
            location: Default::default(),
        })
    }

    fn unit(types: Vec<TypeDeclaration>) -> CompilationUnit {
        let mut unit = CompilationUnit::new(Provenance::File { path: "a/A.java".to_string() }, &["a"]);
        unit.types = types;
        unit
    }

    fn api() -> TypeDeclaration {
        let mut api = TypeDeclaration::new(QualifiedName::from_binary_name("a.Api", NameKind::Interface), TypeKind::Interface);
        api.members.push(method("run", None));
        api.members.push(method("describe", Some(vec![])));
        api
    }

    #[test]
    fn inner_classes_take_outer_instances() {
        let mut outer = TypeDeclaration::new(QualifiedName::from_binary_name("a.Outer", NameKind::Class), TypeKind::Class);
        let inner = TypeDeclaration::new(QualifiedName::from_binary_name("a.Outer$Inner", NameKind::Class), TypeKind::Class);
        let mut nested = TypeDeclaration::new(QualifiedName::from_binary_name("a.Outer$Nested", NameKind::Class), TypeKind::Class);
        nested.modifiers = Modifiers::new(Modifiers::STATIC);
        outer.members.push(Member::Type(inner));
        outer.members.push(Member::Type(nested));
        let index = ClassIndex::build(&[unit(vec![outer, api()])]);
        assert_eq!(index.len(), 4);
        assert!(index.get(&QualifiedName::from_binary_name("a.Outer$Inner", NameKind::Class)).unwrap().needs_outer());
        assert!(!index.get(&QualifiedName::from_binary_name("a.Outer$Nested", NameKind::Class)).unwrap().needs_outer());
        assert!(!index.get(&QualifiedName::from_binary_name("a.Outer", NameKind::Class)).unwrap().needs_outer());
    }

    #[test]
    fn default_methods_need_forwarders_once() {
        let mut base = TypeDeclaration::new(QualifiedName::from_binary_name("a.Base", NameKind::Class), TypeKind::Class);
        base.interfaces.push(SourceType::interface("a.Api"));
        base.members.push(method("run", Some(vec![])));
        let mut sub = TypeDeclaration::new(QualifiedName::from_binary_name("a.Sub", NameKind::Class), TypeKind::Class);
        sub.superclass = Some(SourceType::class("a.Base"));
        sub.interfaces.push(SourceType::interface("a.Api"));

        let index = ClassIndex::build(&[unit(vec![api(), base, sub])]);
        let base_defaults = index.inherited_defaults(&QualifiedName::from_binary_name("a.Base", NameKind::Class));
        assert_eq!(base_defaults.len(), 1);
        assert_eq!(base_defaults[0].1.name, "describe");
        // Already forwarded by the superclass.
        assert!(index.inherited_defaults(&QualifiedName::from_binary_name("a.Sub", NameKind::Class)).is_empty());
        assert!(index.is_subtype(
            &QualifiedName::from_binary_name("a.Sub", NameKind::Class),
            &QualifiedName::from_binary_name("a.Api", NameKind::Interface)
        ));
    }
}
