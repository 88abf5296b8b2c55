// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Stable ordering of declarations so supertypes precede their subtypes

use crate::data::declarations::TypeDecl;
use petgraph::algo::condensation;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::EdgeRef;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Reorder `types` so that every superclass or protocol defined in the same
/// list comes before the types extending it. Declarations with no such
/// constraint keep their relative order.
pub fn order_by_supertypes(types: &mut Vec<TypeDecl>) {
    let order = supertype_order(types);
    if order.iter().enumerate().all(|(pos, &idx)| pos == idx) {
        return;
    }
    let mut slots: Vec<Option<TypeDecl>> = types.drain(..).map(Some).collect();
    types.extend(order.into_iter().filter_map(|idx| slots[idx].take()));
}

/// Indices of `types` in dependency order
fn supertype_order(types: &[TypeDecl]) -> Vec<usize> {
    let index: HashMap<&str, usize> = types
        .iter()
        .enumerate()
        .map(|(i, t)| (t.ident.as_str(), i))
        .collect();

    // Build graph including ALL nodes, even those with no edges
    let mut graph = DiGraphMap::<usize, ()>::with_capacity(types.len(), 0);
    for i in 0..types.len() {
        graph.add_node(i);
    }
    for (i, ty) in types.iter().enumerate() {
        let supers = ty.superclass.iter().chain(ty.protocols.iter());
        for dep in supers.filter_map(|s| s.reference_ident()) {
            if let Some(&d) = index.get(dep.as_str()) {
                if d != i {
                    graph.add_edge(d, i, ());
                }
            }
        }
    }

    // Cycles cannot come from well-formed input, but condensing keeps the
    // sort total if they do.
    let condensed = condensation(graph.into_graph::<u32>(), true);

    // Kahn's algorithm, always emitting the ready group holding the
    // earliest declaration.
    let mut in_degree: Vec<usize> = vec![0; condensed.node_count()];
    for edge in condensed.edge_references() {
        in_degree[edge.target().index()] += 1;
    }
    let key = |n: usize| -> usize {
        condensed[petgraph::graph::NodeIndex::new(n)]
            .iter()
            .copied()
            .min()
            .unwrap_or(usize::MAX)
    };
    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(n, _)| Reverse((key(n), n)))
        .collect();

    let mut order = Vec::with_capacity(types.len());
    while let Some(Reverse((_, n))) = ready.pop() {
        let node = petgraph::graph::NodeIndex::new(n);
        let mut group = condensed[node].clone();
        group.sort_unstable();
        order.extend(group);
        for edge in condensed.edges(node) {
            let t = edge.target().index();
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                ready.push(Reverse((key(t), t)));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::declarations::DeclKind;
    use crate::data::types::{GeneratedIdentifier, ReferenceKind, TypeDescriptor};
    use source_model::{NameKind, QualifiedName};

    fn decl(name: &str, superclass: Option<&str>) -> TypeDecl {
        let qn = QualifiedName::from_binary_name(name, NameKind::Class);
        let mut t = TypeDecl::new(GeneratedIdentifier::new(name), qn, DeclKind::Class);
        t.superclass = superclass.map(|s| TypeDescriptor::Reference {
            ident: GeneratedIdentifier::new(s),
            kind: ReferenceKind::Class,
            name: QualifiedName::from_binary_name(s, NameKind::Class),
        });
        t
    }

    fn names(types: &[TypeDecl]) -> Vec<&str> {
        types.iter().map(|t| t.ident.as_str()).collect()
    }

    #[test]
    fn hoists_supertypes_and_keeps_other_order() {
        let mut types = vec![
            decl("A", None),
            decl("Sub", Some("Base")),
            decl("C", None),
            decl("Base", None),
            decl("D", Some("External")),
        ];
        order_by_supertypes(&mut types);
        assert_eq!(names(&types), vec!["A", "C", "Base", "Sub", "D"]);
    }

    #[test]
    fn already_ordered_input_is_untouched() {
        let mut types = vec![decl("Base", None), decl("Sub", Some("Base")), decl("X", None)];
        order_by_supertypes(&mut types);
        assert_eq!(names(&types), vec!["Base", "Sub", "X"]);
    }
}
