//! Structural comparison, hashing, copying and rendering across stores
//!
//! Two graphs of the same shape (both directed or both undirected) are equal
//! when they have the same size, the same link count, the same label
//! multiset, and for every index the same multiset of forward neighbours.
//! The functions here only use the [`Graph`] contract, so an array store and
//! a disk store holding the same structure compare equal.

use super::adjacency;
use super::error::GraphResult;
use super::traits::Graph;
use rustc_hash::{FxHashMap, FxHasher};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Structural equality between any two stores with the same label type
pub fn structurally_equal<A, B>(a: &A, b: &B) -> GraphResult<bool>
where
    A: Graph + ?Sized,
    B: Graph<Label = A::Label> + ?Sized,
{
    if a.is_directed() != b.is_directed()
        || a.size() != b.size()
        || a.num_links() != b.num_links()
    {
        return Ok(false);
    }

    let mut label_counts: FxHashMap<Option<A::Label>, i64> = FxHashMap::default();
    for index in 0..a.size() {
        *label_counts.entry(a.label_at(index)?).or_default() += 1;
        *label_counts.entry(b.label_at(index)?).or_default() -= 1;
    }
    if label_counts.values().any(|&count| count != 0) {
        return Ok(false);
    }

    for index in 0..a.size() {
        let left = adjacency::sorted(&a.forward(index)?);
        let right = adjacency::sorted(&b.forward(index)?);
        if left != right {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Hash consistent with [`structurally_equal`]
pub fn structural_hash<G: Graph + ?Sized>(graph: &G) -> GraphResult<u64> {
    let mut hasher = FxHasher::default();
    graph.is_directed().hash(&mut hasher);
    graph.size().hash(&mut hasher);
    graph.num_links().hash(&mut hasher);

    // Labels form a multiset: combine per-label hashes commutatively.
    let mut labels: u64 = 0;
    for index in 0..graph.size() {
        let mut label_hasher = FxHasher::default();
        graph.label_at(index)?.hash(&mut label_hasher);
        labels = labels.wrapping_add(label_hasher.finish());
    }
    labels.hash(&mut hasher);

    for index in 0..graph.size() {
        adjacency::sorted(&graph.forward(index)?).hash(&mut hasher);
    }
    Ok(hasher.finish())
}

/// Append the nodes and links of `source` to `dest`
///
/// Node `i` of the source becomes node `dest.size() + i`. Links keep their
/// orientation; a directed source copied into an undirected store yields one
/// undirected link per directed link.
pub fn copy_into<S, D>(source: &S, dest: &mut D) -> GraphResult<()>
where
    S: Graph + ?Sized,
    D: Graph<Label = S::Label> + ?Sized,
{
    let offset = dest.size();
    for index in 0..source.size() {
        dest.add(source.label_at(index)?)?;
    }
    for link in source.links() {
        let link = link?;
        let from = dest.get(offset + link.from().index())?;
        let to = dest.get(offset + link.to().index())?;
        dest.connect(from, to)?;
    }
    Ok(())
}

/// Render as `[0 -> 1, 1 -> 2, 3]`: every link in enumeration order, then
/// every node without links.
pub fn fmt_graph<G: Graph + ?Sized>(graph: &G, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut parts = Vec::new();
    for link in graph.links() {
        parts.push(link.map_err(|_| fmt::Error)?.to_string());
    }
    for index in 0..graph.size() {
        let forward = graph.forward(index).map_err(|_| fmt::Error)?;
        let backward = graph.backward(index).map_err(|_| fmt::Error)?;
        if forward.is_empty() && backward.is_empty() {
            parts.push(index.to_string());
        }
    }
    write!(f, "[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ArrayDirectedGraph, ArrayUndirectedGraph};

    fn triangle() -> ArrayDirectedGraph<char> {
        let mut graph = ArrayDirectedGraph::new();
        let nodes: Vec<_> = ['a', 'b', 'c']
            .into_iter()
            .map(|label| graph.add(Some(label)).unwrap())
            .collect();
        graph.connect(nodes[0], nodes[1]).unwrap();
        graph.connect(nodes[1], nodes[2]).unwrap();
        graph.connect(nodes[2], nodes[0]).unwrap();
        graph
    }

    #[test]
    fn test_copy_preserves_structure() {
        let source = triangle();
        let copy = ArrayDirectedGraph::copy_of(&source).unwrap();
        assert!(structurally_equal(&source, &copy).unwrap());
        assert_eq!(
            structural_hash(&source).unwrap(),
            structural_hash(&copy).unwrap()
        );
    }

    #[test]
    fn test_label_multiset_matters() {
        let source = triangle();
        let mut other = ArrayDirectedGraph::new();
        let nodes: Vec<_> = ['a', 'b', 'b']
            .into_iter()
            .map(|label| other.add(Some(label)).unwrap())
            .collect();
        other.connect(nodes[0], nodes[1]).unwrap();
        other.connect(nodes[1], nodes[2]).unwrap();
        other.connect(nodes[2], nodes[0]).unwrap();
        assert!(!structurally_equal(&source, &other).unwrap());
    }

    #[test]
    fn test_directedness_matters() {
        let source = triangle();
        let undirected = ArrayUndirectedGraph::copy_of(&source).unwrap();
        assert_eq!(undirected.num_links(), 3);
        assert!(!structurally_equal(&source, &undirected).unwrap());
    }

    #[test]
    fn test_copy_appends_after_existing_nodes() {
        let source = triangle();
        let mut dest = ArrayDirectedGraph::new();
        dest.add(Some('z')).unwrap();
        copy_into(&source, &mut dest).unwrap();
        assert_eq!(dest.size(), 4);
        assert_eq!(dest.to_string(), "[1 -> 2, 2 -> 3, 3 -> 1, 0]");
    }
}
