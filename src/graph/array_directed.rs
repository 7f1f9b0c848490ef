//! In-memory directed graph store
//!
//! Uses one growable list of neighbour indices per node and direction:
//! - labels: index -> Option<label>
//! - outgoing: index -> Vec<u32> (successors, one entry per link)
//! - incoming: index -> Vec<u32> (predecessors, one entry per link)
//!
//! Connecting is O(1) amortised. Removing a node is O(V + E): every list is
//! scanned to strip the removed index and shift the ones above it.

use super::adjacency;
use super::config::Limits;
use super::equality;
use super::error::{GraphError, GraphResult};
use super::traits::{node_ref, DirectedGraph, Graph};
use super::types::{GraphId, LabelValue, LinkRef, NodeRef};
use rustc_hash::FxHashSet;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Array-backed directed graph
#[derive(Debug)]
pub struct ArrayDirectedGraph<L> {
    id: GraphId,

    /// Node labels, indexed like the adjacency lists
    labels: Vec<Option<L>>,

    /// Outgoing adjacency list for each node
    outgoing: Vec<Vec<u32>>,

    /// Incoming adjacency list for each node
    incoming: Vec<Vec<u32>>,

    num_links: u64,

    /// Bumped on every structural mutation
    state: u64,

    /// Bumped on node removal only
    index_epoch: u64,

    limits: Limits,

    /// State at which every list was last sorted ascending
    sorted_at: Option<u64>,

    /// (state, hash) of the last structural hash computed
    hash_cache: Cell<Option<(u64, u64)>>,
}

impl<L: LabelValue> ArrayDirectedGraph<L> {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty graph with room for `nodes` nodes
    pub fn with_capacity(nodes: usize) -> Self {
        ArrayDirectedGraph {
            id: GraphId::next(),
            labels: Vec::with_capacity(nodes),
            outgoing: Vec::with_capacity(nodes),
            incoming: Vec::with_capacity(nodes),
            num_links: 0,
            state: 0,
            index_epoch: 0,
            limits: Limits::default(),
            sorted_at: Some(0),
            hash_cache: Cell::new(None),
        }
    }

    pub fn with_limits(limits: Limits) -> Self {
        let mut graph = Self::new();
        graph.limits = limits;
        graph
    }

    /// Copy any graph into a new array-backed store
    pub fn copy_of<G>(source: &G) -> GraphResult<Self>
    where
        G: Graph<Label = L> + ?Sized,
    {
        let mut graph = Self::with_capacity(source.size());
        equality::copy_into(source, &mut graph)?;
        Ok(graph)
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Sort every neighbour list ascending
    ///
    /// Makes link enumeration order deterministic. Cached against `state()`,
    /// so repeated calls without intervening mutation are free.
    pub fn sort(&mut self) {
        if self.sorted_at == Some(self.state) {
            return;
        }
        for list in self.outgoing.iter_mut().chain(self.incoming.iter_mut()) {
            list.sort_unstable();
        }
        self.sorted_at = Some(self.state);
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted_at == Some(self.state)
    }

    /// Release excess capacity held by the lists
    pub fn compact(&mut self) {
        self.labels.shrink_to_fit();
        self.outgoing.shrink_to_fit();
        self.incoming.shrink_to_fit();
        for list in self.outgoing.iter_mut().chain(self.incoming.iter_mut()) {
            list.shrink_to_fit();
        }
    }

    /// Raw successor list
    pub fn out_list(&self, node: NodeRef) -> GraphResult<&[u32]> {
        let index = self.validate(node)?;
        Ok(&self.outgoing[index])
    }

    /// Raw predecessor list
    pub fn in_list(&self, node: NodeRef) -> GraphResult<&[u32]> {
        let index = self.validate(node)?;
        Ok(&self.incoming[index])
    }

    fn touch(&mut self) {
        self.state += 1;
    }
}

impl<L: LabelValue> Default for ArrayDirectedGraph<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LabelValue> Graph for ArrayDirectedGraph<L> {
    type Label = L;

    fn id(&self) -> GraphId {
        self.id
    }

    fn is_directed(&self) -> bool {
        true
    }

    fn size(&self) -> usize {
        self.labels.len()
    }

    fn num_links(&self) -> u64 {
        self.num_links
    }

    fn state(&self) -> u64 {
        self.state
    }

    fn index_epoch(&self) -> u64 {
        self.index_epoch
    }

    fn label_at(&self, index: usize) -> GraphResult<Option<L>> {
        self.labels
            .get(index)
            .cloned()
            .ok_or(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            })
    }

    fn forward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>> {
        self.outgoing
            .get(index)
            .map(|list| Cow::Borrowed(list.as_slice()))
            .ok_or(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            })
    }

    fn backward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>> {
        self.incoming
            .get(index)
            .map(|list| Cow::Borrowed(list.as_slice()))
            .ok_or(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            })
    }

    fn labels(&self) -> GraphResult<FxHashSet<L>> {
        Ok(self.labels.iter().flatten().cloned().collect())
    }

    fn add(&mut self, label: Option<L>) -> GraphResult<NodeRef> {
        self.limits.check_nodes(self.size())?;
        let index = self.size() as u32;
        self.labels.push(label);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.touch();
        Ok(node_ref(self, index))
    }

    fn connect(&mut self, from: NodeRef, to: NodeRef) -> GraphResult<LinkRef> {
        let fi = self.validate(from)?;
        let ti = self.validate(to)?;
        self.limits.check_degree(self.outgoing[fi].len())?;
        self.limits.check_degree(self.incoming[ti].len())?;

        self.outgoing[fi].push(ti as u32);
        self.incoming[ti].push(fi as u32);
        self.num_links += 1;
        self.touch();
        Ok(LinkRef::directed(self.id, fi as u32, ti as u32, self.index_epoch))
    }

    fn disconnect(&mut self, a: NodeRef, b: NodeRef) -> GraphResult<usize> {
        let ai = self.validate(a)?;
        let bi = self.validate(b)?;

        let mut removed = adjacency::remove_all(&mut self.outgoing[ai], bi as u32);
        adjacency::remove_all(&mut self.incoming[bi], ai as u32);
        if ai != bi {
            removed += adjacency::remove_all(&mut self.outgoing[bi], ai as u32);
            adjacency::remove_all(&mut self.incoming[ai], bi as u32);
        }

        if removed > 0 {
            self.num_links -= removed as u64;
            self.touch();
        }
        Ok(removed)
    }

    fn remove_node(&mut self, node: NodeRef) -> GraphResult<()> {
        let index = self.validate(node)?;
        let removed = index as u32;

        // A self-link sits in both of this node's lists but is one link.
        let self_links = adjacency::count(&self.outgoing[index], removed);
        let links = self.outgoing[index].len() + self.incoming[index].len() - self_links;

        self.labels.remove(index);
        self.outgoing.remove(index);
        self.incoming.remove(index);
        for list in self.outgoing.iter_mut().chain(self.incoming.iter_mut()) {
            adjacency::strip_and_shift(list, removed);
        }

        self.num_links -= links as u64;
        self.touch();
        // Last: handles validated before this point saw a consistent store.
        self.index_epoch += 1;
        Ok(())
    }

    fn remove_link(&mut self, link: LinkRef) -> GraphResult<()> {
        let (fi, ti) = self.validate_link(link)?;
        if !adjacency::remove_one(&mut self.outgoing[fi], ti as u32) {
            return Err(GraphError::LinkNotFound { from: fi, to: ti });
        }
        adjacency::remove_one(&mut self.incoming[ti], fi as u32);
        self.num_links -= 1;
        self.touch();
        Ok(())
    }
}

impl<L: LabelValue> DirectedGraph for ArrayDirectedGraph<L> {}

impl<L: LabelValue> PartialEq for ArrayDirectedGraph<L> {
    fn eq(&self, other: &Self) -> bool {
        equality::structurally_equal(self, other).unwrap_or(false)
    }
}

impl<L: LabelValue> Eq for ArrayDirectedGraph<L> {}

impl<L: LabelValue> Hash for ArrayDirectedGraph<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let hash = match self.hash_cache.get() {
            Some((cached_at, hash)) if cached_at == self.state => hash,
            _ => {
                let hash = equality::structural_hash(self).unwrap_or_default();
                self.hash_cache.set(Some((self.state, hash)));
                hash
            }
        };
        state.write_u64(hash);
    }
}

impl<L: LabelValue> fmt::Display for ArrayDirectedGraph<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        equality::fmt_graph(self, f)
    }
}
