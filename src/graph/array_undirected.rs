//! In-memory undirected graph store
//!
//! One neighbour list per node. A link `a -- b` is recorded in both lists; a
//! self-link `a -- a` is recorded once.

use super::adjacency;
use super::config::Limits;
use super::equality;
use super::error::{GraphError, GraphResult};
use super::traits::{node_ref, Graph};
use super::types::{GraphId, LabelValue, LinkRef, NodeRef};
use rustc_hash::FxHashSet;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Array-backed undirected graph
#[derive(Debug)]
pub struct ArrayUndirectedGraph<L> {
    id: GraphId,
    labels: Vec<Option<L>>,
    neighbors: Vec<Vec<u32>>,
    num_links: u64,
    state: u64,
    index_epoch: u64,
    limits: Limits,
    sorted_at: Option<u64>,
    hash_cache: Cell<Option<(u64, u64)>>,
}

impl<L: LabelValue> ArrayUndirectedGraph<L> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(nodes: usize) -> Self {
        ArrayUndirectedGraph {
            id: GraphId::next(),
            labels: Vec::with_capacity(nodes),
            neighbors: Vec::with_capacity(nodes),
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

    /// Copy any graph into a new undirected array-backed store
    ///
    /// Directed links of the source become undirected links.
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

    /// Sort every neighbour list ascending; cached against `state()`
    pub fn sort(&mut self) {
        if self.sorted_at == Some(self.state) {
            return;
        }
        for list in self.neighbors.iter_mut() {
            list.sort_unstable();
        }
        self.sorted_at = Some(self.state);
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted_at == Some(self.state)
    }

    pub fn compact(&mut self) {
        self.labels.shrink_to_fit();
        self.neighbors.shrink_to_fit();
        for list in self.neighbors.iter_mut() {
            list.shrink_to_fit();
        }
    }

    /// Raw neighbour list
    pub fn neighbor_list(&self, node: NodeRef) -> GraphResult<&[u32]> {
        let index = self.validate(node)?;
        Ok(&self.neighbors[index])
    }

    fn touch(&mut self) {
        self.state += 1;
    }
}

impl<L: LabelValue> Default for ArrayUndirectedGraph<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LabelValue> Graph for ArrayUndirectedGraph<L> {
    type Label = L;

    fn id(&self) -> GraphId {
        self.id
    }

    fn is_directed(&self) -> bool {
        false
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
        self.neighbors
            .get(index)
            .map(|list| Cow::Borrowed(list.as_slice()))
            .ok_or(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            })
    }

    fn backward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>> {
        self.forward(index)
    }

    fn labels(&self) -> GraphResult<FxHashSet<L>> {
        Ok(self.labels.iter().flatten().cloned().collect())
    }

    fn add(&mut self, label: Option<L>) -> GraphResult<NodeRef> {
        self.limits.check_nodes(self.size())?;
        let index = self.size() as u32;
        self.labels.push(label);
        self.neighbors.push(Vec::new());
        self.touch();
        Ok(node_ref(self, index))
    }

    fn connect(&mut self, from: NodeRef, to: NodeRef) -> GraphResult<LinkRef> {
        let ai = self.validate(from)?;
        let bi = self.validate(to)?;
        self.limits.check_degree(self.neighbors[ai].len())?;
        if ai != bi {
            self.limits.check_degree(self.neighbors[bi].len())?;
        }

        self.neighbors[ai].push(bi as u32);
        if ai != bi {
            self.neighbors[bi].push(ai as u32);
        }
        self.num_links += 1;
        self.touch();
        Ok(LinkRef::undirected(self.id, ai as u32, bi as u32, self.index_epoch))
    }

    fn disconnect(&mut self, a: NodeRef, b: NodeRef) -> GraphResult<usize> {
        let ai = self.validate(a)?;
        let bi = self.validate(b)?;

        let removed = adjacency::remove_all(&mut self.neighbors[ai], bi as u32);
        if ai != bi {
            adjacency::remove_all(&mut self.neighbors[bi], ai as u32);
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
        // Each incident link, self-links included, occupies exactly one slot here.
        let links = self.neighbors[index].len();

        self.labels.remove(index);
        self.neighbors.remove(index);
        for list in self.neighbors.iter_mut() {
            adjacency::strip_and_shift(list, removed);
        }

        self.num_links -= links as u64;
        self.touch();
        self.index_epoch += 1;
        Ok(())
    }

    fn remove_link(&mut self, link: LinkRef) -> GraphResult<()> {
        let (ai, bi) = self.validate_link(link)?;
        if !adjacency::remove_one(&mut self.neighbors[ai], bi as u32) {
            return Err(GraphError::LinkNotFound { from: ai, to: bi });
        }
        if ai != bi {
            adjacency::remove_one(&mut self.neighbors[bi], ai as u32);
        }
        self.num_links -= 1;
        self.touch();
        Ok(())
    }
}

impl<L: LabelValue> PartialEq for ArrayUndirectedGraph<L> {
    fn eq(&self, other: &Self) -> bool {
        equality::structurally_equal(self, other).unwrap_or(false)
    }
}

impl<L: LabelValue> Eq for ArrayUndirectedGraph<L> {}

impl<L: LabelValue> Hash for ArrayUndirectedGraph<L> {
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

impl<L: LabelValue> fmt::Display for ArrayUndirectedGraph<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        equality::fmt_graph(self, f)
    }
}
