//! The store contract
//!
//! Every backing store implements [`Graph`]: a handful of required methods
//! that touch storage, plus provided methods built on top of them. Handle
//! validation lives here so the stores share one definition of liveness:
//!
//! 1. the handle was issued by this store instance,
//! 2. the store's index epoch has not moved since the handle was issued,
//! 3. the index is inside `[0, size)`.
//!
//! Directed stores additionally implement [`DirectedGraph`]. [`FastWalk`] is
//! available on every store for allocation-light random traversal.

use super::adjacency;
use super::error::{GraphError, GraphResult};
use super::iter::{LinkCursor, Links, Nodes};
use super::types::{GraphId, LabelValue, LinkRef, NodeRef};
use rustc_hash::FxHashSet;
use std::borrow::Cow;

/// Node/link store with dense integer indices and epoch-checked handles
pub trait Graph {
    type Label: LabelValue;

    /// Identity of this store instance
    fn id(&self) -> GraphId;

    fn is_directed(&self) -> bool;

    /// Number of nodes
    fn size(&self) -> usize;

    /// Number of links, counting parallel links and self-links individually
    fn num_links(&self) -> u64;

    /// Mutation counter; changes on every structural mutation and only then
    fn state(&self) -> u64;

    /// Counter bumped only by node removal
    fn index_epoch(&self) -> u64;

    /// Label stored at `index`, without handle validation
    fn label_at(&self, index: usize) -> GraphResult<Option<Self::Label>>;

    /// Outgoing neighbour indices (directed) or all neighbour indices
    /// (undirected) of the node at `index`, in storage order with duplicates.
    fn forward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>>;

    /// Incoming neighbour indices (directed); same as [`Graph::forward`] for
    /// undirected stores.
    fn backward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>>;

    /// Append a node at index `size()`
    fn add(&mut self, label: Option<Self::Label>) -> GraphResult<NodeRef>;

    /// Add one link. Parallel links and self-links are allowed.
    fn connect(&mut self, from: NodeRef, to: NodeRef) -> GraphResult<LinkRef>;

    /// Remove every link between `a` and `b` (both directions for directed
    /// stores). Returns the number of links removed.
    fn disconnect(&mut self, a: NodeRef, b: NodeRef) -> GraphResult<usize>;

    /// Remove a node and all its links, shifting higher indices down by one.
    /// Every outstanding handle becomes stale.
    fn remove_node(&mut self, node: NodeRef) -> GraphResult<()>;

    /// Remove a single occurrence of a link
    fn remove_link(&mut self, link: LinkRef) -> GraphResult<()>;

    /// Check a node handle against this store, returning its index.
    fn validate(&self, node: NodeRef) -> GraphResult<usize> {
        self.validate_parts(node.graph(), node.epoch(), node.index())
    }

    /// Check a link handle against this store, returning its endpoint indices.
    fn validate_link(&self, link: LinkRef) -> GraphResult<(usize, usize)> {
        if link.is_directed() != self.is_directed() {
            return Err(GraphError::IllegalCrossGraphOperation {
                expected: self.id(),
                found: link.graph(),
            });
        }
        let from = self.validate_parts(link.graph(), link.epoch(), link.from().index())?;
        let to = self.validate_parts(link.graph(), link.epoch(), link.to().index())?;
        Ok((from, to))
    }

    #[doc(hidden)]
    fn validate_parts(&self, graph: GraphId, epoch: u64, index: usize) -> GraphResult<usize> {
        if graph != self.id() {
            return Err(GraphError::IllegalCrossGraphOperation {
                expected: self.id(),
                found: graph,
            });
        }
        if epoch != self.index_epoch() {
            return Err(GraphError::StaleHandle {
                index,
                handle_epoch: epoch,
                current_epoch: self.index_epoch(),
            });
        }
        if index >= self.size() {
            return Err(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            });
        }
        Ok(index)
    }

    /// Handle for the node at `index`
    fn get(&self, index: usize) -> GraphResult<NodeRef> {
        if index >= self.size() {
            return Err(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            });
        }
        Ok(node_ref(self, index as u32))
    }

    /// Distinct labels currently present
    fn labels(&self) -> GraphResult<FxHashSet<Self::Label>> {
        let mut labels = FxHashSet::default();
        for index in 0..self.size() {
            if let Some(label) = self.label_at(index)? {
                labels.insert(label);
            }
        }
        Ok(labels)
    }

    /// First node (lowest index) carrying `label`
    fn node(&self, label: &Self::Label) -> GraphResult<Option<NodeRef>> {
        for index in 0..self.size() {
            if self.label_at(index)?.as_ref() == Some(label) {
                return Ok(Some(node_ref(self, index as u32)));
            }
        }
        Ok(None)
    }

    /// All nodes in index order
    fn nodes(&self) -> Nodes<'_, Self> {
        Nodes::new(self)
    }

    /// All nodes carrying `label`, in index order
    fn nodes_labeled(&self, label: &Self::Label) -> GraphResult<Vec<NodeRef>> {
        let mut found = Vec::new();
        for index in 0..self.size() {
            if self.label_at(index)?.as_ref() == Some(label) {
                found.push(node_ref(self, index as u32));
            }
        }
        Ok(found)
    }

    fn label(&self, node: NodeRef) -> GraphResult<Option<Self::Label>> {
        let index = self.validate(node)?;
        self.label_at(index)
    }

    /// Current index of a (valid) handle
    fn index(&self, node: NodeRef) -> GraphResult<usize> {
        self.validate(node)
    }

    /// Number of link endpoints at this node. Directed stores count a
    /// self-link twice (once in, once out); undirected stores once.
    fn degree(&self, node: NodeRef) -> GraphResult<usize> {
        let index = self.validate(node)?;
        let forward = self.forward(index)?.len();
        if self.is_directed() {
            Ok(forward + self.backward(index)?.len())
        } else {
            Ok(forward)
        }
    }

    /// Distinct neighbours in either direction, ascending by index
    fn neighbors(&self, node: NodeRef) -> GraphResult<Vec<NodeRef>> {
        let index = self.validate(node)?;
        let merged = if self.is_directed() {
            adjacency::union_dedup(&self.forward(index)?, &self.backward(index)?)
        } else {
            adjacency::union_dedup(&self.forward(index)?, &[])
        };
        Ok(merged.into_iter().map(|n| node_ref(self, n)).collect())
    }

    /// Distinct neighbours carrying `label`
    fn neighbors_labeled(&self, node: NodeRef, label: &Self::Label) -> GraphResult<Vec<NodeRef>> {
        let mut found = Vec::new();
        for neighbor in self.neighbors(node)? {
            if self.label_at(neighbor.index())?.as_ref() == Some(label) {
                found.push(neighbor);
            }
        }
        Ok(found)
    }

    /// True if at least one link joins `a` and `b`, in either direction
    fn connected(&self, a: NodeRef, b: NodeRef) -> GraphResult<bool> {
        let a = self.validate(a)?;
        let b = self.validate(b)? as u32;
        if self.forward(a)?.contains(&b) {
            return Ok(true);
        }
        Ok(self.is_directed() && self.backward(a)?.contains(&b))
    }

    /// Every link between `a` and `b`, one handle per parallel link
    fn links_between(&self, a: NodeRef, b: NodeRef) -> GraphResult<Vec<LinkRef>> {
        let ai = self.validate(a)? as u32;
        let bi = self.validate(b)? as u32;
        let mut links = Vec::new();
        let times = adjacency::count(&self.forward(ai as usize)?, bi);
        links.extend((0..times).map(|_| link_ref(self, ai, bi)));
        if self.is_directed() && ai != bi {
            let times = adjacency::count(&self.forward(bi as usize)?, ai);
            links.extend((0..times).map(|_| link_ref(self, bi, ai)));
        }
        Ok(links)
    }

    /// Every link incident to `node`; a self-link is reported once
    fn node_links(&self, node: NodeRef) -> GraphResult<Vec<LinkRef>> {
        let index = self.validate(node)? as u32;
        let mut links: Vec<LinkRef> = self
            .forward(index as usize)?
            .iter()
            .map(|&n| link_ref(self, index, n))
            .collect();
        if self.is_directed() {
            links.extend(
                self.backward(index as usize)?
                    .iter()
                    .filter(|&&n| n != index)
                    .map(|&n| link_ref(self, n, index)),
            );
        }
        Ok(links)
    }

    /// Lazily enumerate every link in the store
    fn links(&self) -> Links<'_, Self> {
        Links::new(self)
    }

    /// Detached link cursor; survives (and detects) mutation of the store
    fn link_cursor(&self) -> LinkCursor {
        LinkCursor::new(self)
    }
}

/// Directed-only operations
pub trait DirectedGraph: Graph {
    fn out_degree(&self, node: NodeRef) -> GraphResult<usize> {
        let index = self.validate(node)?;
        Ok(self.forward(index)?.len())
    }

    fn in_degree(&self, node: NodeRef) -> GraphResult<usize> {
        let index = self.validate(node)?;
        Ok(self.backward(index)?.len())
    }

    /// Distinct successors, ascending by index
    fn out_neighbors(&self, node: NodeRef) -> GraphResult<Vec<NodeRef>> {
        let index = self.validate(node)?;
        let distinct = adjacency::union_dedup(&self.forward(index)?, &[]);
        Ok(distinct.into_iter().map(|n| node_ref(self, n)).collect())
    }

    /// Distinct predecessors, ascending by index
    fn in_neighbors(&self, node: NodeRef) -> GraphResult<Vec<NodeRef>> {
        let index = self.validate(node)?;
        let distinct = adjacency::union_dedup(&self.backward(index)?, &[]);
        Ok(distinct.into_iter().map(|n| node_ref(self, n)).collect())
    }

    /// True if a link `from -> to` exists
    fn connected_to(&self, from: NodeRef, to: NodeRef) -> GraphResult<bool> {
        let from = self.validate(from)?;
        let to = self.validate(to)? as u32;
        Ok(self.forward(from)?.contains(&to))
    }

    fn links_out(&self, node: NodeRef) -> GraphResult<Vec<LinkRef>> {
        let index = self.validate(node)? as u32;
        let targets = self.forward(index as usize)?;
        Ok(targets.iter().map(|&n| link_ref(self, index, n)).collect())
    }

    fn links_in(&self, node: NodeRef) -> GraphResult<Vec<LinkRef>> {
        let index = self.validate(node)? as u32;
        let sources = self.backward(index as usize)?;
        Ok(sources.iter().map(|&n| link_ref(self, n, index)).collect())
    }

    /// Links `from -> to` only
    fn links_from_to(&self, from: NodeRef, to: NodeRef) -> GraphResult<Vec<LinkRef>> {
        let fi = self.validate(from)? as u32;
        let ti = self.validate(to)? as u32;
        let times = adjacency::count(&self.forward(fi as usize)?, ti);
        Ok((0..times).map(|_| link_ref(self, fi, ti)).collect())
    }

    /// Raw successor indices with duplicates
    fn out_fast(&self, node: NodeRef) -> GraphResult<Cow<'_, [u32]>> {
        let index = self.validate(node)?;
        self.forward(index)
    }

    /// Raw predecessor indices with duplicates
    fn in_fast(&self, node: NodeRef) -> GraphResult<Cow<'_, [u32]>> {
        let index = self.validate(node)?;
        self.backward(index)
    }
}

/// Random-access neighbour lists for traversal-heavy consumers
///
/// The list may contain duplicates (one entry per link endpoint) and is
/// indexable in O(1), so a uniformly random entry is a neighbour drawn
/// proportionally to link multiplicity.
pub trait FastWalk {
    fn neighbors_fast(&self, node: NodeRef) -> GraphResult<Cow<'_, [u32]>>;
}

impl<G: Graph + ?Sized> FastWalk for G {
    fn neighbors_fast(&self, node: NodeRef) -> GraphResult<Cow<'_, [u32]>> {
        let index = self.validate(node)?;
        if !self.is_directed() {
            return self.forward(index);
        }
        let backward = self.backward(index)?;
        if backward.is_empty() {
            return self.forward(index);
        }
        let mut all = self.forward(index)?.into_owned();
        all.extend_from_slice(&backward);
        Ok(Cow::Owned(all))
    }
}

/// Issue a handle for `index` at the store's current epoch.
pub(crate) fn node_ref<G: Graph + ?Sized>(graph: &G, index: u32) -> NodeRef {
    NodeRef::new(graph.id(), index, graph.index_epoch())
}

/// Issue a link handle shaped by the store's directedness.
pub(crate) fn link_ref<G: Graph + ?Sized>(graph: &G, from: u32, to: u32) -> LinkRef {
    if graph.is_directed() {
        LinkRef::directed(graph.id(), from, to, graph.index_epoch())
    } else {
        LinkRef::undirected(graph.id(), from, to, graph.index_epoch())
    }
}
