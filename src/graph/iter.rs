//! Node and link iteration
//!
//! Link enumeration never materialises the full link set. A [`LinkCursor`]
//! keeps a small look-ahead buffer and expands one node's forward list at a
//! time, so a full scan costs O(buffer + max degree) memory. The cursor
//! captures the store's `state()` when created and refuses to continue once
//! the store has been mutated.

use super::error::{GraphError, GraphResult};
use super::traits::{link_ref, node_ref, Graph};
use super::types::{GraphId, LinkRef, NodeRef};
use std::collections::VecDeque;

/// Refill threshold for the look-ahead buffer
pub const LINK_BUFFER: usize = 5;

/// Iterator over all nodes in index order
pub struct Nodes<'a, G: Graph + ?Sized> {
    graph: &'a G,
    next: usize,
    end: usize,
}

impl<'a, G: Graph + ?Sized> Nodes<'a, G> {
    pub(crate) fn new(graph: &'a G) -> Self {
        Nodes {
            graph,
            next: 0,
            end: graph.size(),
        }
    }
}

impl<'a, G: Graph + ?Sized> Iterator for Nodes<'a, G> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        if self.next >= self.end {
            return None;
        }
        let node = node_ref(self.graph, self.next as u32);
        self.next += 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<'a, G: Graph + ?Sized> ExactSizeIterator for Nodes<'a, G> {}

/// Detached, fail-fast link cursor
///
/// Holds no borrow of the store, so it can outlive a mutation; the next call
/// after one returns [`GraphError::ConcurrentModification`].
#[derive(Debug, Clone)]
pub struct LinkCursor {
    graph: GraphId,
    state: u64,
    next_node: usize,
    buffer: VecDeque<(u32, u32)>,
}

impl LinkCursor {
    pub fn new<G: Graph + ?Sized>(graph: &G) -> Self {
        LinkCursor {
            graph: graph.id(),
            state: graph.state(),
            next_node: 0,
            buffer: VecDeque::with_capacity(LINK_BUFFER),
        }
    }

    /// True if another link is available
    pub fn has_next<G: Graph + ?Sized>(&mut self, graph: &G) -> GraphResult<bool> {
        self.check(graph)?;
        self.fill(graph)?;
        Ok(!self.buffer.is_empty())
    }

    /// Next link, or `None` once every node has been expanded
    pub fn next_link<G: Graph + ?Sized>(&mut self, graph: &G) -> GraphResult<Option<LinkRef>> {
        self.check(graph)?;
        self.fill(graph)?;
        Ok(self
            .buffer
            .pop_front()
            .map(|(from, to)| link_ref(graph, from, to)))
    }

    fn check<G: Graph + ?Sized>(&self, graph: &G) -> GraphResult<()> {
        if graph.id() != self.graph {
            return Err(GraphError::IllegalCrossGraphOperation {
                expected: graph.id(),
                found: self.graph,
            });
        }
        if graph.state() != self.state {
            return Err(GraphError::ConcurrentModification {
                expected: self.state,
                found: graph.state(),
            });
        }
        Ok(())
    }

    fn fill<G: Graph + ?Sized>(&mut self, graph: &G) -> GraphResult<()> {
        let directed = graph.is_directed();
        while self.buffer.len() < LINK_BUFFER && self.next_node < graph.size() {
            let from = self.next_node as u32;
            let targets = graph.forward(self.next_node)?;
            // Undirected links are stored at both ends; emit them from the lower one.
            self.buffer.extend(
                targets
                    .iter()
                    .filter(|&&to| directed || to >= from)
                    .map(|&to| (from, to)),
            );
            self.next_node += 1;
        }
        Ok(())
    }
}

/// Borrowing link iterator returned by [`Graph::links`]
///
/// Yields at most one error, then stops.
pub struct Links<'a, G: Graph + ?Sized> {
    graph: &'a G,
    cursor: LinkCursor,
    done: bool,
}

impl<'a, G: Graph + ?Sized> Links<'a, G> {
    pub(crate) fn new(graph: &'a G) -> Self {
        Links {
            graph,
            cursor: LinkCursor::new(graph),
            done: false,
        }
    }
}

impl<'a, G: Graph + ?Sized> Iterator for Links<'a, G> {
    type Item = GraphResult<LinkRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next_link(self.graph) {
            Ok(Some(link)) => Some(Ok(link)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
