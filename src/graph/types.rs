//! Core type definitions for the graph stores
//!
//! Node and link handles are plain `Copy` values. They never borrow the store
//! that issued them; instead they carry the issuing store's [`GraphId`] and the
//! index epoch observed when they were created, and every store operation
//! validates both before touching adjacency data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Bound for node label types.
///
/// Labels are compared, hashed, cloned out of the store and (for disk-backed
/// stores) serialized with bincode.
pub trait LabelValue: Clone + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned {}

impl<T> LabelValue for T where T: Clone + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned {}

/// Identity of a store instance
///
/// Used to reject operations that mix handles from different stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GraphId(pub u64);

impl GraphId {
    /// Draw a fresh identity. Every store calls this exactly once.
    pub fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({})", self.0)
    }
}

/// Handle to a node
///
/// Valid while the owning store's index epoch equals `epoch`. Removing any
/// node bumps that epoch, which also makes handles to the removed node stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    graph: GraphId,
    index: u32,
    epoch: u64,
}

impl NodeRef {
    pub(crate) fn new(graph: GraphId, index: u32, epoch: u64) -> Self {
        NodeRef { graph, index, epoch }
    }

    /// Dense index captured when the handle was issued
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn raw_index(&self) -> u32 {
        self.index
    }

    /// Store that issued this handle
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Index epoch captured when the handle was issued
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.index)
    }
}

/// Handle to a single link
///
/// For undirected stores the endpoints are normalised so that
/// `from() <= to()`; parallel links between the same pair produce equal
/// handles, and removing through any of them removes one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkRef {
    graph: GraphId,
    from: u32,
    to: u32,
    epoch: u64,
    directed: bool,
}

impl LinkRef {
    pub(crate) fn directed(graph: GraphId, from: u32, to: u32, epoch: u64) -> Self {
        LinkRef {
            graph,
            from,
            to,
            epoch,
            directed: true,
        }
    }

    pub(crate) fn undirected(graph: GraphId, a: u32, b: u32, epoch: u64) -> Self {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        LinkRef {
            graph,
            from,
            to,
            epoch,
            directed: false,
        }
    }

    /// Source node (the lower index for undirected links)
    pub fn from(&self) -> NodeRef {
        NodeRef::new(self.graph, self.from, self.epoch)
    }

    /// Target node (the higher index for undirected links)
    pub fn to(&self) -> NodeRef {
        NodeRef::new(self.graph, self.to, self.epoch)
    }

    /// Alias of [`LinkRef::from`] for undirected use
    pub fn first(&self) -> NodeRef {
        self.from()
    }

    /// Alias of [`LinkRef::to`] for undirected use
    pub fn second(&self) -> NodeRef {
        self.to()
    }

    /// Given one endpoint, return the other one
    pub fn other(&self, node: NodeRef) -> Option<NodeRef> {
        if node.raw_index() == self.from {
            Some(self.to())
        } else if node.raw_index() == self.to {
            Some(self.from())
        } else {
            None
        }
    }

    pub fn is_self_link(&self) -> bool {
        self.from == self.to
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn graph(&self) -> GraphId {
        self.graph
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Display for LinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.directed { "->" } else { "--" };
        write!(f, "{} {} {}", self.from, arrow, self.to)
    }
}
