//! Samyama Adjacency
//!
//! Mutable graph storage with dense integer node indices, behind one store
//! contract and two backings:
//!
//! - Array-backed stores: one growable neighbour list per node, in memory
//! - Disk-backed stores: the same lists in RocksDB, for graphs larger than memory
//! - A bulk loader that builds a disk-backed store from an edge-list file with
//!   two external sorts, never holding the edge list in memory
//!
//! # Handles
//!
//! Nodes and links are addressed by copyable handles ([`NodeRef`], [`LinkRef`])
//! that remember the store that issued them and the store's index epoch.
//! Removing a node shifts every higher index down by one and bumps the
//! epoch, so every handle issued before the removal fails with
//! [`GraphError::StaleHandle`] instead of silently naming a different node.
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_adjacency::graph::{ArrayDirectedGraph, DirectedGraph, Graph, GraphError};
//!
//! let mut graph = ArrayDirectedGraph::new();
//! let a = graph.add(Some('a')).unwrap();
//! let b = graph.add(Some('b')).unwrap();
//! let c = graph.add(Some('c')).unwrap();
//! graph.connect(a, b).unwrap();
//! graph.connect(b, c).unwrap();
//! assert_eq!(graph.num_links(), 2);
//! assert_eq!(graph.out_degree(a).unwrap(), 1);
//!
//! graph.remove_node(b).unwrap();
//! assert_eq!(graph.num_links(), 0);
//! assert!(matches!(graph.label(a), Err(GraphError::StaleHandle { .. })));
//!
//! let c = graph.get(1).unwrap();
//! assert_eq!(graph.label(c).unwrap(), Some('c'));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod loader;
pub mod persistence;

// Re-export main types for convenience
pub use graph::{
    ArrayDirectedGraph, ArrayUndirectedGraph, DirectedGraph, FastWalk, Graph, GraphError,
    GraphId, GraphResult, LabelValue, Limits, LinkCursor, LinkRef, NodeRef, StorageError,
    StorageResult,
};

pub use loader::{load_directed, load_undirected, LoadConfig, LoadSummary};

pub use persistence::{DiskConfig, DiskDirectedGraph, DiskUndirectedGraph};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
