//! Mutable graph storage
//!
//! This module holds the store contract and the in-memory stores:
//! - Copyable node and link handles validated against an index epoch
//! - A directed and an undirected array-of-adjacency-lists store
//! - Lazy, fail-fast link enumeration
//! - Structural equality and copying between any two stores

pub mod adjacency;
pub mod array_directed;
pub mod array_undirected;
pub mod config;
pub mod equality;
pub mod error;
pub mod iter;
pub mod traits;
pub mod types;
pub mod walk;

// Re-export main types
pub use array_directed::ArrayDirectedGraph;
pub use array_undirected::ArrayUndirectedGraph;
pub use config::Limits;
pub use equality::{copy_into, structural_hash, structurally_equal};
pub use error::{GraphError, GraphResult, StorageError, StorageResult};
pub use iter::{LinkCursor, Links, Nodes, LINK_BUFFER};
pub use traits::{DirectedGraph, FastWalk, Graph};
pub use types::{GraphId, LabelValue, LinkRef, NodeRef};
pub use walk::RandomWalk;
