//! Disk-backed graph stores
//!
//! Graphs too large for memory live in a RocksDB instance, one adjacency
//! list per node and column family. The stores implement the same
//! [`Graph`](crate::graph::Graph) contract as the array-backed ones.

pub mod config;
pub mod disk_directed;
pub mod disk_list;
pub mod disk_undirected;
pub mod storage;

pub use config::DiskConfig;
pub use disk_directed::DiskDirectedGraph;
pub use disk_list::DiskList;
pub use disk_undirected::DiskUndirectedGraph;
pub use storage::{AdjacencyStorage, Layout};

use crate::graph::{GraphError, GraphResult};
use std::path::Path;

/// Open a store and reject one of the other directedness
pub(crate) fn open_storage(path: &Path, layout: Layout, config: &DiskConfig) -> GraphResult<AdjacencyStorage> {
    let (storage, kind) = AdjacencyStorage::open(path, layout, config)?;
    if kind != layout.name() {
        return Err(GraphError::KindMismatch {
            path: path.display().to_string(),
            expected: layout.name(),
            found: kind,
        });
    }
    Ok(storage)
}
