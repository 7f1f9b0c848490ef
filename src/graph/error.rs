//! Error types shared by every store

use super::types::GraphId;
use std::io;
use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// Persisted data does not match what the store expects
    #[error("Corrupt store: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// A handle was used after the node it names was removed, or after any
    /// removal rearranged the index space.
    #[error("Stale handle to node {index}: issued at index epoch {handle_epoch}, store is at {current_epoch}")]
    StaleHandle {
        index: usize,
        handle_epoch: u64,
        current_epoch: u64,
    },

    /// An iterator observed a mutation of its store.
    #[error("Graph modified during iteration (state {expected} -> {found})")]
    ConcurrentModification { expected: u64, found: u64 },

    /// Edge-list input could not be ingested.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A node count or per-node degree bound would be exceeded.
    #[error("Capacity exceeded: {what} would exceed {limit}")]
    CapacityExceeded { what: &'static str, limit: u64 },

    /// Handles from two different stores were mixed.
    #[error("Handle from {found} used with {expected}")]
    IllegalCrossGraphOperation { expected: GraphId, found: GraphId },

    #[error("Node index {index} out of bounds (size {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("No link {from} -> {to}")]
    LinkNotFound { from: usize, to: usize },

    /// A persisted store was opened with the wrong directedness.
    #[error("Store at {path} holds a {found} graph, expected {expected}")]
    KindMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rocksdb::Error> for GraphError {
    fn from(err: rocksdb::Error) -> Self {
        GraphError::Storage(StorageError::RocksDb(err))
    }
}

impl From<bincode::Error> for GraphError {
    fn from(err: bincode::Error) -> Self {
        GraphError::Storage(StorageError::Serialization(err))
    }
}

impl From<io::Error> for GraphError {
    fn from(err: io::Error) -> Self {
        GraphError::Storage(StorageError::Io(err))
    }
}

impl GraphError {
    pub(crate) fn malformed(line: u64, reason: impl std::fmt::Display) -> Self {
        GraphError::MalformedInput(format!("line {}: {}", line, reason))
    }

    /// True for the contract violations a caller can trigger with a bad handle.
    pub fn is_stale(&self) -> bool {
        matches!(self, GraphError::StaleHandle { .. })
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
