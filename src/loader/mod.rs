//! Bulk construction of disk-backed stores from edge-list files
//!
//! Loading runs two external sorts over the input, by source and by target,
//! and streams each sorted result into adjacency lists. Memory use is bounded
//! by [`LoadConfig::chunk_edges`] plus the largest single adjacency list.
//!
//! The store is built in a staging directory beside the target and renamed
//! into place only after both passes succeed. A failed load removes the
//! staging directory, so the target path either holds a complete store or
//! does not exist.

pub mod builder;
pub mod edge_list;
pub mod external_sort;

pub use edge_list::EdgeListReader;
pub use external_sort::{ExternalSorter, SortedPairs};

use crate::graph::{GraphResult, StorageError};
use crate::persistence::{DiskConfig, Layout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Bulk load configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Pairs held in memory before a sorted run is spilled
    pub chunk_edges: usize,

    /// Runs merged at once
    pub merge_fan_in: usize,

    /// Directory for sort runs; defaults to the staging directory
    pub temp_dir: Option<PathBuf>,

    /// Settings for the store being built. Loaded stores never carry labels.
    pub disk: DiskConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            chunk_edges: 1 << 22,
            merge_fan_in: 64,
            temp_dir: None,
            disk: DiskConfig::unlabeled(),
        }
    }
}

/// What a load produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub nodes: usize,
    pub links: u64,
}

/// Build a directed store at `target` from `edge_file`
pub fn load_directed(edge_file: &Path, target: &Path, config: &LoadConfig) -> GraphResult<LoadSummary> {
    load(edge_file, target, config, Layout::Directed)
}

/// Build an undirected store at `target` from `edge_file`
pub fn load_undirected(edge_file: &Path, target: &Path, config: &LoadConfig) -> GraphResult<LoadSummary> {
    load(edge_file, target, config, Layout::Undirected)
}

fn load(edge_file: &Path, target: &Path, config: &LoadConfig, layout: Layout) -> GraphResult<LoadSummary> {
    if target.exists() {
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ))
        .into());
    }
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let started = Instant::now();
    info!("Loading {} graph from {:?} into {:?}", layout.name(), edge_file, target);

    let staging = tempfile::Builder::new()
        .prefix(".adjacency-load-")
        .tempdir_in(&parent)?;
    let work_dir = config
        .temp_dir
        .clone()
        .unwrap_or_else(|| staging.path().to_path_buf());
    let store_path = staging.path().join("store");

    // The builder closes its database before returning.
    let summary = match layout {
        Layout::Directed => builder::build_directed(edge_file, &store_path, config, &work_dir)?,
        Layout::Undirected => builder::build_undirected(edge_file, &store_path, config, &work_dir)?,
    };
    fs::rename(&store_path, target)?;

    info!(
        "Loaded {} nodes and {} links into {:?} in {:?}",
        summary.nodes,
        summary.links,
        target,
        started.elapsed()
    );
    Ok(summary)
}
