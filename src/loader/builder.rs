//! Streaming adjacency construction from sorted pairs
//!
//! A sorted `(key, value)` stream is cut into groups of equal key; each group
//! becomes the list at index `key`. Only the current group is held in memory.
//! Indices skipped by the stream get empty lists so the index space stays
//! dense.

use super::edge_list::EdgeListReader;
use super::external_sort::ExternalSorter;
use super::{LoadConfig, LoadSummary};
use crate::graph::{GraphError, GraphResult, Limits};
use crate::persistence::disk_list::DiskList;
use crate::persistence::storage::{
    AdjacencyStorage, Layout, CF_IN, CF_NEIGHBORS, CF_OUT, META_NUM_LINKS,
};
use crate::persistence::DiskConfig;
use rocksdb::WriteBatch;
use std::path::Path;
use tracing::{debug, info};

/// Lists staged per write batch
const BUILD_BATCH: usize = 4096;

/// Which column of each edge-list line is the group key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Forward,
    Backward,
}

/// Build a label-less directed store at `store_path`
pub(crate) fn build_directed(edge_file: &Path, store_path: &Path, config: &LoadConfig, work_dir: &Path) -> GraphResult<LoadSummary> {
    let storage = create_storage(store_path, Layout::Directed, config)?;
    let limits = config.disk.limits;

    let mut outgoing: DiskList<Vec<u32>> = DiskList::load(&storage, CF_OUT)?;
    let (links, sorted) = sort_pass(edge_file, Pass::Forward, config, work_dir, false)?;
    let mut writer = ListWriter::new(&storage, &mut outgoing, limits);
    for_each_group(sorted, |key, values| writer.append(key, values))?;
    writer.finish()?;
    info!("Forward pass done: {} links, {} source lists", links, outgoing.len());

    let mut incoming: DiskList<Vec<u32>> = DiskList::load(&storage, CF_IN)?;
    let (_, sorted) = sort_pass(edge_file, Pass::Backward, config, work_dir, false)?;
    let mut writer = ListWriter::new(&storage, &mut incoming, limits);
    for_each_group(sorted, |key, values| writer.append(key, values))?;
    writer.finish()?;
    info!("Backward pass done: {} target lists", incoming.len());

    // Nodes with only incoming (or only outgoing) links leave one list short.
    let nodes = outgoing.len().max(incoming.len());
    for list in [&mut outgoing, &mut incoming] {
        let mut writer = ListWriter::new(&storage, list, limits);
        writer.pad_to(nodes)?;
        writer.finish()?;
    }

    seal(&storage, nodes, links, limits)
}

/// Build a label-less undirected store at `store_path`
///
/// The forward pass appends each line's target to its source's list. The
/// backward pass then merges each line's source into its target's list,
/// skipping self-links, which the forward pass already recorded once.
pub(crate) fn build_undirected(edge_file: &Path, store_path: &Path, config: &LoadConfig, work_dir: &Path) -> GraphResult<LoadSummary> {
    let storage = create_storage(store_path, Layout::Undirected, config)?;
    let limits = config.disk.limits;
    let mut neighbors: DiskList<Vec<u32>> = DiskList::load(&storage, CF_NEIGHBORS)?;

    let (links, sorted) = sort_pass(edge_file, Pass::Forward, config, work_dir, false)?;
    let mut writer = ListWriter::new(&storage, &mut neighbors, limits);
    for_each_group(sorted, |key, values| writer.append(key, values))?;
    writer.finish()?;
    info!("Forward pass done: {} links", links);

    let (_, sorted) = sort_pass(edge_file, Pass::Backward, config, work_dir, true)?;
    let mut writer = ListWriter::new(&storage, &mut neighbors, limits);
    for_each_group(sorted, |key, values| writer.merge(key, values))?;
    writer.finish()?;
    info!("Backward pass done: {} lists", neighbors.len());

    let nodes = neighbors.len();
    seal(&storage, nodes, links, limits)
}

fn create_storage(store_path: &Path, layout: Layout, config: &LoadConfig) -> GraphResult<AdjacencyStorage> {
    let disk = DiskConfig {
        null_labels: true,
        ..config.disk.clone()
    };
    Ok(AdjacencyStorage::create(store_path, layout, &disk)?)
}

fn seal(storage: &AdjacencyStorage, nodes: u32, links: u64, limits: Limits) -> GraphResult<LoadSummary> {
    if nodes > limits.max_nodes {
        return Err(GraphError::CapacityExceeded {
            what: "node count",
            limit: limits.max_nodes as u64,
        });
    }
    storage.put_meta(META_NUM_LINKS, links)?;
    storage.flush()?;
    Ok(LoadSummary {
        nodes: nodes as usize,
        links,
    })
}

/// Read the edge list and sort it by one column. Returns the number of lines
/// read and the sorted `(key, value)` stream.
fn sort_pass(
    edge_file: &Path,
    pass: Pass,
    config: &LoadConfig,
    work_dir: &Path,
    skip_self_links: bool,
) -> GraphResult<(u64, impl Iterator<Item = GraphResult<(u32, u32)>>)> {
    let mut sorter = ExternalSorter::new(config.chunk_edges, config.merge_fan_in, work_dir);
    let mut lines = 0u64;
    for pair in EdgeListReader::open(edge_file)? {
        let (source, target) = pair?;
        lines += 1;
        if skip_self_links && source == target {
            continue;
        }
        match pass {
            Pass::Forward => sorter.push(source, target)?,
            Pass::Backward => sorter.push(target, source)?,
        }
    }
    debug!("{:?} pass: {} pairs in {} runs", pass, sorter.len(), sorter.runs());
    Ok((lines, sorter.finish()?))
}

/// Feed each maximal run of equal keys to `group`. Keys must strictly
/// increase from one group to the next.
pub(crate) fn for_each_group<I, F>(sorted: I, mut group: F) -> GraphResult<()>
where
    I: Iterator<Item = GraphResult<(u32, u32)>>,
    F: FnMut(u32, Vec<u32>) -> GraphResult<()>,
{
    let mut current: Option<(u32, Vec<u32>)> = None;
    for pair in sorted {
        let (key, value) = pair?;
        match current.as_mut() {
            Some((current_key, values)) if *current_key == key => values.push(value),
            Some((current_key, _)) if *current_key > key => {
                return Err(GraphError::MalformedInput(format!(
                    "sorted input out of order: key {} after {}",
                    key, current_key
                )));
            }
            _ => {
                if let Some((done_key, values)) = current.replace((key, vec![value])) {
                    group(done_key, values)?;
                }
            }
        }
    }
    if let Some((key, values)) = current {
        group(key, values)?;
    }
    Ok(())
}

/// Appends or merges lists into a [`DiskList`], committing in batches
struct ListWriter<'a> {
    storage: &'a AdjacencyStorage,
    list: &'a mut DiskList<Vec<u32>>,
    limits: Limits,
    batch: WriteBatch,
    staged: usize,
}

impl<'a> ListWriter<'a> {
    fn new(storage: &'a AdjacencyStorage, list: &'a mut DiskList<Vec<u32>>, limits: Limits) -> Self {
        Self {
            storage,
            list,
            limits,
            batch: WriteBatch::default(),
            staged: 0,
        }
    }

    /// Store `values` as the list at `key`, which must not exist yet
    fn append(&mut self, key: u32, values: Vec<u32>) -> GraphResult<()> {
        // Index `key` implies `key + 1` nodes; refuse before padding up to it.
        if key >= self.limits.max_nodes {
            return Err(GraphError::CapacityExceeded {
                what: "node count",
                limit: self.limits.max_nodes as u64,
            });
        }
        if key < self.list.len() {
            return Err(GraphError::MalformedInput(format!(
                "sort order violated in {}: index {} but {} lists already built",
                self.list.family(),
                key,
                self.list.len()
            )));
        }
        self.check_degree(values.len())?;
        self.pad_to(key)?;
        self.push(&values)
    }

    /// Extend the list at `key` with `values`, creating it if needed
    fn merge(&mut self, key: u32, values: Vec<u32>) -> GraphResult<()> {
        if key >= self.list.len() {
            return self.append(key, values);
        }
        // Lists below the current length were written by an earlier pass and
        // are already committed.
        let mut existing = self.list.get(self.storage, key)?;
        existing.extend_from_slice(&values);
        self.check_degree(existing.len())?;
        self.list.put(self.storage, &mut self.batch, key, &existing)?;
        self.staged += 1;
        self.maybe_commit()
    }

    fn pad_to(&mut self, len: u32) -> GraphResult<()> {
        while self.list.len() < len {
            self.push(&[])?;
        }
        Ok(())
    }

    fn push(&mut self, values: &[u32]) -> GraphResult<()> {
        self.list.push(self.storage, &mut self.batch, &values.to_vec())?;
        self.staged += 1;
        self.maybe_commit()
    }

    fn check_degree(&self, len: usize) -> GraphResult<()> {
        if len > self.limits.max_degree as usize {
            return Err(GraphError::CapacityExceeded {
                what: "per-node degree",
                limit: self.limits.max_degree as u64,
            });
        }
        Ok(())
    }

    fn maybe_commit(&mut self) -> GraphResult<()> {
        if self.staged >= BUILD_BATCH {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&mut self) -> GraphResult<()> {
        if self.staged > 0 {
            self.storage.write(std::mem::take(&mut self.batch))?;
            self.staged = 0;
        }
        Ok(())
    }

    fn finish(mut self) -> GraphResult<()> {
        self.commit()
    }
}
