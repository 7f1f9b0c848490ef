//! Disk-resident undirected graph store
//!
//! One neighbour list per node in the `neighbors` column family, plus the
//! optional labels list. A link `a -- b` is recorded in both lists and a
//! self-link once, as in the array-backed store.

use super::config::DiskConfig;
use super::disk_list::DiskList;
use super::open_storage;
use super::storage::{AdjacencyStorage, Layout, CF_LABELS, CF_NEIGHBORS, META_NUM_LINKS};
use crate::graph::adjacency;
use crate::graph::config::Limits;
use crate::graph::equality;
use crate::graph::traits::node_ref;
use crate::graph::{Graph, GraphError, GraphId, GraphResult, LabelValue, LinkRef, NodeRef, StorageError};
use crate::loader::{self, LoadConfig};
use rocksdb::WriteBatch;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// RocksDB-backed undirected graph
pub struct DiskUndirectedGraph<L: LabelValue> {
    id: GraphId,
    storage: AdjacencyStorage,
    labels: Option<DiskList<Option<L>>>,
    neighbors: DiskList<Vec<u32>>,
    num_links: u64,
    state: u64,
    index_epoch: u64,
    limits: Limits,
    closed: bool,
}

impl<L: LabelValue> DiskUndirectedGraph<L> {
    pub fn create(path: impl AsRef<Path>, config: DiskConfig) -> GraphResult<Self> {
        let storage = AdjacencyStorage::create(path.as_ref(), Layout::Undirected, &config)?;
        Self::attach(storage, config.limits, Some(0))
    }

    /// Open an existing undirected store
    pub fn open(path: impl AsRef<Path>, config: DiskConfig) -> GraphResult<Self> {
        let storage = open_storage(path.as_ref(), Layout::Undirected, &config)?;
        let num_links = storage.take_meta(META_NUM_LINKS)?;
        Self::attach(storage, config.limits, num_links)
    }

    pub fn copy_of<G>(source: &G, path: impl AsRef<Path>, config: DiskConfig) -> GraphResult<Self>
    where
        G: Graph<Label = L> + ?Sized,
    {
        let mut graph = Self::create(path, config)?;
        equality::copy_into(source, &mut graph)?;
        Ok(graph)
    }

    /// Bulk-load an edge-list file, each line one undirected link
    pub fn from_file(edge_file: impl AsRef<Path>, path: impl AsRef<Path>, config: &LoadConfig) -> GraphResult<Self> {
        loader::load_undirected(edge_file.as_ref(), path.as_ref(), config)?;
        Self::open(path, config.disk.clone())
    }

    fn attach(storage: AdjacencyStorage, limits: Limits, num_links: Option<u64>) -> GraphResult<Self> {
        let labels = if storage.is_null_labels() {
            None
        } else {
            Some(DiskList::load(&storage, CF_LABELS)?)
        };
        let neighbors: DiskList<Vec<u32>> = DiskList::load(&storage, CF_NEIGHBORS)?;
        if labels.as_ref().map_or(false, |l| l.len() != neighbors.len()) {
            return Err(StorageError::Corrupt(format!(
                "label and neighbour counts disagree at {:?}",
                storage.path()
            ))
            .into());
        }

        let num_links = match num_links {
            Some(count) => count,
            None => {
                warn!("No link count persisted at {:?}, recomputing", storage.path());
                // Each link is counted from its lower endpoint.
                let mut count = 0u64;
                neighbors.scan(&storage, |index, list| {
                    count += list.iter().filter(|&&n| n >= index).count() as u64;
                    Ok(())
                })?;
                count
            }
        };

        info!(
            "Undirected store at {:?}: {} nodes, {} links",
            storage.path(),
            neighbors.len(),
            num_links
        );
        Ok(Self {
            id: GraphId::next(),
            storage,
            labels,
            neighbors,
            num_links,
            state: 0,
            index_epoch: 0,
            limits,
            closed: false,
        })
    }

    pub fn close(mut self) -> GraphResult<()> {
        self.persist()?;
        self.closed = true;
        info!("Closed undirected store at {:?}", self.storage.path());
        Ok(())
    }

    pub fn flush(&self) -> GraphResult<()> {
        self.storage.flush()?;
        Ok(())
    }

    pub fn is_null_labels(&self) -> bool {
        self.labels.is_none()
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn persist(&self) -> GraphResult<()> {
        self.storage.put_meta(META_NUM_LINKS, self.num_links)?;
        self.storage.flush()?;
        Ok(())
    }

    /// Apply a batch; on failure re-read list lengths so memory matches disk.
    fn commit(&mut self, batch: WriteBatch) -> GraphResult<()> {
        if let Err(err) = self.storage.write(batch) {
            self.reload_lengths()?;
            return Err(err.into());
        }
        Ok(())
    }

    fn reload_lengths(&mut self) -> GraphResult<()> {
        if self.labels.is_some() {
            self.labels = Some(DiskList::load(&self.storage, CF_LABELS)?);
        }
        self.neighbors = DiskList::load(&self.storage, CF_NEIGHBORS)?;
        Ok(())
    }

    fn remove_entries(&mut self, removed: u32) -> GraphResult<()> {
        let shift = |list: &mut Vec<u32>| adjacency::strip_and_shift(list, removed);
        if self.neighbors.fits_one_batch() {
            let mut batch = WriteBatch::default();
            if let Some(labels) = &self.labels {
                labels.stage_remove(&self.storage, &mut batch, removed, |_| false)?;
            }
            self.neighbors.stage_remove(&self.storage, &mut batch, removed, shift)?;
            self.storage.write(batch)?;
            if let Some(labels) = self.labels.as_mut() {
                labels.removed();
            }
            self.neighbors.removed();
        } else {
            if let Some(labels) = self.labels.as_mut() {
                labels.remove_with(&self.storage, removed, |_| false)?;
            }
            self.neighbors.remove_with(&self.storage, removed, shift)?;
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.state += 1;
    }

    fn list(&self, index: usize) -> GraphResult<Vec<u32>> {
        if index >= self.size() {
            return Err(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            });
        }
        Ok(self.neighbors.get(&self.storage, index as u32)?)
    }
}

impl<L: LabelValue> Graph for DiskUndirectedGraph<L> {
    type Label = L;

    fn id(&self) -> GraphId {
        self.id
    }

    fn is_directed(&self) -> bool {
        false
    }

    fn size(&self) -> usize {
        self.neighbors.len() as usize
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
        if index >= self.size() {
            return Err(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            });
        }
        match &self.labels {
            Some(labels) => Ok(labels.get(&self.storage, index as u32)?),
            None => Ok(None),
        }
    }

    fn forward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>> {
        Ok(Cow::Owned(self.list(index)?))
    }

    fn backward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>> {
        self.forward(index)
    }

    fn add(&mut self, label: Option<L>) -> GraphResult<NodeRef> {
        self.limits.check_nodes(self.size())?;
        let mut batch = WriteBatch::default();
        if let Some(labels) = self.labels.as_mut() {
            labels.push(&self.storage, &mut batch, &label)?;
        }
        let index = self.neighbors.push(&self.storage, &mut batch, &Vec::new())?;
        self.commit(batch)?;
        self.touch();
        Ok(node_ref(self, index))
    }

    fn connect(&mut self, from: NodeRef, to: NodeRef) -> GraphResult<LinkRef> {
        let ai = self.validate(from)?;
        let bi = self.validate(to)?;
        let mut batch = WriteBatch::default();

        let mut first = self.list(ai)?;
        self.limits.check_degree(first.len())?;
        first.push(bi as u32);
        if ai == bi {
            self.neighbors.put(&self.storage, &mut batch, ai as u32, &first)?;
        } else {
            let mut second = self.list(bi)?;
            self.limits.check_degree(second.len())?;
            second.push(ai as u32);
            self.neighbors.put(&self.storage, &mut batch, ai as u32, &first)?;
            self.neighbors.put(&self.storage, &mut batch, bi as u32, &second)?;
        }
        self.commit(batch)?;

        self.num_links += 1;
        self.touch();
        Ok(LinkRef::undirected(self.id, ai as u32, bi as u32, self.index_epoch))
    }

    fn disconnect(&mut self, a: NodeRef, b: NodeRef) -> GraphResult<usize> {
        let ai = self.validate(a)?;
        let bi = self.validate(b)?;

        let mut first = self.list(ai)?;
        let removed = adjacency::remove_all(&mut first, bi as u32);
        if removed == 0 {
            return Ok(0);
        }
        let mut batch = WriteBatch::default();
        self.neighbors.put(&self.storage, &mut batch, ai as u32, &first)?;
        if ai != bi {
            let mut second = self.list(bi)?;
            adjacency::remove_all(&mut second, ai as u32);
            self.neighbors.put(&self.storage, &mut batch, bi as u32, &second)?;
        }
        self.commit(batch)?;

        self.num_links -= removed as u64;
        self.touch();
        Ok(removed)
    }

    fn remove_node(&mut self, node: NodeRef) -> GraphResult<()> {
        let index = self.validate(node)?;
        let removed = index as u32;
        let links = self.list(index)?.len();

        if let Err(err) = self.remove_entries(removed) {
            self.reload_lengths()?;
            return Err(err);
        }

        self.num_links -= links as u64;
        self.touch();
        self.index_epoch += 1;
        Ok(())
    }

    fn remove_link(&mut self, link: LinkRef) -> GraphResult<()> {
        let (ai, bi) = self.validate_link(link)?;
        let mut first = self.list(ai)?;
        if !adjacency::remove_one(&mut first, bi as u32) {
            return Err(GraphError::LinkNotFound { from: ai, to: bi });
        }
        let mut batch = WriteBatch::default();
        self.neighbors.put(&self.storage, &mut batch, ai as u32, &first)?;
        if ai != bi {
            let mut second = self.list(bi)?;
            adjacency::remove_one(&mut second, ai as u32);
            self.neighbors.put(&self.storage, &mut batch, bi as u32, &second)?;
        }
        self.commit(batch)?;

        self.num_links -= 1;
        self.touch();
        Ok(())
    }
}

impl<L: LabelValue> Drop for DiskUndirectedGraph<L> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.persist() {
            warn!("Failed to persist store at {:?} on drop: {}", self.storage.path(), err);
        }
    }
}

impl<L: LabelValue> fmt::Debug for DiskUndirectedGraph<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskUndirectedGraph")
            .field("id", &self.id)
            .field("path", &self.storage.path())
            .field("size", &self.size())
            .field("num_links", &self.num_links)
            .field("null_labels", &self.is_null_labels())
            .finish()
    }
}

impl<L: LabelValue> fmt::Display for DiskUndirectedGraph<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        equality::fmt_graph(self, f)
    }
}
