//! Disk-resident directed graph store
//!
//! Three indexable lists sharing one RocksDB instance: labels (optional),
//! successors (`out`) and predecessors (`in`). Every read goes to the
//! database; nothing but the counters is cached in memory.
//!
//! The link count is kept in memory while the store is open. Opening consumes
//! the persisted count and closing writes it back, so a store that was never
//! closed has its count recomputed on the next open.

use super::config::DiskConfig;
use super::disk_list::DiskList;
use super::open_storage;
use super::storage::{AdjacencyStorage, Layout, CF_IN, CF_LABELS, CF_OUT, META_NUM_LINKS};
use crate::graph::adjacency;
use crate::graph::config::Limits;
use crate::graph::equality;
use crate::graph::traits::node_ref;
use crate::graph::{
    DirectedGraph, Graph, GraphError, GraphId, GraphResult, LabelValue, LinkRef, NodeRef,
    StorageError,
};
use crate::loader::{self, LoadConfig};
use rocksdb::WriteBatch;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// RocksDB-backed directed graph
pub struct DiskDirectedGraph<L: LabelValue> {
    id: GraphId,
    storage: AdjacencyStorage,
    labels: Option<DiskList<Option<L>>>,
    outgoing: DiskList<Vec<u32>>,
    incoming: DiskList<Vec<u32>>,
    num_links: u64,
    state: u64,
    index_epoch: u64,
    limits: Limits,
    closed: bool,
}

impl<L: LabelValue> DiskDirectedGraph<L> {
    /// Create an empty store at `path`
    pub fn create(path: impl AsRef<Path>, config: DiskConfig) -> GraphResult<Self> {
        let storage = AdjacencyStorage::create(path.as_ref(), Layout::Directed, &config)?;
        Self::attach(storage, config.limits, Some(0))
    }

    /// Open an existing directed store
    pub fn open(path: impl AsRef<Path>, config: DiskConfig) -> GraphResult<Self> {
        let storage = open_storage(path.as_ref(), Layout::Directed, &config)?;
        let num_links = storage.take_meta(META_NUM_LINKS)?;
        Self::attach(storage, config.limits, num_links)
    }

    /// Copy any graph into a new store at `path`
    pub fn copy_of<G>(source: &G, path: impl AsRef<Path>, config: DiskConfig) -> GraphResult<Self>
    where
        G: Graph<Label = L> + ?Sized,
    {
        let mut graph = Self::create(path, config)?;
        equality::copy_into(source, &mut graph)?;
        Ok(graph)
    }

    /// Bulk-load an edge-list file into a new label-less store at `path`
    pub fn from_file(edge_file: impl AsRef<Path>, path: impl AsRef<Path>, config: &LoadConfig) -> GraphResult<Self> {
        loader::load_directed(edge_file.as_ref(), path.as_ref(), config)?;
        Self::open(path, config.disk.clone())
    }

    fn attach(storage: AdjacencyStorage, limits: Limits, num_links: Option<u64>) -> GraphResult<Self> {
        let labels = if storage.is_null_labels() {
            None
        } else {
            Some(DiskList::load(&storage, CF_LABELS)?)
        };
        let outgoing: DiskList<Vec<u32>> = DiskList::load(&storage, CF_OUT)?;
        let incoming: DiskList<Vec<u32>> = DiskList::load(&storage, CF_IN)?;
        if incoming.len() != outgoing.len() || labels.as_ref().map_or(false, |l| l.len() != outgoing.len()) {
            return Err(StorageError::Corrupt(format!(
                "list lengths disagree at {:?}",
                storage.path()
            ))
            .into());
        }

        let num_links = match num_links {
            Some(count) => count,
            None => {
                warn!("No link count persisted at {:?}, recomputing", storage.path());
                let mut count = 0u64;
                outgoing.scan(&storage, |_, list| {
                    count += list.len() as u64;
                    Ok(())
                })?;
                count
            }
        };

        info!(
            "Directed store at {:?}: {} nodes, {} links",
            storage.path(),
            outgoing.len(),
            num_links
        );
        Ok(Self {
            id: GraphId::next(),
            storage,
            labels,
            outgoing,
            incoming,
            num_links,
            state: 0,
            index_epoch: 0,
            limits,
            closed: false,
        })
    }

    /// Persist the link count, flush, and release the database
    pub fn close(mut self) -> GraphResult<()> {
        self.persist()?;
        self.closed = true;
        info!("Closed directed store at {:?}", self.storage.path());
        Ok(())
    }

    /// Flush pending writes without closing
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
        self.outgoing = DiskList::load(&self.storage, CF_OUT)?;
        self.incoming = DiskList::load(&self.storage, CF_IN)?;
        Ok(())
    }

    /// Drop entry `removed` from every list, in one batch when the lists are
    /// small enough.
    fn remove_entries(&mut self, removed: u32) -> GraphResult<()> {
        let shift = |list: &mut Vec<u32>| adjacency::strip_and_shift(list, removed);
        if self.outgoing.fits_one_batch() {
            let mut batch = WriteBatch::default();
            if let Some(labels) = &self.labels {
                labels.stage_remove(&self.storage, &mut batch, removed, |_| false)?;
            }
            self.outgoing.stage_remove(&self.storage, &mut batch, removed, shift)?;
            self.incoming.stage_remove(&self.storage, &mut batch, removed, shift)?;
            self.storage.write(batch)?;
            if let Some(labels) = self.labels.as_mut() {
                labels.removed();
            }
            self.outgoing.removed();
            self.incoming.removed();
        } else {
            if let Some(labels) = self.labels.as_mut() {
                labels.remove_with(&self.storage, removed, |_| false)?;
            }
            self.outgoing.remove_with(&self.storage, removed, shift)?;
            self.incoming.remove_with(&self.storage, removed, shift)?;
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.state += 1;
    }

    fn list(&self, list: &DiskList<Vec<u32>>, index: usize) -> GraphResult<Vec<u32>> {
        if index >= self.size() {
            return Err(GraphError::IndexOutOfBounds {
                index,
                size: self.size(),
            });
        }
        Ok(list.get(&self.storage, index as u32)?)
    }
}

impl<L: LabelValue> Graph for DiskDirectedGraph<L> {
    type Label = L;

    fn id(&self) -> GraphId {
        self.id
    }

    fn is_directed(&self) -> bool {
        true
    }

    fn size(&self) -> usize {
        self.outgoing.len() as usize
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
        Ok(Cow::Owned(self.list(&self.outgoing, index)?))
    }

    fn backward(&self, index: usize) -> GraphResult<Cow<'_, [u32]>> {
        Ok(Cow::Owned(self.list(&self.incoming, index)?))
    }

    fn add(&mut self, label: Option<L>) -> GraphResult<NodeRef> {
        self.limits.check_nodes(self.size())?;
        let mut batch = WriteBatch::default();
        if let Some(labels) = self.labels.as_mut() {
            labels.push(&self.storage, &mut batch, &label)?;
        }
        let index = self.outgoing.push(&self.storage, &mut batch, &Vec::new())?;
        self.incoming.push(&self.storage, &mut batch, &Vec::new())?;
        self.commit(batch)?;
        self.touch();
        Ok(node_ref(self, index))
    }

    fn connect(&mut self, from: NodeRef, to: NodeRef) -> GraphResult<LinkRef> {
        let fi = self.validate(from)?;
        let ti = self.validate(to)?;
        let mut out = self.list(&self.outgoing, fi)?;
        let mut inc = self.list(&self.incoming, ti)?;
        self.limits.check_degree(out.len())?;
        self.limits.check_degree(inc.len())?;

        out.push(ti as u32);
        inc.push(fi as u32);
        let mut batch = WriteBatch::default();
        self.outgoing.put(&self.storage, &mut batch, fi as u32, &out)?;
        self.incoming.put(&self.storage, &mut batch, ti as u32, &inc)?;
        self.commit(batch)?;

        self.num_links += 1;
        self.touch();
        Ok(LinkRef::directed(self.id, fi as u32, ti as u32, self.index_epoch))
    }

    fn disconnect(&mut self, a: NodeRef, b: NodeRef) -> GraphResult<usize> {
        let ai = self.validate(a)?;
        let bi = self.validate(b)?;
        let mut batch = WriteBatch::default();

        let mut out = self.list(&self.outgoing, ai)?;
        let mut inc = self.list(&self.incoming, bi)?;
        let mut removed = adjacency::remove_all(&mut out, bi as u32);
        adjacency::remove_all(&mut inc, ai as u32);
        self.outgoing.put(&self.storage, &mut batch, ai as u32, &out)?;
        self.incoming.put(&self.storage, &mut batch, bi as u32, &inc)?;

        if ai != bi {
            let mut out = self.list(&self.outgoing, bi)?;
            let mut inc = self.list(&self.incoming, ai)?;
            removed += adjacency::remove_all(&mut out, ai as u32);
            adjacency::remove_all(&mut inc, bi as u32);
            self.outgoing.put(&self.storage, &mut batch, bi as u32, &out)?;
            self.incoming.put(&self.storage, &mut batch, ai as u32, &inc)?;
        }

        if removed > 0 {
            self.commit(batch)?;
            self.num_links -= removed as u64;
            self.touch();
        }
        Ok(removed)
    }

    fn remove_node(&mut self, node: NodeRef) -> GraphResult<()> {
        let index = self.validate(node)?;
        let removed = index as u32;

        let out = self.list(&self.outgoing, index)?;
        let inc = self.list(&self.incoming, index)?;
        let links = out.len() + inc.len() - adjacency::count(&out, removed);

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
        let (fi, ti) = self.validate_link(link)?;
        let mut out = self.list(&self.outgoing, fi)?;
        if !adjacency::remove_one(&mut out, ti as u32) {
            return Err(GraphError::LinkNotFound { from: fi, to: ti });
        }
        let mut inc = self.list(&self.incoming, ti)?;
        adjacency::remove_one(&mut inc, fi as u32);

        let mut batch = WriteBatch::default();
        self.outgoing.put(&self.storage, &mut batch, fi as u32, &out)?;
        self.incoming.put(&self.storage, &mut batch, ti as u32, &inc)?;
        self.commit(batch)?;

        self.num_links -= 1;
        self.touch();
        Ok(())
    }
}

impl<L: LabelValue> DirectedGraph for DiskDirectedGraph<L> {}

impl<L: LabelValue> Drop for DiskDirectedGraph<L> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.persist() {
            warn!("Failed to persist store at {:?} on drop: {}", self.storage.path(), err);
        }
    }
}

impl<L: LabelValue> fmt::Debug for DiskDirectedGraph<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskDirectedGraph")
            .field("id", &self.id)
            .field("path", &self.storage.path())
            .field("size", &self.size())
            .field("num_links", &self.num_links)
            .field("null_labels", &self.is_null_labels())
            .finish()
    }
}

impl<L: LabelValue> fmt::Display for DiskDirectedGraph<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        equality::fmt_graph(self, f)
    }
}
