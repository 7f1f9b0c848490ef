//! Disk-resident indexable list
//!
//! A `DiskList<T>` maps indices `0..len` to bincode-encoded values in one
//! column family, keyed by big-endian index. The length lives in `meta` under
//! `len:<family>` and is written in the same batch as every push, so the
//! entries and the length never disagree after a successful write.
//!
//! The list holds no reference to the database; every operation takes the
//! [`AdjacencyStorage`] it lives in.

use super::storage::{decode_index_key, index_key, AdjacencyStorage};
use crate::graph::{StorageError, StorageResult};
use rocksdb::{IteratorMode, WriteBatch};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::debug;

/// Writes per batch when rewriting a whole list
const REWRITE_BATCH: usize = 8192;

/// Indexable list stored in a column family
#[derive(Debug)]
pub struct DiskList<T> {
    family: &'static str,
    len_key: String,
    len: u32,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> DiskList<T> {
    /// Attach to the list in `family`, reading its persisted length
    pub fn load(storage: &AdjacencyStorage, family: &'static str) -> StorageResult<Self> {
        storage.cf(family)?;
        let len_key = format!("len:{}", family);
        let len = storage.get_meta(&len_key)?.unwrap_or(0);
        let len = u32::try_from(len)
            .map_err(|_| StorageError::Corrupt(format!("{} length {} exceeds u32", family, len)))?;
        Ok(Self {
            family,
            len_key,
            len,
            _marker: PhantomData,
        })
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, storage: &AdjacencyStorage, index: u32) -> StorageResult<T> {
        self.check(index)?;
        match storage.db().get_cf(storage.cf(self.family)?, index_key(index))? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(StorageError::Corrupt(format!(
                "missing entry {} in {}",
                index, self.family
            ))),
        }
    }

    /// Stage an overwrite of an existing entry
    pub fn put(&self, storage: &AdjacencyStorage, batch: &mut WriteBatch, index: u32, value: &T) -> StorageResult<()> {
        self.check(index)?;
        batch.put_cf(storage.cf(self.family)?, index_key(index), bincode::serialize(value)?);
        Ok(())
    }

    /// Stage an append; the new length is staged with it
    pub fn push(&mut self, storage: &AdjacencyStorage, batch: &mut WriteBatch, value: &T) -> StorageResult<u32> {
        let index = self.len;
        let next = index
            .checked_add(1)
            .ok_or_else(|| StorageError::Corrupt(format!("{} is full", self.family)))?;
        batch.put_cf(storage.cf(self.family)?, index_key(index), bincode::serialize(value)?);
        storage.batch_put_meta(batch, &self.len_key, next as u64)?;
        self.len = next;
        Ok(index)
    }

    /// Visit every entry in index order
    pub fn scan<F>(&self, storage: &AdjacencyStorage, mut visit: F) -> StorageResult<()>
    where
        F: FnMut(u32, T) -> StorageResult<()>,
    {
        let iter = storage
            .db()
            .iterator_cf(storage.cf(self.family)?, IteratorMode::Start);
        for item in iter {
            let (key, value) = item?;
            let index = decode_index_key(&key)?;
            if index >= self.len {
                break;
            }
            visit(index, bincode::deserialize(&value)?)?;
        }
        Ok(())
    }

    /// True if removing one entry can be staged in a single batch
    pub fn fits_one_batch(&self) -> bool {
        (self.len as usize) <= REWRITE_BATCH
    }

    /// Remove entry `index`, shifting later entries down by one, and pass
    /// every surviving entry through `update`. An entry below `index` is only
    /// rewritten when `update` reports a change.
    ///
    /// Large lists are rewritten in several batches; the length is written
    /// with the last one.
    pub fn remove_with<F>(&mut self, storage: &AdjacencyStorage, index: u32, update: F) -> StorageResult<()>
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut batch = WriteBatch::default();
        let written = self.rewrite(storage, &mut batch, index, update, true)?;
        storage.write(batch)?;
        self.len -= 1;
        debug!("Removed entry {} from {} ({} rewritten)", index, self.family, written);
        Ok(())
    }

    /// Stage the whole removal of entry `index` into `batch`. The in-memory
    /// length is untouched until [`DiskList::removed`] is called after the
    /// batch is written.
    pub fn stage_remove<F>(&self, storage: &AdjacencyStorage, batch: &mut WriteBatch, index: u32, update: F) -> StorageResult<()>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.rewrite(storage, batch, index, update, false)?;
        Ok(())
    }

    /// Record a staged removal as committed
    pub fn removed(&mut self) {
        self.len = self.len.saturating_sub(1);
    }

    fn rewrite<F>(
        &self,
        storage: &AdjacencyStorage,
        batch: &mut WriteBatch,
        index: u32,
        mut update: F,
        spill: bool,
    ) -> StorageResult<usize>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.check(index)?;
        let cf = storage.cf(self.family)?;
        let mut written = 0usize;

        // The iterator reads a consistent view, so rewrites below do not
        // disturb it.
        for item in storage.db().iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let current = decode_index_key(&key)?;
            if current >= self.len {
                break;
            }
            if current == index {
                continue;
            }
            let mut entry: T = bincode::deserialize(&value)?;
            let changed = update(&mut entry);
            if current > index {
                batch.put_cf(cf, index_key(current - 1), bincode::serialize(&entry)?);
            } else if changed {
                batch.put_cf(cf, index_key(current), bincode::serialize(&entry)?);
            } else {
                continue;
            }
            written += 1;
            if spill && batch.len() >= REWRITE_BATCH {
                storage.write(std::mem::take(batch))?;
            }
        }

        batch.delete_cf(cf, index_key(self.len - 1));
        storage.batch_put_meta(batch, &self.len_key, (self.len - 1) as u64)?;
        Ok(written)
    }

    fn check(&self, index: u32) -> StorageResult<()> {
        if index >= self.len {
            return Err(StorageError::Corrupt(format!(
                "index {} beyond {} length {}",
                index, self.family, self.len
            )));
        }
        Ok(())
    }
}
