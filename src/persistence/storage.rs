//! RocksDB layer under the disk-backed stores
//!
//! One RocksDB instance per store, with column families:
//! - `meta`: scalars (`kind`, list lengths, `num_links`)
//! - `labels`: node labels, absent in label-less stores
//! - `out` / `in`: directed adjacency lists
//! - `neighbors`: undirected adjacency lists

use super::config::DiskConfig;
use crate::graph::{StorageError, StorageResult};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DBCompressionType, Options, WriteBatch, DB};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CF_META: &str = "meta";
pub const CF_LABELS: &str = "labels";
pub const CF_OUT: &str = "out";
pub const CF_IN: &str = "in";
pub const CF_NEIGHBORS: &str = "neighbors";

const META_KIND: &[u8] = b"kind";

/// Meta key holding the persisted link count
pub const META_NUM_LINKS: &str = "num_links";

/// Which adjacency column families a store carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Directed,
    Undirected,
}

impl Layout {
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Directed => "directed",
            Layout::Undirected => "undirected",
        }
    }

    /// Adjacency column families, forward list first
    pub fn list_families(&self) -> &'static [&'static str] {
        match self {
            Layout::Directed => &[CF_OUT, CF_IN],
            Layout::Undirected => &[CF_NEIGHBORS],
        }
    }
}

/// A store's RocksDB instance
pub struct AdjacencyStorage {
    db: DB,
    path: PathBuf,
    layout: Layout,
    null_labels: bool,
}

impl AdjacencyStorage {
    /// Create a new, empty store. Fails if a database already exists at `path`.
    pub fn create(path: impl AsRef<Path>, layout: Layout, config: &DiskConfig) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Creating {} store at: {:?}", layout.name(), path);

        let mut opts = Self::db_options(config);
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_error_if_exists(true);

        let mut families = vec!["default", CF_META];
        families.extend_from_slice(layout.list_families());
        if !config.null_labels {
            families.push(CF_LABELS);
        }
        let descriptors = families
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Self::cf_options(config)))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, &path, descriptors)?;
        let storage = Self {
            db,
            path,
            layout,
            null_labels: config.null_labels,
        };
        let meta = storage.cf(CF_META)?;
        storage.db.put_cf(meta, META_KIND, layout.name().as_bytes())?;

        Ok(storage)
    }

    /// Open an existing store, detecting label-less mode from its column
    /// families. The store's kind is returned alongside; the caller decides
    /// whether it matches.
    pub fn open(path: impl AsRef<Path>, layout: Layout, config: &DiskConfig) -> StorageResult<(Self, String)> {
        let path = path.as_ref().to_path_buf();
        info!("Opening {} store at: {:?}", layout.name(), path);

        if !path.exists() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no store at {}", path.display()),
            )));
        }

        let families = DB::list_cf(&Options::default(), &path)?;
        if !families.iter().any(|name| name == CF_META) {
            return Err(StorageError::Corrupt(format!(
                "{} has no {} column family",
                path.display(),
                CF_META
            )));
        }
        let null_labels = !families.iter().any(|name| name == CF_LABELS);

        let opts = Self::db_options(config);
        let descriptors = families
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name.as_str(), Self::cf_options(config)))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, &path, descriptors)?;

        let storage = Self {
            db,
            path,
            layout,
            null_labels,
        };
        let kind = match storage.db.get_cf(storage.cf(CF_META)?, META_KIND)? {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => return Err(StorageError::Corrupt("missing store kind".to_string())),
        };
        if kind == layout.name() {
            for name in layout.list_families() {
                storage.cf(name)?;
            }
        }
        debug!("Opened store with column families {:?}", families);

        Ok((storage, kind))
    }

    fn db_options(config: &DiskConfig) -> Options {
        let mut opts = Options::default();
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(3);
        opts.set_min_write_buffer_number_to_merge(1);
        if config.compression {
            opts.set_compression_type(DBCompressionType::Lz4);
        }
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);
        opts
    }

    fn cf_options(config: &DiskConfig) -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(if config.compression {
            DBCompressionType::Lz4
        } else {
            DBCompressionType::None
        });
        opts
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn is_null_labels(&self) -> bool {
        self.null_labels
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn db(&self) -> &DB {
        &self.db
    }

    /// Column family handle by name
    pub fn cf(&self, name: &str) -> StorageResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    /// Read a `u64` scalar from `meta`
    pub fn get_meta(&self, key: &str) -> StorageResult<Option<u64>> {
        match self.db.get_cf(self.cf(CF_META)?, key.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Corrupt(format!("meta {} has {} bytes", key, bytes.len()))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    pub fn put_meta(&self, key: &str, value: u64) -> StorageResult<()> {
        self.db
            .put_cf(self.cf(CF_META)?, key.as_bytes(), value.to_be_bytes())?;
        Ok(())
    }

    /// Stage a `u64` scalar write into `batch`
    pub fn batch_put_meta(&self, batch: &mut WriteBatch, key: &str, value: u64) -> StorageResult<()> {
        batch.put_cf(self.cf(CF_META)?, key.as_bytes(), value.to_be_bytes());
        Ok(())
    }

    pub fn delete_meta(&self, key: &str) -> StorageResult<()> {
        self.db.delete_cf(self.cf(CF_META)?, key.as_bytes())?;
        Ok(())
    }

    /// Read and delete a scalar in one step
    pub fn take_meta(&self, key: &str) -> StorageResult<Option<u64>> {
        let value = self.get_meta(key)?;
        if value.is_some() {
            self.delete_meta(key)?;
            // Make the deletion durable before the store is used.
            self.db.flush_cf(self.cf(CF_META)?)?;
        }
        Ok(value)
    }

    /// Apply a batch atomically
    pub fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        self.db.write(batch)?;
        Ok(())
    }

    /// Flush every column family to disk
    pub fn flush(&self) -> StorageResult<()> {
        let mut families = vec![CF_META];
        families.extend_from_slice(self.layout.list_families());
        if !self.null_labels {
            families.push(CF_LABELS);
        }
        for name in families {
            self.db.flush_cf(self.cf(name)?)?;
        }
        debug!("Flushed store at {:?}", self.path);
        Ok(())
    }
}

/// Key of list entry `index`: big-endian so RocksDB order is index order
pub(crate) fn index_key(index: u32) -> [u8; 4] {
    index.to_be_bytes()
}

pub(crate) fn decode_index_key(key: &[u8]) -> StorageResult<u32> {
    let raw: [u8; 4] = key
        .try_into()
        .map_err(|_| StorageError::Corrupt(format!("list key has {} bytes", key.len())))?;
    Ok(u32::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store");
        {
            let storage = AdjacencyStorage::create(&path, Layout::Directed, &DiskConfig::default()).unwrap();
            assert!(!storage.is_null_labels());
            storage.put_meta("answer", 42).unwrap();
            storage.flush().unwrap();
        }

        let (storage, kind) = AdjacencyStorage::open(&path, Layout::Directed, &DiskConfig::default()).unwrap();
        assert_eq!(kind, "directed");
        assert_eq!(storage.get_meta("answer").unwrap(), Some(42));
        assert_eq!(storage.get_meta("missing").unwrap(), None);
    }

    #[test]
    fn test_create_refuses_existing_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store");
        drop(AdjacencyStorage::create(&path, Layout::Undirected, &DiskConfig::default()).unwrap());
        assert!(AdjacencyStorage::create(&path, Layout::Undirected, &DiskConfig::default()).is_err());
    }

    #[test]
    fn test_null_labels_detected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store");
        drop(AdjacencyStorage::create(&path, Layout::Undirected, &DiskConfig::unlabeled()).unwrap());

        // `open` ignores the flag in the config and inspects the store.
        let (storage, kind) = AdjacencyStorage::open(&path, Layout::Undirected, &DiskConfig::default()).unwrap();
        assert_eq!(kind, "undirected");
        assert!(storage.is_null_labels());
        assert!(storage.cf(CF_LABELS).is_err());
        assert!(storage.cf(CF_NEIGHBORS).is_ok());
    }

    #[test]
    fn test_take_meta() {
        let temp_dir = TempDir::new().unwrap();
        let storage = AdjacencyStorage::create(temp_dir.path().join("s"), Layout::Directed, &DiskConfig::default()).unwrap();
        storage.put_meta(META_NUM_LINKS, 9).unwrap();
        assert_eq!(storage.take_meta(META_NUM_LINKS).unwrap(), Some(9));
        assert_eq!(storage.take_meta(META_NUM_LINKS).unwrap(), None);
    }

    #[test]
    fn test_open_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let result = AdjacencyStorage::open(temp_dir.path().join("nope"), Layout::Directed, &DiskConfig::default());
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_index_keys_sort_numerically() {
        assert!(index_key(2) < index_key(256));
        assert_eq!(decode_index_key(&index_key(70_000)).unwrap(), 70_000);
        assert!(decode_index_key(&[1, 2]).is_err());
    }
}
