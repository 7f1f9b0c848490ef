//! Disk store configuration

use crate::graph::Limits;
use serde::{Deserialize, Serialize};

/// Options for creating or opening a disk-backed store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Create the store without a labels column family. Ignored by `open`,
    /// which detects the mode from the store on disk.
    pub null_labels: bool,

    /// RocksDB memtable size in bytes
    pub write_buffer_size: usize,

    /// LZ4-compress the column families
    pub compression: bool,

    /// Node-count and degree bounds
    pub limits: Limits,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            null_labels: false,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
            compression: true,
            limits: Limits::default(),
        }
    }
}

impl DiskConfig {
    /// Default configuration for a store without labels
    pub fn unlabeled() -> Self {
        Self {
            null_labels: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiskConfig::default();
        assert!(!config.null_labels);
        assert!(config.compression);
        assert_eq!(config.write_buffer_size, 64 * 1024 * 1024);
        assert!(DiskConfig::unlabeled().null_labels);
    }

    #[test]
    fn test_config_serde() {
        let mut config = DiskConfig::default();
        config.limits.max_degree = 16;
        let json = serde_json::to_string(&config).unwrap();
        let back: DiskConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
