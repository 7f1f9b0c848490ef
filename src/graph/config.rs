//! Numeric bounds enforced by every store

use super::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};

/// Node-count and per-node degree bounds
///
/// Both default to the 32-bit ceiling the stores are built around; total link
/// count is tracked as `u64` and is not bounded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum number of nodes in one store
    pub max_nodes: u32,
    /// Maximum length of a single node's in- or out-list
    pub max_degree: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nodes: u32::MAX,
            max_degree: u32::MAX,
        }
    }
}

impl Limits {
    pub(crate) fn check_nodes(&self, size: usize) -> GraphResult<()> {
        if size >= self.max_nodes as usize {
            return Err(GraphError::CapacityExceeded {
                what: "node count",
                limit: self.max_nodes as u64,
            });
        }
        Ok(())
    }

    pub(crate) fn check_degree(&self, current: usize) -> GraphResult<()> {
        if current >= self.max_degree as usize {
            return Err(GraphError::CapacityExceeded {
                what: "per-node degree",
                limit: self.max_degree as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_nodes, u32::MAX);
        assert_eq!(limits.max_degree, u32::MAX);
        assert!(limits.check_degree(1_000_000).is_ok());
    }

    #[test]
    fn test_degree_limit() {
        let limits = Limits {
            max_degree: 2,
            ..Limits::default()
        };
        assert!(limits.check_degree(1).is_ok());
        assert!(matches!(
            limits.check_degree(2),
            Err(GraphError::CapacityExceeded { limit: 2, .. })
        ));
    }
}
