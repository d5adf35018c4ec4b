//! In-memory coordination tree for testing.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::CoordinationClient;
use crate::error::CoordinationError;
use crate::Result;

/// In-memory ZooKeeper-like tree.
///
/// Nodes are keyed by absolute path; parents are created implicitly. The
/// tree can be switched to an unreachable state and can delete a node right
/// after it has been listed, which reproduces the races a live registry has.
#[derive(Default)]
pub struct MemoryCoordination {
    nodes: RwLock<BTreeMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
    /// Nodes removed the first time their direct parent is listed
    vanish_on_list: RwLock<Vec<String>>,
    /// The tree goes unreachable right after this path is listed
    unavailable_after: RwLock<Option<String>>,
}

impl MemoryCoordination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a node, creating missing parents with empty data.
    pub fn set(&self, path: &str, data: impl Into<Vec<u8>>) {
        let mut nodes = self.nodes.write();
        let mut parent = String::new();
        for segment in path.trim_start_matches('/').split('/') {
            parent.push('/');
            parent.push_str(segment);
            nodes.entry(parent.clone()).or_default();
        }
        nodes.insert(path.to_string(), data.into());
    }

    /// Remove a node and its whole subtree.
    pub fn delete(&self, path: &str) {
        let prefix = format!("{}/", path);
        self.nodes
            .write()
            .retain(|key, _| key != path && !key.starts_with(&prefix));
    }

    /// Make every request fail as if the ensemble were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delete `path` immediately after its parent is next listed.
    pub fn vanish_after_listing(&self, path: &str) {
        self.vanish_on_list.write().push(path.to_string());
    }

    /// Become unreachable immediately after `path` is next listed, so the
    /// listing itself succeeds and every later request fails.
    pub fn unavailable_after_listing(&self, path: &str) {
        *self.unavailable_after.write() = Some(path.to_string());
    }

    fn check_available(&self, path: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoordinationError::Connection {
                connect: "memory".to_string(),
                message: format!("unreachable while reading {}", path),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordination {
    async fn children(&self, path: &str) -> Result<Option<Vec<String>>> {
        self.check_available(path)?;

        let children = {
            let nodes = self.nodes.read();
            if !nodes.contains_key(path) {
                return Ok(None);
            }
            let prefix = format!("{}/", path.trim_end_matches('/'));
            nodes
                .keys()
                .filter_map(|key| key.strip_prefix(&prefix))
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(|child| child.to_string())
                .collect::<Vec<_>>()
        };

        let vanishing: Vec<String> = {
            let mut pending = self.vanish_on_list.write();
            let prefix = format!("{}/", path);
            let (hit, keep): (Vec<_>, Vec<_>) = pending.drain(..).partition(|p| {
                p.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            });
            *pending = keep;
            hit
        };
        for node in vanishing {
            self.delete(&node);
        }

        let mut unavailable_after = self.unavailable_after.write();
        if unavailable_after.as_deref() == Some(path) {
            *unavailable_after = None;
            self.set_unavailable(true);
        }

        Ok(Some(children))
    }

    async fn data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.check_available(path)?;
        Ok(self.nodes.read().get(path).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_creates_parents() {
        let tree = MemoryCoordination::new();
        tree.set("/consumers/g1/offsets/orders/0", "42");

        assert_eq!(
            tree.children("/consumers").await.unwrap(),
            Some(vec!["g1".to_string()])
        );
        assert_eq!(
            tree.children("/consumers/g1/offsets/orders").await.unwrap(),
            Some(vec!["0".to_string()])
        );
        assert_eq!(
            tree.data("/consumers/g1/offsets/orders/0").await.unwrap(),
            Some(b"42".to_vec())
        );
    }

    #[tokio::test]
    async fn test_missing_node_is_none() {
        let tree = MemoryCoordination::new();
        assert_eq!(tree.children("/consumers").await.unwrap(), None);
        assert_eq!(tree.data("/consumers/x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let tree = MemoryCoordination::new();
        tree.set("/consumers/g1/offsets/orders/0", "1");
        tree.set("/consumers/g2/offsets/orders/0", "2");
        tree.delete("/consumers/g1");

        assert_eq!(
            tree.children("/consumers").await.unwrap(),
            Some(vec!["g2".to_string()])
        );
        assert_eq!(tree.data("/consumers/g1/offsets/orders/0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_is_an_error() {
        let tree = MemoryCoordination::new();
        tree.set("/consumers", "");
        tree.set_unavailable(true);
        assert!(tree.children("/consumers").await.is_err());
        tree.set_unavailable(false);
        assert!(tree.children("/consumers").await.is_ok());
    }

    #[tokio::test]
    async fn test_vanish_after_listing() {
        let tree = MemoryCoordination::new();
        tree.set("/consumers/g1/offsets/orders/0", "1");
        tree.vanish_after_listing("/consumers/g1/offsets/orders/0");

        let listed = tree
            .children("/consumers/g1/offsets/orders")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listed, vec!["0".to_string()]);
        assert_eq!(tree.data("/consumers/g1/offsets/orders/0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_after_listing() {
        let tree = MemoryCoordination::new();
        tree.set("/consumers/g1/offsets/orders/0", "1");
        tree.unavailable_after_listing("/consumers");

        assert!(tree.children("/consumers").await.is_ok());
        assert!(tree.children("/consumers/g1/offsets").await.is_err());
    }
}
