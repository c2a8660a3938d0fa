//! "Tree changed" notifications.

use crate::types::NodeKey;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// Re-render from the top-level container list
    Full,
    /// Re-render one node and its subtree
    Node(NodeKey),
}

/// Broadcast sink the UI subscribes to.
#[derive(Clone)]
pub struct TreeEvents {
    sender: broadcast::Sender<TreeChange>,
}

impl TreeEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(128);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeChange> {
        self.sender.subscribe()
    }

    pub fn notify(&self, change: TreeChange) {
        debug!(?change, "Tree changed");
        // No subscribers is not an error.
        let _ = self.sender.send(change);
    }
}

impl Default for TreeEvents {
    fn default() -> Self {
        Self::new()
    }
}
