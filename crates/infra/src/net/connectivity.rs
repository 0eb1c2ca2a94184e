//! Online/offline flag with change notification
//!
//! The monitor never probes the network. The host application reports
//! transitions as it observes them, and interested parties either poll the
//! current flag or subscribe to edges over a watch channel.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared connectivity state.
///
/// Cheap to clone; all clones observe the same flag. The sync worker
/// subscribes and wakes on the offline to online edge to start a replay
/// pass without waiting for the next periodic tick.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, rx) = watch::channel(initially_online);
        Self { tx: Arc::new(tx), rx }
    }

    /// Report a connectivity transition. Reporting the current state again
    /// is a no-op and does not wake subscribers.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }

    /// The current flag.
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// A receiver that wakes on every state change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

impl Default for ConnectivityMonitor {
    /// Starts online; the host downgrades the flag when it learns otherwise.
    fn default() -> Self {
        Self::new(true)
    }
}
