//! Current-identity holder shared by auth providers.

use crate::types::Identity;
use std::sync::Arc;
use tokio::sync::watch;

/// Publishes the signed-in identity on a single watch channel
#[derive(Clone, Debug)]
pub struct SessionHolder {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl SessionHolder {
    /// An empty (signed-out) session
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the identity and notify subscribers
    pub fn set(&self, identity: Option<Identity>) {
        match &identity {
            Some(identity) => tracing::info!(user_id = %identity.id, "Session started"),
            None => tracing::info!("Session cleared"),
        }
        self.tx.send_replace(identity);
    }

    /// Current identity
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Subscribe to identity changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

impl Default for SessionHolder {
    fn default() -> Self {
        Self::new()
    }
}
