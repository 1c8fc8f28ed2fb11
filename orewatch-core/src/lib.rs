pub mod clock;
pub mod config;
pub mod events;
pub mod host;
pub mod permissions;
pub mod tracker;

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use orewatch_ledger::Ledger;
use orewatch_webhook::{WebhookAlert, WebhookService};

use crate::clock::Clock;
use crate::config::{BlockCatalog, WatchConfig};
use crate::events::HostCommand;
use crate::host::HostApi;
use crate::permissions::PermissionCache;
use crate::tracker::BreakTracker;

pub type Error = anyhow::Error;

/// Webhook path handle: the service itself (for sweeps) plus the queue the
/// dispatcher hands alerts to.
#[derive(Clone, Debug)]
pub struct WebhookHandle {
    pub service: Arc<WebhookService>,
    pub tx: mpsc::Sender<WebhookAlert>,
}

/// Shared context passed to every component. Constructed once at startup;
/// no global state.
pub struct Data {
    config: RwLock<Arc<WatchConfig>>,
    catalog: RwLock<Arc<BlockCatalog>>,
    pub tracker: BreakTracker,
    pub permissions: PermissionCache,
    pub ledger: Ledger,
    pub webhook: Option<WebhookHandle>,
    pub host: Arc<dyn HostApi>,
    pub host_tx: mpsc::UnboundedSender<HostCommand>,
    pub clock: Arc<dyn Clock>,
}

impl Data {
    pub fn new(
        config: WatchConfig,
        ledger: Ledger,
        webhook: Option<WebhookHandle>,
        host: Arc<dyn HostApi>,
        host_tx: mpsc::UnboundedSender<HostCommand>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = BlockCatalog::from_config(&config);
        Self {
            config: RwLock::new(Arc::new(config)),
            catalog: RwLock::new(Arc::new(catalog)),
            tracker: BreakTracker::new(),
            permissions: PermissionCache::new(),
            ledger,
            webhook,
            host,
            host_tx,
            clock,
        }
    }

    /// Current configuration snapshot.
    pub async fn config(&self) -> Arc<WatchConfig> {
        self.config.read().await.clone()
    }

    /// Current tracked-block catalog snapshot.
    pub async fn catalog(&self) -> Arc<BlockCatalog> {
        self.catalog.read().await.clone()
    }

    /// Replace the configuration and rebuild the catalog atomically between
    /// events. Returns the number of tracked block types loaded.
    pub async fn swap_config(&self, config: WatchConfig) -> usize {
        let catalog = Arc::new(BlockCatalog::from_config(&config));
        let count = catalog.len();
        *self.catalog.write().await = catalog;
        *self.config.write().await = Arc::new(config);
        count
    }
}
