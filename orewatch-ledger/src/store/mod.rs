mod memory_store;
mod noop_store;

use std::collections::HashMap;

use memory_store::MemoryPlacementStore;
use noop_store::NoopPlacementStore;

use crate::ledger::PlacementKey;

/// Durable storage behind the placement cache. The core never implements
/// persistence itself; hosts that have a real store contribute a variant.
#[derive(Clone, Debug)]
pub enum DurableBackend {
    Disabled(NoopPlacementStore),
    Memory(MemoryPlacementStore),
}

impl DurableBackend {
    pub fn disabled() -> Self {
        Self::Disabled(NoopPlacementStore)
    }

    /// Process-local store, useful for hosts without persistence and tests.
    pub fn memory() -> Self {
        Self::Memory(MemoryPlacementStore::default())
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled(_))
    }

    pub async fn contains(&self, key: &PlacementKey) -> anyhow::Result<bool> {
        match self {
            Self::Disabled(store) => store.contains(key).await,
            Self::Memory(store) => store.contains(key).await,
        }
    }

    pub async fn insert(&self, key: &PlacementKey, block_id: &str) -> anyhow::Result<()> {
        match self {
            Self::Disabled(store) => store.insert(key, block_id).await,
            Self::Memory(store) => store.insert(key, block_id).await,
        }
    }

    pub async fn remove(&self, key: &PlacementKey) -> anyhow::Result<()> {
        match self {
            Self::Disabled(store) => store.remove(key).await,
            Self::Memory(store) => store.remove(key).await,
        }
    }

    pub async fn replace_all(
        &self,
        entries: HashMap<PlacementKey, String>,
    ) -> anyhow::Result<()> {
        match self {
            Self::Disabled(store) => store.replace_all(entries).await,
            Self::Memory(store) => store.replace_all(entries).await,
        }
    }
}
