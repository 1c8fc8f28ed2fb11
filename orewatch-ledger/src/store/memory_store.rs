use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::ledger::PlacementKey;

/// Process-local placement store. Shared by clone so a ledger rebuilt over
/// the same store sees earlier placements.
#[derive(Clone, Debug, Default)]
pub struct MemoryPlacementStore {
    entries: Arc<RwLock<HashMap<PlacementKey, String>>>,
}

impl MemoryPlacementStore {
    pub async fn contains(&self, key: &PlacementKey) -> anyhow::Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    pub async fn insert(&self, key: &PlacementKey, block_id: &str) -> anyhow::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.clone(), block_id.to_owned());
        Ok(())
    }

    pub async fn remove(&self, key: &PlacementKey) -> anyhow::Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    pub async fn replace_all(
        &self,
        entries: HashMap<PlacementKey, String>,
    ) -> anyhow::Result<()> {
        *self.entries.write().await = entries;
        Ok(())
    }
}
