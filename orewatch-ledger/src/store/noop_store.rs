use std::collections::HashMap;

use crate::ledger::PlacementKey;

#[derive(Clone, Debug, Default)]
pub struct NoopPlacementStore;

impl NoopPlacementStore {
    pub async fn contains(&self, _key: &PlacementKey) -> anyhow::Result<bool> {
        Ok(false)
    }

    pub async fn insert(&self, _key: &PlacementKey, _block_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    pub async fn remove(&self, _key: &PlacementKey) -> anyhow::Result<()> {
        Ok(())
    }

    pub async fn replace_all(
        &self,
        _entries: HashMap<PlacementKey, String>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
