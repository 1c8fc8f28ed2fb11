use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::DurableBackend;

/// A placed-block coordinate, scoped to its world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementKey {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl PlacementKey {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

/// Placement provenance ledger: records which coordinates were placed by a
/// player so that breaking them is never treated as suspicious.
///
/// Lookups hit the in-memory cache first; the durable backend answers for
/// placements that predate this process. All writes go to both when the
/// backend is enabled.
#[derive(Debug)]
pub struct Ledger {
    cache: RwLock<HashMap<PlacementKey, String>>,
    backend: DurableBackend,
}

impl Ledger {
    /// Ledger with no durable backend: placements survive only for the
    /// lifetime of the process.
    pub fn disabled() -> Self {
        Self::with_backend(DurableBackend::disabled())
    }

    pub fn with_backend(backend: DurableBackend) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            backend,
        }
    }

    pub fn durable_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    /// Register a coordinate as player-placed.
    pub async fn record_placement(
        &self,
        world: &str,
        x: i32,
        y: i32,
        z: i32,
        block_id: &str,
    ) -> anyhow::Result<()> {
        let key = PlacementKey::new(world, x, y, z);
        debug!(world, x, y, z, block_id, "recording player placement");
        self.cache
            .write()
            .await
            .insert(key.clone(), block_id.to_owned());
        if self.backend.is_enabled() {
            self.backend.insert(&key, block_id).await?;
        }
        Ok(())
    }

    /// Whether the coordinate was placed by a player. Errors from the durable
    /// backend are propagated; callers must not interpret them as "not
    /// placed".
    pub async fn is_player_placed(
        &self,
        world: &str,
        x: i32,
        y: i32,
        z: i32,
    ) -> anyhow::Result<bool> {
        let key = PlacementKey::new(world, x, y, z);
        if self.cache.read().await.contains_key(&key) {
            return Ok(true);
        }
        self.backend.contains(&key).await
    }

    /// Drop a coordinate from the placement cache and, when enabled, from
    /// durable storage. Idempotent.
    pub async fn forget(&self, world: &str, x: i32, y: i32, z: i32) -> anyhow::Result<()> {
        let key = PlacementKey::new(world, x, y, z);
        self.cache.write().await.remove(&key);
        if self.backend.is_enabled() {
            self.backend.remove(&key).await?;
        }
        Ok(())
    }

    /// Sync the in-memory placement cache to the durable backend. Returns the
    /// number of entries written; a no-op when the backend is disabled.
    pub async fn flush(&self) -> anyhow::Result<usize> {
        if !self.backend.is_enabled() {
            return Ok(0);
        }
        let snapshot = self.cache.read().await.clone();
        let count = snapshot.len();
        self.backend.replace_all(snapshot).await?;
        debug!(count, "ledger cache flushed to durable storage");
        Ok(count)
    }
}
