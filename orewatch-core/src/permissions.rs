use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

/// Per-session cache of "receives alerts" flags, written once on connect and
/// dropped on disconnect. Players without an entry are never recipients.
#[derive(Debug, Default)]
pub struct PermissionCache {
    entries: RwLock<HashMap<Uuid, bool>>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, player: Uuid, receives_alerts: bool) {
        self.entries.write().await.insert(player, receives_alerts);
    }

    pub async fn remove(&self, player: &Uuid) {
        self.entries.write().await.remove(player);
    }

    /// Connected players flagged to receive alerts.
    pub async fn recipients(&self) -> Vec<Uuid> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, allowed)| **allowed)
            .map(|(player, _)| *player)
            .collect()
    }

    pub async fn is_recipient(&self, player: &Uuid) -> bool {
        self.entries
            .read()
            .await
            .get(player)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::PermissionCache;
    use uuid::Uuid;

    #[tokio::test]
    async fn missing_entries_fail_closed() {
        let cache = PermissionCache::new();
        let stranger = Uuid::new_v4();
        assert!(!cache.is_recipient(&stranger).await);
        assert!(cache.recipients().await.is_empty());
    }

    #[tokio::test]
    async fn disconnect_removes_entry() {
        let cache = PermissionCache::new();
        let moderator = Uuid::new_v4();
        let player = Uuid::new_v4();
        cache.set(moderator, true).await;
        cache.set(player, false).await;

        assert_eq!(cache.recipients().await, vec![moderator]);

        cache.remove(&moderator).await;
        assert!(!cache.is_recipient(&moderator).await);
        assert!(cache.recipients().await.is_empty());
    }
}
