use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use orewatch_core::host::HostApi;
use orewatch_utils::formatting::format_inventory;

const INVENTORY_DISPLAY_LIMIT: usize = 10;

#[derive(Debug, Default)]
struct Session {
    name: String,
    moderator: bool,
    inventory: Vec<(String, u32)>,
}

/// In-process session registry backing the host-side services. A server
/// embedding the engine would answer these from its own player manager and
/// permission provider.
#[derive(Debug, Default)]
pub struct LocalHost {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(
        &self,
        player: Uuid,
        name: &str,
        moderator: bool,
        inventory: Vec<(String, u32)>,
    ) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                player,
                Session {
                    name: name.to_owned(),
                    moderator,
                    inventory,
                },
            );
    }

    pub fn disconnect(&self, player: &Uuid) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(player);
    }

    pub fn player_name(&self, player: &Uuid) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(player)
            .map(|session| session.name.clone())
    }
}

impl HostApi for LocalHost {
    fn has_permission(
        &self,
        player: Uuid,
        _node: &str,
        _permission_level: u8,
        _op_level: u8,
    ) -> bool {
        // The standalone feed models permissions as a plain moderator flag;
        // an embedding server would resolve the node with the level fallbacks.
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .is_some_and(|session| session.moderator)
    }

    fn inventory_snapshot(&self, player: Uuid) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .filter(|session| !session.inventory.is_empty())
            .map(|session| format_inventory(&session.inventory, INVENTORY_DISPLAY_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::LocalHost;
    use orewatch_core::host::HostApi;
    use uuid::Uuid;

    #[test]
    fn permission_follows_the_moderator_flag() {
        let host = LocalHost::new();
        let moderator = Uuid::new_v4();
        let player = Uuid::new_v4();
        host.connect(moderator, "Alex", true, Vec::new());
        host.connect(player, "Steve", false, Vec::new());

        assert!(host.has_permission(moderator, "orewatch.notify", 2, 2));
        assert!(!host.has_permission(player, "orewatch.notify", 2, 2));
        assert!(!host.has_permission(Uuid::new_v4(), "orewatch.notify", 2, 2));

        host.disconnect(&moderator);
        assert!(!host.has_permission(moderator, "orewatch.notify", 2, 2));
    }

    #[test]
    fn inventory_snapshot_formats_or_abstains() {
        let host = LocalHost::new();
        let rich = Uuid::new_v4();
        let empty = Uuid::new_v4();
        host.connect(
            rich,
            "Steve",
            false,
            vec![("Diamond".to_owned(), 12), ("Iron Pickaxe".to_owned(), 1)],
        );
        host.connect(empty, "Alex", false, Vec::new());

        assert_eq!(
            host.inventory_snapshot(rich).as_deref(),
            Some("Diamond x12\nIron Pickaxe")
        );
        assert!(host.inventory_snapshot(empty).is_none());
        assert!(host.inventory_snapshot(Uuid::new_v4()).is_none());
    }
}
