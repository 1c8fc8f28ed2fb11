use uuid::Uuid;

/// Host-runtime services the core consumes. Implemented by the embedding
/// server; kept synchronous because hosts answer from their own session
/// registries.
pub trait HostApi: Send + Sync {
    /// Whether the player holds the notify permission node, falling back to
    /// the configured numeric permission/op levels.
    fn has_permission(&self, player: Uuid, node: &str, permission_level: u8, op_level: u8)
    -> bool;

    /// Formatted snapshot of the player's inventory, when the host can
    /// provide one.
    fn inventory_snapshot(&self, player: Uuid) -> Option<String>;
}
