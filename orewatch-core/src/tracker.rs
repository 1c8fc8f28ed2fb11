use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::config::{BlockCatalog, BlockTypeId, TrackedBlock};
use crate::events::BlockPos;

/// Fallback trim window for blocks that were removed from the catalog while
/// still having live state.
const ORPHAN_TRIM_WINDOW: Duration = Duration::from_secs(30 * 60);

#[derive(Clone, Copy, Debug)]
struct BreakRecord {
    at: SystemTime,
    pos: BlockPos,
}

/// Sliding-window state for one (player, block type) pair.
#[derive(Debug)]
struct BreakWindow {
    queue: VecDeque<BreakRecord>,
    tracking: bool,
    last_alert_at: SystemTime,
    last_alert_count: u32,
    consecutive_alerts: u32,
}

impl BreakWindow {
    fn new(now: SystemTime) -> Self {
        Self {
            queue: VecDeque::new(),
            tracking: false,
            last_alert_at: now,
            last_alert_count: 0,
            consecutive_alerts: 0,
        }
    }

    fn trim(&mut self, cutoff: SystemTime) {
        while self.queue.front().is_some_and(|record| record.at < cutoff) {
            self.queue.pop_front();
        }
    }
}

/// A firing decision handed to the dispatcher.
#[derive(Clone, Debug)]
pub struct AlertEvent {
    pub player: Uuid,
    pub player_name: String,
    pub block: BlockTypeId,
    pub count: u32,
    pub window: Duration,
    /// 1 for the first alert of a tracking cycle, incrementing per escalation.
    pub consecutive: u32,
    pub pos: BlockPos,
}

type PlayerWindows = HashMap<BlockTypeId, BreakWindow>;

/// Per-player, per-block-type sliding-window counter with escalation state.
///
/// The outer map is keyed by player; each player's windows sit behind their
/// own lock so concurrent breaks by one player are serialized without a
/// global lock across players.
#[derive(Debug, Default)]
pub struct BreakTracker {
    players: RwLock<HashMap<Uuid, Arc<Mutex<PlayerWindows>>>>,
}

impl BreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one break and decide whether it fires an alert. At most one
    /// alert is emitted per call.
    pub async fn record_break(
        &self,
        player: Uuid,
        player_name: &str,
        block: &TrackedBlock,
        pos: BlockPos,
        now: SystemTime,
    ) -> Option<AlertEvent> {
        let windows = self.player_windows(player).await;
        let mut windows = windows.lock().await;
        let window = windows
            .entry(block.id.clone())
            .or_insert_with(|| BreakWindow::new(now));

        window.queue.push_back(BreakRecord { at: now, pos });
        // A window wider than the epoch has no representable cutoff; nothing
        // can be older than it, so trimming is skipped.
        if let Some(cutoff) = now.checked_sub(block.window) {
            window.trim(cutoff);
        }
        let current_count = window.queue.len() as u32;

        // Idle reset comes before any threshold check: the triggering break
        // is consumed by the reset and never counts toward a new alert.
        if window.tracking && !block.reset_after_idle.is_zero() {
            let reset_at = window.last_alert_at + block.reset_after_idle;
            if now > reset_at {
                debug!(player = %player, block = %block.id, "idle reset, tracking disabled");
                window.queue.clear();
                window.queue.push_back(BreakRecord { at: now, pos });
                window.tracking = false;
                window.last_alert_at = now;
                window.last_alert_count = 0;
                window.consecutive_alerts = 0;
                return None;
            }
        }

        if !window.tracking && current_count >= block.initial_threshold {
            window.tracking = true;
            window.consecutive_alerts = 1;
            window.last_alert_at = now;
            window.last_alert_count = current_count;
        } else if window.tracking
            && current_count >= window.last_alert_count + block.subsequent_threshold
        {
            window.consecutive_alerts += 1;
            window.last_alert_at = now;
            window.last_alert_count = current_count;
        } else {
            return None;
        }

        let recent_pos = window.queue.back().map(|record| record.pos).unwrap_or(pos);
        Some(AlertEvent {
            player,
            player_name: player_name.to_owned(),
            block: block.id.clone(),
            count: current_count,
            window: block.window,
            consecutive: window.consecutive_alerts,
            pos: recent_pos,
        })
    }

    /// Drop all state for a disconnecting player.
    pub async fn remove_player(&self, player: &Uuid) {
        self.players.write().await.remove(player);
    }

    /// Trim every window and evict idle state: windows that are empty and not
    /// tracking go away, and so do players left with no windows. The only
    /// reclamation path for players who go quiet without disconnecting.
    pub async fn sweep(&self, now: SystemTime, catalog: &BlockCatalog) {
        let mut players = self.players.write().await;
        let ids: Vec<Uuid> = players.keys().copied().collect();
        for id in ids {
            let Some(windows) = players.get(&id).cloned() else {
                continue;
            };
            let mut windows = windows.lock().await;
            windows.retain(|block_id, window| {
                let trim_window = catalog
                    .get(block_id)
                    .map(|block| block.window)
                    .unwrap_or(ORPHAN_TRIM_WINDOW);
                if let Some(cutoff) = now.checked_sub(trim_window) {
                    window.trim(cutoff);
                }
                !window.queue.is_empty() || window.tracking
            });
            let empty = windows.is_empty();
            drop(windows);
            if empty {
                players.remove(&id);
            }
        }
    }

    /// Number of players with live tracking state.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    async fn player_windows(&self, player: Uuid) -> Arc<Mutex<PlayerWindows>> {
        if let Some(windows) = self.players.read().await.get(&player) {
            return windows.clone();
        }
        self.players
            .write()
            .await
            .entry(player)
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::BreakTracker;
    use crate::config::{BlockCatalog, BlockTypeId, TrackedBlock, WatchConfig};
    use crate::events::BlockPos;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    fn diamond(reset_after_minutes: u64) -> TrackedBlock {
        TrackedBlock {
            id: BlockTypeId::parse("minecraft:diamond_ore").unwrap(),
            initial_threshold: 10,
            window: Duration::from_secs(30 * 60),
            subsequent_threshold: 5,
            reset_after_idle: Duration::from_secs(reset_after_minutes * 60),
            message_template: String::new(),
        }
    }

    fn start() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn pos(i: i32) -> BlockPos {
        BlockPos::new(i, -58, i)
    }

    /// Break `n` times, one second apart, returning the alerts fired.
    async fn burst(
        tracker: &BreakTracker,
        player: Uuid,
        block: &TrackedBlock,
        from: SystemTime,
        n: u32,
    ) -> Vec<super::AlertEvent> {
        let mut alerts = Vec::new();
        for i in 0..n {
            let now = from + Duration::from_secs(i as u64);
            if let Some(alert) = tracker
                .record_break(player, "Steve", block, pos(i as i32), now)
                .await
            {
                alerts.push(alert);
            }
        }
        alerts
    }

    #[tokio::test]
    async fn first_alert_fires_exactly_at_threshold() {
        let tracker = BreakTracker::new();
        let block = diamond(0);
        let player = Uuid::new_v4();

        let alerts = burst(&tracker, player, &block, start(), 9).await;
        assert!(alerts.is_empty());

        let alert = tracker
            .record_break(player, "Steve", &block, pos(9), start() + Duration::from_secs(9))
            .await
            .expect("10th break within the window must alert");
        assert_eq!(alert.count, 10);
        assert_eq!(alert.consecutive, 1);
        assert_eq!(alert.pos, pos(9));
        assert_eq!(alert.player_name, "Steve");
    }

    #[tokio::test]
    async fn subsequent_threshold_escalates_once_per_breach() {
        // The concrete scenario: 10 within 10 minutes -> alert; 4 more -> no
        // alert; the 15th -> alert with consecutive=2.
        let tracker = BreakTracker::new();
        let block = diamond(0);
        let player = Uuid::new_v4();

        let mut alerts = burst(&tracker, player, &block, start(), 14).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].count, 10);
        assert_eq!(alerts[0].consecutive, 1);

        alerts = burst(&tracker, player, &block, start() + Duration::from_secs(20), 1).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].count, 15);
        assert_eq!(alerts[0].consecutive, 2);
    }

    #[tokio::test]
    async fn breaks_outside_window_do_not_count() {
        let tracker = BreakTracker::new();
        let block = diamond(0);
        let player = Uuid::new_v4();

        // 9 breaks, then a long pause; the 10th arrives after the first 9
        // have expired.
        burst(&tracker, player, &block, start(), 9).await;
        let late = start() + Duration::from_secs(31 * 60);
        let alert = tracker
            .record_break(player, "Steve", &block, pos(0), late)
            .await;
        assert!(alert.is_none());
    }

    #[tokio::test]
    async fn idle_reset_consumes_the_triggering_break() {
        let tracker = BreakTracker::new();
        let block = diamond(10);
        let player = Uuid::new_v4();

        let alerts = burst(&tracker, player, &block, start(), 10).await;
        assert_eq!(alerts.len(), 1);

        // Past the reset horizon: this break resets tracking and must not
        // alert even though the window math alone would allow one later.
        let after_idle = start() + Duration::from_secs(21 * 60);
        let alert = tracker
            .record_break(player, "Steve", &block, pos(0), after_idle)
            .await;
        assert!(alert.is_none());

        // A fresh cycle now needs the full initial threshold again; the
        // reset break seeded the queue with one entry.
        let alerts = burst(&tracker, player, &block, after_idle + Duration::from_secs(1), 8).await;
        assert!(alerts.is_empty());
        let alert = tracker
            .record_break(
                player,
                "Steve",
                &block,
                pos(0),
                after_idle + Duration::from_secs(10),
            )
            .await
            .expect("threshold reached again after reset");
        assert_eq!(alert.consecutive, 1);
    }

    #[tokio::test]
    async fn no_reset_when_reset_after_idle_is_zero() {
        let tracker = BreakTracker::new();
        let block = diamond(0);
        let player = Uuid::new_v4();

        burst(&tracker, player, &block, start(), 10).await;

        // Hours later, still tracking: escalation still requires the count
        // to pass last_alert_count + subsequent_threshold (10 + 5).
        let later = start() + Duration::from_secs(3 * 3600);
        let alerts = burst(&tracker, player, &block, later, 15).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].count, 15);
        assert_eq!(alerts[0].consecutive, 2);
    }

    #[tokio::test]
    async fn oversized_window_never_panics() {
        let tracker = BreakTracker::new();
        let mut block = diamond(0);
        block.window = Duration::from_secs(u64::MAX);
        let player = Uuid::new_v4();

        // `now - window` has no representable cutoff here; breaks just
        // accumulate without trimming.
        let alerts = burst(&tracker, player, &block, UNIX_EPOCH, 9).await;
        assert!(alerts.is_empty());
        let alert = tracker
            .record_break(player, "Steve", &block, pos(9), UNIX_EPOCH + Duration::from_secs(9))
            .await;
        assert!(alert.is_some());
    }

    #[tokio::test]
    async fn disconnect_clears_all_state() {
        let tracker = BreakTracker::new();
        let block = diamond(0);
        let player = Uuid::new_v4();

        burst(&tracker, player, &block, start(), 10).await;
        assert_eq!(tracker.player_count().await, 1);

        tracker.remove_player(&player).await;
        assert_eq!(tracker.player_count().await, 0);

        // Reconnect starts from an empty window.
        let alerts = burst(&tracker, player, &block, start() + Duration::from_secs(60), 9).await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn sweep_evicts_idle_windows_and_players() {
        let tracker = BreakTracker::new();
        let block = diamond(0);
        let quiet = Uuid::new_v4();
        let tracked = Uuid::new_v4();
        let catalog = BlockCatalog::from_config(&WatchConfig::default());

        burst(&tracker, quiet, &block, start(), 3).await;
        burst(&tracker, tracked, &block, start(), 10).await;
        assert_eq!(tracker.player_count().await, 2);

        tracker.sweep(start() + Duration::from_secs(31 * 60), &catalog).await;

        // The quiet player's window emptied and was evicted; the tracked
        // player survives eviction because tracking is still enabled.
        assert_eq!(tracker.player_count().await, 1);
    }
}
