//! Periodic sweep of expired state: idle break windows, stale webhook
//! conversations, and the placement-cache flush.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use orewatch_core::Data;

pub const CLEANUP_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Handle to the background cleanup task.
pub struct CleanupTask {
    handle: JoinHandle<()>,
    cancel: watch::Sender<bool>,
}

impl CleanupTask {
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.handle.await;
    }
}

/// Spawn the periodic sweep.
pub fn spawn_cleanup(data: Arc<Data>, period: Duration) -> CleanupTask {
    let (cancel, mut cancel_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the initial sweep
        // lands one full period after startup.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => run_sweep(&data).await,
                _ = cancel_rx.changed() => break,
            }
        }
        debug!("cleanup task stopped");
    });
    CleanupTask { handle, cancel }
}

/// One sweep pass over every expirable store.
pub async fn run_sweep(data: &Data) {
    let now = data.clock.now();

    let catalog = data.catalog().await;
    data.tracker.sweep(now, &catalog).await;

    if let Some(webhook) = &data.webhook {
        let removed = webhook.service.sweep_idle(now).await;
        if removed > 0 {
            debug!(removed, "expired idle webhook conversations");
        }
    }

    match data.ledger.flush().await {
        Ok(written) => {
            if written > 0 {
                debug!(written, "placement cache flushed");
            }
        }
        Err(source) => error!(?source, "placement cache flush failed"),
    }

    let players = data.tracker.player_count().await;
    debug!(players, "cleanup sweep complete");
}

#[cfg(test)]
mod tests {
    use super::run_sweep;
    use crate::pipeline::handle_event;
    use crate::testutil::{StubHost, fixture};
    use orewatch_core::config::WatchConfig;
    use orewatch_core::events::{BlockPos, InboundEvent};
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn sweep_evicts_windows_that_fell_out_of_range() {
        let miner = Uuid::new_v4();
        let fx = fixture(WatchConfig::default(), StubHost::default(), None);

        // A few breaks, well under the threshold.
        for i in 0..3 {
            handle_event(
                &fx.data,
                InboundEvent::BlockBroken {
                    player: miner,
                    player_name: "Steve".to_owned(),
                    world: "overworld".to_owned(),
                    block_id: "minecraft:diamond_ore".to_owned(),
                    pos: BlockPos::new(i, -58, i),
                },
            )
            .await;
        }
        assert_eq!(fx.data.tracker.player_count().await, 1);

        // Inside the window nothing is evicted.
        fx.clock.advance(Duration::from_secs(10 * 60));
        run_sweep(&fx.data).await;
        assert_eq!(fx.data.tracker.player_count().await, 1);

        // Past the window the empty, non-tracking state goes away.
        fx.clock.advance(Duration::from_secs(21 * 60));
        run_sweep(&fx.data).await;
        assert_eq!(fx.data.tracker.player_count().await, 0);
    }
}
