//! Shared fixtures for the detection tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use uuid::Uuid;

use orewatch_core::clock::ManualClock;
use orewatch_core::config::WatchConfig;
use orewatch_core::events::HostCommand;
use orewatch_core::host::HostApi;
use orewatch_core::{Data, WebhookHandle};
use orewatch_ledger::Ledger;

/// Host stub with a fixed moderator set and inventory snapshot.
#[derive(Debug, Default)]
pub struct StubHost {
    pub moderators: HashSet<Uuid>,
    pub inventory: Option<String>,
}

impl HostApi for StubHost {
    fn has_permission(
        &self,
        player: Uuid,
        _node: &str,
        _permission_level: u8,
        _op_level: u8,
    ) -> bool {
        self.moderators.contains(&player)
    }

    fn inventory_snapshot(&self, _player: Uuid) -> Option<String> {
        self.inventory.clone()
    }
}

pub fn start() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub struct Fixture {
    pub data: Arc<Data>,
    pub clock: Arc<ManualClock>,
    pub host_rx: mpsc::UnboundedReceiver<HostCommand>,
}

pub fn fixture(config: WatchConfig, host: StubHost, webhook: Option<WebhookHandle>) -> Fixture {
    let clock = Arc::new(ManualClock::at(start()));
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let data = Arc::new(Data::new(
        config,
        Ledger::disabled(),
        webhook,
        Arc::new(host),
        host_tx,
        clock.clone(),
    ));
    Fixture {
        data,
        clock,
        host_rx,
    }
}
