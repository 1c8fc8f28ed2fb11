//! JSON-lines event feed and the admin commands interleaved with it.
//!
//! Each stdin line is either a wire event (one JSON object) or, when it
//! starts with the command prefix, an operator command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use orewatch_core::Data;
use orewatch_core::config::WatchConfig;
use orewatch_core::events::{BlockPos, InboundEvent};
use orewatch_detect::workers::DetectionPool;
use orewatch_utils::COMMAND_PREFIX;

use crate::session::LocalHost;

/// One line of the inbound feed.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WireEvent {
    BlockBroken {
        player: Uuid,
        world: String,
        block_id: String,
        x: i32,
        y: i32,
        z: i32,
    },
    BlockPlaced {
        player: Uuid,
        world: String,
        block_id: String,
        x: i32,
        y: i32,
        z: i32,
    },
    PlayerConnected {
        player: Uuid,
        name: String,
        #[serde(default)]
        moderator: bool,
        #[serde(default)]
        inventory: Vec<(String, u32)>,
    },
    PlayerDisconnected {
        player: Uuid,
    },
}

/// Load the configuration file, falling back to built-in defaults when it
/// does not exist. Malformed TOML is an error, not a silent default.
pub fn load_config(path: &Path) -> anyhow::Result<WatchConfig> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(toml::from_str(&raw)?),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file found, using built-in defaults");
            Ok(WatchConfig::default())
        }
        Err(source) => Err(source.into()),
    }
}

pub struct Feed {
    pub data: Arc<Data>,
    pub host: Arc<LocalHost>,
    pub config_path: PathBuf,
}

impl Feed {
    /// Consume stdin until EOF, submitting events to the detection pool.
    pub async fn run(&self, pool: &DetectionPool) -> anyhow::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with(COMMAND_PREFIX) {
                self.handle_command(line).await;
                continue;
            }
            match serde_json::from_str::<WireEvent>(line) {
                Ok(event) => pool.submit(self.apply(event)),
                Err(source) => warn!(%source, "unparseable feed line, skipping"),
            }
        }
        Ok(())
    }

    /// Update the session registry and translate a wire event into the
    /// engine's inbound form. Registry updates happen here, synchronously,
    /// so name lookups are ready before the event reaches a worker.
    pub fn apply(&self, event: WireEvent) -> InboundEvent {
        match event {
            WireEvent::BlockBroken {
                player,
                world,
                block_id,
                x,
                y,
                z,
            } => InboundEvent::BlockBroken {
                player,
                player_name: self
                    .host
                    .player_name(&player)
                    .unwrap_or_else(|| player.to_string()),
                world,
                block_id,
                pos: BlockPos::new(x, y, z),
            },
            WireEvent::BlockPlaced {
                player,
                world,
                block_id,
                x,
                y,
                z,
            } => InboundEvent::BlockPlaced {
                player,
                world,
                block_id,
                pos: BlockPos::new(x, y, z),
            },
            WireEvent::PlayerConnected {
                player,
                name,
                moderator,
                inventory,
            } => {
                self.host.connect(player, &name, moderator, inventory);
                InboundEvent::PlayerConnected {
                    player,
                    player_name: name,
                }
            }
            WireEvent::PlayerDisconnected { player } => {
                self.host.disconnect(&player);
                InboundEvent::PlayerDisconnected { player }
            }
        }
    }

    async fn handle_command(&self, line: &str) {
        let mut parts = line[COMMAND_PREFIX.len_utf8()..].split_whitespace();
        match parts.next() {
            Some("reload") => match load_config(&self.config_path) {
                Ok(config) => {
                    let tracked = self.data.swap_config(config).await;
                    info!(tracked, "configuration reloaded");
                }
                Err(source) => {
                    error!(?source, path = %self.config_path.display(), "reload failed, keeping the previous configuration");
                }
            },
            Some("status") => {
                info!(
                    players_tracked = self.data.tracker.player_count().await,
                    tracked_blocks = self.data.catalog().await.len(),
                    webhook_enabled = self.data.webhook.is_some(),
                    ledger_durable = self.data.ledger.durable_enabled(),
                    "status"
                );
            }
            Some("sync") => match self.data.ledger.flush().await {
                Ok(written) => info!(written, "ledger synced to durable storage"),
                Err(source) => error!(?source, "ledger sync failed"),
            },
            Some("inv") => match parts.next().map(Uuid::parse_str) {
                Some(Ok(player)) => match self.data.host.inventory_snapshot(player) {
                    Some(snapshot) => info!(player = %player, "inventory:\n{snapshot}"),
                    None => info!(player = %player, "no inventory available"),
                },
                _ => warn!("usage: {COMMAND_PREFIX}inv <player-uuid>"),
            },
            other => {
                warn!(command = ?other, "unknown command");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Feed, WireEvent, load_config};
    use crate::session::LocalHost;
    use orewatch_core::clock::SystemClock;
    use orewatch_core::events::InboundEvent;
    use orewatch_core::{Data, config::WatchConfig};
    use orewatch_ledger::Ledger;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn feed() -> Feed {
        let host = Arc::new(LocalHost::new());
        let (host_tx, _host_rx) = mpsc::unbounded_channel();
        let data = Arc::new(Data::new(
            WatchConfig::default(),
            Ledger::disabled(),
            None,
            host.clone(),
            host_tx,
            Arc::new(SystemClock),
        ));
        Feed {
            data,
            host,
            config_path: PathBuf::from("does-not-exist.toml"),
        }
    }

    #[test]
    fn wire_events_parse() {
        let player = Uuid::new_v4();
        let line = format!(
            r#"{{"event":"block_broken","player":"{player}","world":"overworld","block_id":"minecraft:diamond_ore","x":1,"y":-58,"z":7}}"#
        );
        let event: WireEvent = serde_json::from_str(&line).unwrap();
        let WireEvent::BlockBroken { block_id, x, .. } = event else {
            panic!("wrong variant");
        };
        assert_eq!(block_id, "minecraft:diamond_ore");
        assert_eq!(x, 1);

        assert!(serde_json::from_str::<WireEvent>("{\"event\":\"nope\"}").is_err());
    }

    #[test]
    fn connect_registers_the_session_before_translation() {
        let feed = feed();
        let player = Uuid::new_v4();

        let inbound = feed.apply(WireEvent::PlayerConnected {
            player,
            name: "Steve".to_owned(),
            moderator: false,
            inventory: Vec::new(),
        });
        assert!(matches!(inbound, InboundEvent::PlayerConnected { .. }));
        assert_eq!(feed.host.player_name(&player).as_deref(), Some("Steve"));

        // Break events resolve the name from the registry.
        let inbound = feed.apply(WireEvent::BlockBroken {
            player,
            world: "overworld".to_owned(),
            block_id: "minecraft:diamond_ore".to_owned(),
            x: 0,
            y: 0,
            z: 0,
        });
        let InboundEvent::BlockBroken { player_name, .. } = inbound else {
            panic!("wrong variant");
        };
        assert_eq!(player_name, "Steve");
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = load_config(&PathBuf::from("definitely/not/here.toml")).unwrap();
        assert_eq!(config.general.notify_permission, "orewatch.notify");

        let bad = std::env::temp_dir().join("orewatch-bad-config-test.toml");
        std::fs::write(&bad, "tracked_blocks = \"oops\"").unwrap();
        assert!(load_config(&bad).is_err());
        let _ = std::fs::remove_file(&bad);
    }
}
