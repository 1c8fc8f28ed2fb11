use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use orewatch_webhook::WebhookConfig;

/// A namespaced block-type identifier (e.g. `minecraft:diamond_ore`). A bare
/// path defaults to the `minecraft` namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockTypeId(String);

impl BlockTypeId {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        let (namespace, path) = match raw.split_once(':') {
            Some((namespace, path)) => (namespace, path),
            None => ("minecraft", raw),
        };

        let namespace_ok = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(c));
        let path_ok = !path.is_empty()
            && !path.contains(':')
            && path
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_./-".contains(c));

        if !namespace_ok || !path_ok {
            anyhow::bail!("invalid block id `{raw}`");
        }

        Ok(Self(format!("{namespace}:{path}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path component, without the namespace.
    pub fn path(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for BlockTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One monitored block type as it appears in configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackedBlockConfig {
    pub block_id: String,
    pub alert_threshold: u32,
    pub time_window_minutes: u64,
    #[serde(default = "default_subsequent_threshold")]
    pub subsequent_alert_threshold: u32,
    /// 0 means tracking never auto-resets.
    #[serde(default)]
    pub reset_after_minutes: u64,
    #[serde(default = "default_alert_message")]
    pub alert_message: String,
}

fn default_subsequent_threshold() -> u32 {
    5
}

fn default_alert_message() -> String {
    "[OreWatch] {player} has mined {count} {block} in {time}!".to_owned()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub notify_permission: String,
    pub permission_level: u8,
    pub op_level: u8,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            notify_permission: "orewatch.notify".to_owned(),
            permission_level: 2,
            op_level: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub sound_id: String,
    pub base_volume: f32,
    pub base_pitch: f32,
    pub volume_multiplier_per_alert: f32,
    pub pitch_multiplier_per_alert: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            sound_id: "minecraft:block.note_block.pling".to_owned(),
            base_volume: 1.0,
            base_pitch: 1.0,
            volume_multiplier_per_alert: 1.0,
            pitch_multiplier_per_alert: 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub sound: SoundConfig,
    pub continued_alert_prefix: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound: SoundConfig::default(),
            continued_alert_prefix: "[Continued] ".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// When false, placements survive only for the lifetime of the process.
    pub durable: bool,
}

/// Top-level configuration. Loaded and hot-reloaded by the host; the core
/// only ever reads immutable snapshots of it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub general: GeneralConfig,
    pub alerts: AlertConfig,
    pub webhook: WebhookConfig,
    pub ledger: LedgerConfig,
    pub tracked_blocks: Vec<TrackedBlockConfig>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            alerts: AlertConfig::default(),
            webhook: WebhookConfig::default(),
            ledger: LedgerConfig::default(),
            tracked_blocks: default_tracked_blocks(),
        }
    }
}

fn tracked(block_id: &str, threshold: u32, window_minutes: u64, subsequent: u32) -> TrackedBlockConfig {
    TrackedBlockConfig {
        block_id: block_id.to_owned(),
        alert_threshold: threshold,
        time_window_minutes: window_minutes,
        subsequent_alert_threshold: subsequent,
        reset_after_minutes: 10,
        alert_message: default_alert_message(),
    }
}

/// Default watch list for the common valuable blocks.
pub fn default_tracked_blocks() -> Vec<TrackedBlockConfig> {
    vec![
        tracked("minecraft:diamond_ore", 10, 30, 5),
        tracked("minecraft:deepslate_diamond_ore", 10, 30, 5),
        tracked("minecraft:ancient_debris", 5, 20, 3),
        tracked("minecraft:emerald_ore", 8, 30, 4),
        tracked("minecraft:deepslate_emerald_ore", 8, 30, 4),
        tracked("minecraft:nether_gold_ore", 15, 30, 8),
        tracked("minecraft:gold_ore", 8, 30, 4),
        tracked("minecraft:deepslate_gold_ore", 8, 30, 4),
        tracked("minecraft:lapis_ore", 12, 30, 6),
        tracked("minecraft:deepslate_lapis_ore", 12, 30, 6),
        tracked("minecraft:redstone_ore", 25, 30, 15),
        tracked("minecraft:deepslate_redstone_ore", 25, 30, 15),
        tracked("minecraft:iron_ore", 35, 30, 20),
        tracked("minecraft:deepslate_iron_ore", 35, 30, 20),
        tracked("minecraft:copper_ore", 40, 30, 20),
        tracked("minecraft:deepslate_copper_ore", 40, 30, 20),
        tracked("minecraft:coal_ore", 60, 30, 30),
        tracked("minecraft:deepslate_coal_ore", 60, 30, 30),
        tracked("minecraft:nether_quartz_ore", 40, 30, 20),
        tracked("minecraft:spawner", 2, 60, 1),
        tracked("minecraft:budding_amethyst", 4, 30, 2),
        tracked("minecraft:suspicious_sand", 8, 30, 4),
        tracked("minecraft:suspicious_gravel", 8, 30, 4),
    ]
}

/// Detection parameters for one tracked block type, with durations resolved.
#[derive(Clone, Debug)]
pub struct TrackedBlock {
    pub id: BlockTypeId,
    pub initial_threshold: u32,
    pub window: Duration,
    pub subsequent_threshold: u32,
    /// Zero means tracking never auto-resets.
    pub reset_after_idle: Duration,
    pub message_template: String,
}

/// Read-only lookup from block id to detection parameters. Rebuilt wholesale
/// on config reload and swapped atomically.
#[derive(Debug, Default)]
pub struct BlockCatalog {
    blocks: HashMap<BlockTypeId, Arc<TrackedBlock>>,
}

impl BlockCatalog {
    /// Build the catalog, skipping entries with malformed block ids so one
    /// bad line never takes down the rest of the watch list.
    pub fn from_config(config: &WatchConfig) -> Self {
        let mut blocks = HashMap::new();
        for entry in &config.tracked_blocks {
            let id = match BlockTypeId::parse(&entry.block_id) {
                Ok(id) => id,
                Err(source) => {
                    warn!(?source, block_id = %entry.block_id, "skipping tracked block with invalid id");
                    continue;
                }
            };
            let block = TrackedBlock {
                id: id.clone(),
                initial_threshold: entry.alert_threshold,
                window: Duration::from_secs(entry.time_window_minutes.saturating_mul(60)),
                subsequent_threshold: entry.subsequent_alert_threshold,
                reset_after_idle: Duration::from_secs(entry.reset_after_minutes.saturating_mul(60)),
                message_template: entry.alert_message.clone(),
            };
            blocks.insert(id, Arc::new(block));
        }
        Self { blocks }
    }

    pub fn get(&self, id: &BlockTypeId) -> Option<Arc<TrackedBlock>> {
        self.blocks.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
