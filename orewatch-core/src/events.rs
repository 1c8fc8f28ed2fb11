use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A block coordinate within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The narrow inbound interface between the host runtime and the detection
/// core. Hosts translate their native events into these; nothing else about
/// the runtime leaks in.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    BlockBroken {
        player: Uuid,
        player_name: String,
        world: String,
        block_id: String,
        pos: BlockPos,
    },
    BlockPlaced {
        player: Uuid,
        world: String,
        block_id: String,
        pos: BlockPos,
    },
    PlayerConnected {
        player: Uuid,
        player_name: String,
    },
    PlayerDisconnected {
        player: Uuid,
    },
}

/// Audio cue attached to a moderator alert.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundCue {
    pub sound_id: String,
    pub volume: f32,
    pub pitch: f32,
}

/// Work marshaled back onto the host's authoritative context, which owns
/// player-session state. Delivery must never happen from a detection worker.
#[derive(Clone, Debug)]
pub enum HostCommand {
    Alert {
        recipients: Vec<Uuid>,
        text: String,
        sound: Option<SoundCue>,
    },
}
