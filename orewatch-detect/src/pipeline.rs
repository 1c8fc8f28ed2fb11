//! Inbound event handling: the provenance gate, window updates, and session
//! bookkeeping.

use tracing::{debug, error};
use uuid::Uuid;

use orewatch_core::Data;
use orewatch_core::config::BlockTypeId;
use orewatch_core::events::{BlockPos, InboundEvent};

use crate::dispatcher::dispatch_alert;

/// Process one host event end to end. Runs on a detection worker; nothing
/// here may touch the host's authoritative context directly.
pub async fn handle_event(data: &Data, event: InboundEvent) {
    match event {
        InboundEvent::BlockBroken {
            player,
            player_name,
            world,
            block_id,
            pos,
        } => block_broken(data, player, &player_name, &world, &block_id, pos).await,
        InboundEvent::BlockPlaced {
            player,
            world,
            block_id,
            pos,
        } => block_placed(data, player, &world, &block_id, pos).await,
        InboundEvent::PlayerConnected {
            player,
            player_name,
        } => player_connected(data, player, &player_name).await,
        InboundEvent::PlayerDisconnected { player } => player_disconnected(data, player).await,
    }
}

async fn block_broken(
    data: &Data,
    player: Uuid,
    player_name: &str,
    world: &str,
    block_id: &str,
    pos: BlockPos,
) {
    // 1. Only tracked block types go any further.
    let Ok(id) = BlockTypeId::parse(block_id) else {
        debug!(block_id, "unparseable block id from host, ignoring break");
        return;
    };
    let Some(block) = data.catalog().await.get(&id) else {
        return;
    };

    // 2. Provenance gate: player-placed blocks are never suspicious. The
    //    entry is consumed so one placement exempts exactly one break.
    match data.ledger.is_player_placed(world, pos.x, pos.y, pos.z).await {
        Ok(true) => {
            debug!(player = %player, block = %id, %pos, "break exempt, block was player-placed");
            if let Err(source) = data.ledger.forget(world, pos.x, pos.y, pos.z).await {
                error!(?source, "failed to clear consumed placement entry");
            }
            return;
        }
        Ok(false) => {}
        Err(source) => {
            // Counting the break anyway could fire a false alert, so the
            // event is skipped outright.
            error!(?source, block = %id, "placement lookup failed, skipping break");
            return;
        }
    }

    // 3. Window arithmetic and the firing decision.
    let now = data.clock.now();
    let Some(alert) = data
        .tracker
        .record_break(player, player_name, &block, pos, now)
        .await
    else {
        return;
    };
    debug!(
        player = %alert.player_name,
        block = %alert.block,
        count = alert.count,
        consecutive = alert.consecutive,
        "mining alert fired"
    );

    // 4. Fan out to moderators and the webhook path.
    dispatch_alert(data, &block, &alert).await;
}

async fn block_placed(data: &Data, player: Uuid, world: &str, block_id: &str, pos: BlockPos) {
    let Ok(id) = BlockTypeId::parse(block_id) else {
        return;
    };
    // Untracked placements are not worth remembering.
    if data.catalog().await.get(&id).is_none() {
        return;
    }
    if let Err(source) = data
        .ledger
        .record_placement(world, pos.x, pos.y, pos.z, id.as_str())
        .await
    {
        error!(?source, player = %player, block = %id, "failed to record placement");
    }
}

async fn player_connected(data: &Data, player: Uuid, player_name: &str) {
    let config = data.config().await;
    let receives_alerts = data.host.has_permission(
        player,
        &config.general.notify_permission,
        config.general.permission_level,
        config.general.op_level,
    );
    data.permissions.set(player, receives_alerts).await;
    debug!(player = %player, name = player_name, receives_alerts, "permission cached on connect");
}

async fn player_disconnected(data: &Data, player: Uuid) {
    data.tracker.remove_player(&player).await;
    data.permissions.remove(&player).await;
    debug!(player = %player, "session state dropped on disconnect");
}
