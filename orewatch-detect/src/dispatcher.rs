//! Fan-out of a firing decision: the in-game moderator alert and the
//! best-effort webhook copy.

use tracing::{error, warn};

use orewatch_core::Data;
use orewatch_core::config::{SoundConfig, TrackedBlock};
use orewatch_core::events::{HostCommand, SoundCue};
use orewatch_core::tracker::AlertEvent;
use orewatch_utils::formatting::{format_block_name, render_alert_template};
use orewatch_webhook::WebhookAlert;

/// Deliver one alert. The moderator path is authoritative and goes through
/// the host command channel; the webhook copy is queued fire-and-forget so
/// network I/O never holds up detection.
pub async fn dispatch_alert(data: &Data, block: &TrackedBlock, alert: &AlertEvent) {
    let config = data.config().await;
    let block_name = format_block_name(alert.block.as_str());

    // 1. Render the alert line, marking escalations.
    let mut text = render_alert_template(
        &block.message_template,
        &alert.player_name,
        alert.count,
        alert.window,
        &block_name,
        alert.pos.x,
        alert.pos.y,
        alert.pos.z,
    );
    if alert.consecutive > 1 {
        text = format!("{}{}", config.alerts.continued_alert_prefix, text);
    }

    // 2. Audio cue, escalating with consecutive alerts.
    let sound = build_sound_cue(&config.alerts.sound, alert.consecutive);

    // 3. Resolve recipients once and hand delivery to the authoritative
    //    context.
    let recipients = data.permissions.recipients().await;
    let command = HostCommand::Alert {
        recipients,
        text,
        sound,
    };
    if data.host_tx.send(command).is_err() {
        error!("host command channel closed, dropping moderator alert");
    }

    // 4. Queue the webhook copy.
    if let Some(webhook) = &data.webhook {
        let payload = WebhookAlert {
            player: alert.player,
            player_name: alert.player_name.clone(),
            block_id: alert.block.as_str().to_owned(),
            block_name,
            count: alert.count,
            window: alert.window,
            consecutive: alert.consecutive,
            x: alert.pos.x,
            y: alert.pos.y,
            z: alert.pos.z,
            inventory: data.host.inventory_snapshot(alert.player),
            at: data.clock.now(),
        };
        if let Err(source) = webhook.tx.try_send(payload) {
            warn!(%source, "webhook queue full or closed, dropping alert copy");
        }
    }
}

/// Volume and pitch multiply once per escalation step; the first alert of a
/// cycle plays the base values.
fn build_sound_cue(sound: &SoundConfig, consecutive: u32) -> Option<SoundCue> {
    if !valid_sound_id(&sound.sound_id) {
        warn!(sound_id = %sound.sound_id, "invalid sound id, alert plays silently");
        return None;
    }
    let steps = consecutive.saturating_sub(1) as i32;
    Some(SoundCue {
        sound_id: sound.sound_id.clone(),
        volume: sound.base_volume * sound.volume_multiplier_per_alert.powi(steps),
        pitch: sound.base_pitch * sound.pitch_multiplier_per_alert.powi(steps),
    })
}

fn valid_sound_id(raw: &str) -> bool {
    let (namespace, path) = raw.split_once(':').unwrap_or(("minecraft", raw));
    let namespace_ok = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(c));
    let path_ok = !path.is_empty()
        && !path.contains(':')
        && path
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_./-".contains(c));
    namespace_ok && path_ok
}
