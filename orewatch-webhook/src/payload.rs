//! Discord-webhook embed payloads for mining alerts.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use orewatch_utils::formatting::format_window;

/// Alert severity color (red).
const ALERT_COLOR: u32 = 15_158_332;

/// Everything the notifier needs to build one remote message. Produced by the
/// dispatcher; plain data so the webhook path stays decoupled from the
/// detection engine.
#[derive(Clone, Debug)]
pub struct WebhookAlert {
    pub player: Uuid,
    pub player_name: String,
    pub block_id: String,
    pub block_name: String,
    pub count: u32,
    pub window: Duration,
    pub consecutive: u32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub inventory: Option<String>,
    pub at: SystemTime,
}

/// Build the embed document for an alert, with the accumulated coordinate
/// list of the whole conversation so far.
pub(crate) fn build_payload(alert: &WebhookAlert, coords: &[(i32, i32, i32)]) -> Value {
    let at: DateTime<Utc> = alert.at.into();
    let description = format!(
        "Player {} has mined {} {} in {}!",
        alert.player_name,
        alert.count,
        alert.block_name,
        format_window(alert.window)
    );
    let continued = if alert.consecutive > 1 {
        format!("Yes (Alert #{})", alert.consecutive)
    } else {
        "No".to_owned()
    };
    let locations = coords
        .iter()
        .map(|(x, y, z)| format!("({}, {}, {})", x, y, z))
        .collect::<Vec<_>>()
        .join("\n");

    let mut fields = vec![
        json!({ "name": "Continued Alert", "value": continued, "inline": true }),
        json!({ "name": "Player UUID", "value": alert.player.to_string(), "inline": true }),
        json!({ "name": "Block ID", "value": alert.block_id, "inline": true }),
        json!({
            "name": "Detection Time",
            "value": at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            "inline": false,
        }),
        json!({ "name": "Locations", "value": locations, "inline": false }),
    ];
    if let Some(inventory) = &alert.inventory {
        fields.push(json!({
            "name": "Player Inventory",
            "value": format!("```\n{}\n```", inventory),
            "inline": false,
        }));
    }

    json!({
        "embeds": [{
            "title": "Suspicious Mining Alert",
            "description": description,
            "color": ALERT_COLOR,
            "fields": fields,
            "timestamp": at.to_rfc3339(),
            "footer": { "text": format!("OreWatch v{}", env!("CARGO_PKG_VERSION")) },
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::{WebhookAlert, build_payload};
    use std::time::{Duration, SystemTime};
    use uuid::Uuid;

    fn alert(consecutive: u32, inventory: Option<&str>) -> WebhookAlert {
        WebhookAlert {
            player: Uuid::nil(),
            player_name: "Steve".to_owned(),
            block_id: "minecraft:diamond_ore".to_owned(),
            block_name: "Diamond Ore".to_owned(),
            count: 12,
            window: Duration::from_secs(30 * 60),
            consecutive,
            x: 1,
            y: -58,
            z: 7,
            inventory: inventory.map(str::to_owned),
            at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    #[test]
    fn first_alert_payload() {
        let payload = build_payload(&alert(1, None), &[(1, -58, 7)]);
        let embed = &payload["embeds"][0];
        assert_eq!(
            embed["description"],
            "Player Steve has mined 12 Diamond Ore in 30 minutes!"
        );
        assert_eq!(embed["fields"][0]["value"], "No");
        assert_eq!(embed["fields"][4]["name"], "Locations");
        assert_eq!(embed["fields"][4]["value"], "(1, -58, 7)");
        // No inventory field when the snapshot is unobtainable.
        assert_eq!(embed["fields"].as_array().map(|f| f.len()), Some(5));
    }

    #[test]
    fn continued_alert_accumulates_locations() {
        let payload = build_payload(&alert(3, Some("Diamond x4")), &[(1, -58, 7), (2, -57, 9)]);
        let embed = &payload["embeds"][0];
        assert_eq!(embed["fields"][0]["value"], "Yes (Alert #3)");
        assert_eq!(embed["fields"][4]["value"], "(1, -58, 7)\n(2, -57, 9)");
        assert_eq!(embed["fields"][5]["value"], "```\nDiamond x4\n```");
    }
}
