use std::time::Duration;

/// Substitute the alert template placeholders
/// (`{player} {count} {time} {block} {x} {y} {z}`).
pub fn render_alert_template(
    template: &str,
    player_name: &str,
    count: u32,
    window: Duration,
    block_name: &str,
    x: i32,
    y: i32,
    z: i32,
) -> String {
    template
        .replace("{player}", player_name)
        .replace("{count}", &count.to_string())
        .replace("{time}", &format_window(window))
        .replace("{block}", block_name)
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
        .replace("{z}", &z.to_string())
}

/// Convert a block id path to a user-facing name
/// (e.g. `minecraft:deepslate_diamond_ore` -> "Deepslate Diamond Ore").
pub fn format_block_name(block_id: &str) -> String {
    let path = block_id.rsplit(':').next().unwrap_or(block_id);
    path.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a detection window for alert text (e.g. "30 minutes", "90 seconds").
pub fn format_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".to_owned()
        } else {
            format!("{} minutes", minutes)
        }
    } else if secs == 1 {
        "1 second".to_owned()
    } else {
        format!("{} seconds", secs)
    }
}

/// Format an inventory snapshot for display: up to `max_items` stacks, one
/// per line, with "x N" counts and a truncation marker.
pub fn format_inventory(items: &[(String, u32)], max_items: usize) -> String {
    if items.is_empty() {
        return "No items found".to_owned();
    }

    let mut lines = Vec::new();
    for (name, count) in items.iter().take(max_items) {
        if *count > 1 {
            lines.push(format!("{} x{}", name, count));
        } else {
            lines.push(name.clone());
        }
    }
    if items.len() > max_items {
        lines.push("...(more items not shown)".to_owned());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{format_block_name, format_inventory, format_window, render_alert_template};
    use std::time::Duration;

    #[test]
    fn renders_all_placeholders() {
        let rendered = render_alert_template(
            "{player} mined {count} {block} in {time} at {x},{y},{z}",
            "Steve",
            12,
            Duration::from_secs(30 * 60),
            "Diamond Ore",
            10,
            -58,
            204,
        );
        assert_eq!(rendered, "Steve mined 12 Diamond Ore in 30 minutes at 10,-58,204");
    }

    #[test]
    fn block_names_are_user_friendly() {
        assert_eq!(format_block_name("minecraft:diamond_ore"), "Diamond Ore");
        assert_eq!(
            format_block_name("minecraft:deepslate_redstone_ore"),
            "Deepslate Redstone Ore"
        );
        assert_eq!(format_block_name("spawner"), "Spawner");
    }

    #[test]
    fn window_formatting() {
        assert_eq!(format_window(Duration::from_secs(60)), "1 minute");
        assert_eq!(format_window(Duration::from_secs(1800)), "30 minutes");
        assert_eq!(format_window(Duration::from_secs(90)), "90 seconds");
        assert_eq!(format_window(Duration::from_secs(1)), "1 second");
    }

    #[test]
    fn inventory_truncates_and_counts() {
        let items: Vec<(String, u32)> = (0..12)
            .map(|i| (format!("Item{}", i), if i == 0 { 3 } else { 1 }))
            .collect();
        let text = format_inventory(&items, 10);
        assert!(text.starts_with("Item0 x3\nItem1\n"));
        assert!(text.ends_with("...(more items not shown)"));
        assert_eq!(format_inventory(&[], 10), "No items found");
    }
}
