mod feed;
mod session;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use orewatch_core::clock::SystemClock;
use orewatch_core::events::HostCommand;
use orewatch_core::{Data, WebhookHandle};
use orewatch_detect::cleanup::{CLEANUP_PERIOD, spawn_cleanup};
use orewatch_detect::workers::{
    DETECTION_QUEUE_CAPACITY, DETECTION_WORKERS, WEBHOOK_QUEUE_CAPACITY, WEBHOOK_WORKERS,
    spawn_detection_pool, spawn_webhook_pool,
};
use orewatch_ledger::{DurableBackend, Ledger};
use orewatch_webhook::WebhookService;

use crate::session::LocalHost;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let max_level = if env_bool("OREWATCH_DEBUG", false) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(move |metadata| {
        let target = metadata.target();

        if *metadata.level() > max_level {
            return false;
        }

        !(target.starts_with("hyper_util") || target.starts_with("reqwest::connect"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    // Load the .env file
    dotenvy::dotenv().ok();

    let config_path = PathBuf::from(
        env::var("OREWATCH_CONFIG").unwrap_or_else(|_| "orewatch.toml".to_string()),
    );
    let config = feed::load_config(&config_path)?;

    let ledger = if config.ledger.durable {
        info!("Placement ledger durable backend enabled.");
        Ledger::with_backend(DurableBackend::memory())
    } else {
        info!("Placement ledger running in-memory only (set ledger.durable to enable the backend).");
        Ledger::disabled()
    };

    let webhook = match WebhookService::from_config(&config.webhook) {
        Some(service) => {
            info!("Webhook notifications enabled.");
            let (tx, rx) = mpsc::channel(WEBHOOK_QUEUE_CAPACITY);
            let service = Arc::new(service);
            let pool = spawn_webhook_pool(service.clone(), rx, WEBHOOK_WORKERS);
            Some((WebhookHandle { service, tx }, pool))
        }
        None => {
            info!("Webhook notifications disabled (missing/empty url or webhook.enabled=false).");
            None
        }
    };
    let (webhook_handle, webhook_pool) = match webhook {
        Some((handle, pool)) => (Some(handle), Some(pool)),
        None => (None, None),
    };

    let host = Arc::new(LocalHost::new());
    let (host_tx, mut host_rx) = mpsc::unbounded_channel();
    let data = Arc::new(Data::new(
        config,
        ledger,
        webhook_handle,
        host.clone(),
        host_tx,
        Arc::new(SystemClock),
    ));
    info!(
        tracked = data.catalog().await.len(),
        "OreWatch is up and watching."
    );

    let pool = spawn_detection_pool(data.clone(), DETECTION_WORKERS, DETECTION_QUEUE_CAPACITY);
    let cleanup = spawn_cleanup(data.clone(), CLEANUP_PERIOD);

    // Alert delivery stands in for the server's authoritative context: the
    // single consumer of host commands, so session-facing work is serialized.
    let delivery = tokio::spawn(deliver_alerts(host.clone(), host_rx));

    let feed = feed::Feed {
        data: data.clone(),
        host,
        config_path,
    };

    tokio::select! {
        result = feed.run(&pool) => {
            result?;
            info!("Event feed closed.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    cleanup.stop().await;
    pool.shutdown(SHUTDOWN_GRACE).await;
    if let Some(webhook_pool) = webhook_pool {
        webhook_pool.shutdown(SHUTDOWN_GRACE).await;
    }

    match data.ledger.flush().await {
        Ok(written) => debug!(written, "final ledger flush"),
        Err(source) => error!(?source, "final ledger flush failed"),
    }

    // Dropping the last context handles closes the host command channel;
    // delivery drains what the drained pools produced, then exits.
    drop(feed);
    drop(data);
    let _ = delivery.await;

    info!("OreWatch stopped.");
    Ok(())
}

/// Consume host commands until the channel closes. Returns the number of
/// alerts delivered.
async fn deliver_alerts(
    host: Arc<LocalHost>,
    mut rx: mpsc::UnboundedReceiver<HostCommand>,
) -> usize {
    let mut delivered = 0;
    while let Some(command) = rx.recv().await {
        match command {
            HostCommand::Alert {
                recipients,
                text,
                sound,
            } => {
                if recipients.is_empty() {
                    debug!("alert fired with no moderators online");
                }
                for recipient in &recipients {
                    let name = host
                        .player_name(recipient)
                        .unwrap_or_else(|| recipient.to_string());
                    info!(to = %name, "{text}");
                }
                if let Some(cue) = sound {
                    debug!(
                        sound = %cue.sound_id,
                        volume = cue.volume,
                        pitch = cue.pitch,
                        "alert cue"
                    );
                }
                delivered += 1;
            }
        }
    }
    delivered
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
