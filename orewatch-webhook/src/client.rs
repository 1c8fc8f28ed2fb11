//! Remote message delivery with coalescing: one webhook message per
//! (player, block type) conversation, updated in place while alerts keep
//! escalating.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::payload::{WebhookAlert, build_payload};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
/// Conversations idle for longer than this are forgotten; the next alert
/// starts a fresh remote message.
const IDLE_EXPIRY: Duration = Duration::from_secs(30 * 60);

/// Webhook section of the host configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    /// Full webhook URL, or the bare `id/token` part of a Discord webhook.
    pub url: String,
}

#[derive(Clone, Debug)]
struct CachedMessage {
    message_id: String,
    last_updated: SystemTime,
    coords: Vec<(i32, i32, i32)>,
}

enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Client for the remote message endpoint. Creation is a POST returning the
/// message id; updates PATCH that id. Both are retried a fixed number of
/// times and failures stay on this path — the in-game alert has already been
/// delivered by the time we run.
#[derive(Debug)]
pub struct WebhookService {
    http: reqwest::Client,
    url: String,
    retry_delay: Duration,
    cache: Mutex<HashMap<String, CachedMessage>>,
}

impl WebhookService {
    /// Build the service when the webhook is enabled and configured.
    pub fn from_config(config: &WebhookConfig) -> Option<Self> {
        if !config.enabled || config.url.trim().is_empty() {
            return None;
        }
        Some(Self::new(&config.url))
    }

    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: normalize_url(url),
            retry_delay: RETRY_DELAY,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Override the fixed retry delay (tests).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Deliver one alert: update the cached conversation when this is a
    /// continuation, otherwise create a new remote message.
    pub async fn notify(&self, alert: &WebhookAlert) -> anyhow::Result<()> {
        let key = format!("{}:{}", alert.player, alert.block_id);
        let cached = self.cache.lock().await.get(&key).cloned();

        match cached {
            Some(entry) if alert.consecutive > 1 => {
                let mut coords = entry.coords.clone();
                coords.push((alert.x, alert.y, alert.z));
                let payload = build_payload(alert, &coords);

                let outcome = self.update_message(&entry.message_id, &payload).await;
                let mut cache = self.cache.lock().await;
                match outcome {
                    Ok(UpdateOutcome::Updated) => {
                        if let Some(entry) = cache.get_mut(&key) {
                            entry.coords = coords;
                            entry.last_updated = alert.at;
                        }
                        Ok(())
                    }
                    Ok(UpdateOutcome::NotFound) => {
                        // The remote message is gone (deleted externally);
                        // forget it so the next alert starts over.
                        debug!(key, "webhook message no longer exists, dropping cached id");
                        cache.remove(&key);
                        Ok(())
                    }
                    Err(source) => {
                        // The coordinate stays accumulated and the idle
                        // timer refreshes even on failure; the next update
                        // carries the full list.
                        if let Some(entry) = cache.get_mut(&key) {
                            entry.coords = coords;
                            entry.last_updated = alert.at;
                        }
                        Err(source)
                    }
                }
            }
            _ => {
                let coords = vec![(alert.x, alert.y, alert.z)];
                let payload = build_payload(alert, &coords);
                let message_id = self.create_message(&payload).await?;
                debug!(key, message_id, "webhook message created");
                self.cache.lock().await.insert(
                    key,
                    CachedMessage {
                        message_id,
                        last_updated: alert.at,
                        coords,
                    },
                );
                Ok(())
            }
        }
    }

    /// Purge conversations idle for longer than the expiry. Returns the
    /// number of entries removed.
    pub async fn sweep_idle(&self, now: SystemTime) -> usize {
        let mut cache = self.cache.lock().await;
        let before = cache.len();
        cache.retain(|_, entry| {
            now.duration_since(entry.last_updated)
                .map_or(true, |idle| idle <= IDLE_EXPIRY)
        });
        before - cache.len()
    }

    async fn create_message(&self, payload: &Value) -> anyhow::Result<String> {
        let url = format!("{}?wait=true", self.url);
        let mut last_error = anyhow::anyhow!("webhook create not attempted");

        for attempt in 1..=MAX_ATTEMPTS {
            match self.http.post(&url).json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<Value>().await {
                        Ok(body) => {
                            if let Some(id) = body.get("id").and_then(Value::as_str) {
                                return Ok(id.to_owned());
                            }
                            last_error =
                                anyhow::anyhow!("webhook create response missing message id");
                        }
                        Err(e) => {
                            last_error =
                                anyhow::anyhow!("failed to parse webhook create response: {e}");
                        }
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_error =
                        anyhow::anyhow!("webhook create failed with status {status}: {body}");
                }
                Err(e) => {
                    last_error = anyhow::anyhow!("webhook create request failed: {e}");
                }
            }
            warn!(attempt, error = %last_error, "webhook create attempt failed");
            if attempt < MAX_ATTEMPTS {
                sleep(self.retry_delay).await;
            }
        }

        Err(last_error)
    }

    async fn update_message(
        &self,
        message_id: &str,
        payload: &Value,
    ) -> anyhow::Result<UpdateOutcome> {
        let url = format!("{}/messages/{}", self.url, message_id);
        let mut last_error = anyhow::anyhow!("webhook update not attempted");

        for attempt in 1..=MAX_ATTEMPTS {
            match self.http.patch(&url).json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(UpdateOutcome::Updated);
                }
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Ok(UpdateOutcome::NotFound);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_error =
                        anyhow::anyhow!("webhook update failed with status {status}: {body}");
                }
                Err(e) => {
                    last_error = anyhow::anyhow!("webhook update request failed: {e}");
                }
            }
            warn!(attempt, message_id, error = %last_error, "webhook update attempt failed");
            if attempt < MAX_ATTEMPTS {
                sleep(self.retry_delay).await;
            }
        }

        Err(last_error)
    }
}

fn normalize_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://discord.com/api/webhooks/{raw}")
    }
}
