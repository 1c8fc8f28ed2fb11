//! Bounded worker pools. Detection events are sharded by player onto
//! drop-oldest queues, one per worker, so a burst of host events can never
//! wedge the server and one player's events stay in delivery order; webhook
//! deliveries run on their own small pool because each one may block on
//! network retries.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use orewatch_core::Data;
use orewatch_core::events::InboundEvent;
use orewatch_webhook::{WebhookAlert, WebhookService};

use crate::pipeline::handle_event;

pub const DETECTION_QUEUE_CAPACITY: usize = 1024;
pub const DETECTION_WORKERS: usize = 2;
pub const WEBHOOK_QUEUE_CAPACITY: usize = 64;
pub const WEBHOOK_WORKERS: usize = 2;

/// Bounded event queue. When full, the oldest pending event is discarded;
/// losing a stale break is cheaper than stalling the host's event hooks.
#[derive(Debug)]
struct DetectionQueue {
    inner: std::sync::Mutex<VecDeque<InboundEvent>>,
    notify: Notify,
    capacity: usize,
    draining: AtomicBool,
}

impl DetectionQueue {
    fn new(capacity: usize) -> Self {
        Self {
            inner: std::sync::Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            notify: Notify::new(),
            capacity,
            draining: AtomicBool::new(false),
        }
    }

    fn push(&self, event: InboundEvent) {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.capacity {
            queue.pop_front();
            warn!(capacity = self.capacity, "detection queue full, dropped oldest event");
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<InboundEvent> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

/// Handle to the running detection workers.
pub struct DetectionPool {
    queues: Vec<Arc<DetectionQueue>>,
    workers: Vec<JoinHandle<()>>,
}

impl DetectionPool {
    /// Submit a host event for asynchronous processing. Never blocks.
    /// Events are sharded by player, so one player's events are handled in
    /// submission order even with several workers.
    pub fn submit(&self, event: InboundEvent) {
        let shard = shard_for(event_player(&event), self.queues.len());
        self.queues[shard].push(event);
    }

    /// Stop accepting work and drain what is queued, aborting workers that
    /// outlive the grace period.
    pub async fn shutdown(self, grace: Duration) {
        for queue in &self.queues {
            queue.draining.store(true, Ordering::SeqCst);
            queue.notify.notify_waiters();
        }
        join_with_grace(self.workers, grace).await;
        debug!("detection pool stopped");
    }
}

/// Spawn the detection worker pool, one drop-oldest queue per worker.
pub fn spawn_detection_pool(data: Arc<Data>, workers: usize, capacity: usize) -> DetectionPool {
    let workers = workers.max(1);
    let shard_capacity = (capacity / workers).max(1);
    let queues: Vec<_> = (0..workers)
        .map(|_| Arc::new(DetectionQueue::new(shard_capacity)))
        .collect();
    let workers = queues
        .iter()
        .enumerate()
        .map(|(worker, queue)| {
            let data = data.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                debug!(worker, "detection worker started");
                loop {
                    if let Some(event) = queue.pop() {
                        handle_event(&data, event).await;
                        continue;
                    }
                    if queue.draining.load(Ordering::SeqCst) {
                        break;
                    }
                    queue.notify.notified().await;
                }
                debug!(worker, "detection worker drained");
            })
        })
        .collect();
    DetectionPool { queues, workers }
}

fn event_player(event: &InboundEvent) -> Uuid {
    match event {
        InboundEvent::BlockBroken { player, .. }
        | InboundEvent::BlockPlaced { player, .. }
        | InboundEvent::PlayerConnected { player, .. }
        | InboundEvent::PlayerDisconnected { player } => *player,
    }
}

fn shard_for(player: Uuid, shards: usize) -> usize {
    (player.as_u128() % shards as u128) as usize
}

/// Handle to the running webhook delivery workers.
pub struct WebhookPool {
    workers: Vec<JoinHandle<()>>,
    cancel: watch::Sender<bool>,
}

impl WebhookPool {
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.cancel.send(true);
        join_with_grace(self.workers, grace).await;
        debug!("webhook pool stopped");
    }
}

/// Spawn workers that drain the webhook queue. Deliveries block on retries,
/// so a couple of workers keep one slow conversation from starving the rest.
pub fn spawn_webhook_pool(
    service: Arc<WebhookService>,
    rx: mpsc::Receiver<WebhookAlert>,
    workers: usize,
) -> WebhookPool {
    let rx = Arc::new(Mutex::new(rx));
    let (cancel, cancel_rx) = watch::channel(false);
    let workers = (0..workers.max(1))
        .map(|worker| {
            let service = service.clone();
            let rx = rx.clone();
            let mut cancel_rx = cancel_rx.clone();
            tokio::spawn(async move {
                loop {
                    let alert = tokio::select! {
                        alert = async { rx.lock().await.recv().await } => alert,
                        _ = cancel_rx.changed() => break,
                    };
                    let Some(alert) = alert else { break };
                    if let Err(source) = service.notify(&alert).await {
                        error!(?source, worker, player = %alert.player_name, "webhook delivery failed");
                    }
                }
            })
        })
        .collect();
    WebhookPool { workers, cancel }
}

async fn join_with_grace(workers: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    for mut worker in workers {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if tokio::time::timeout(remaining, &mut worker).await.is_err() {
            worker.abort();
        }
    }
}
