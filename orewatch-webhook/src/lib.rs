pub mod client;
pub mod payload;

pub use client::{WebhookConfig, WebhookService};
pub use payload::WebhookAlert;
