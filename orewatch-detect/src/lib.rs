/// Periodic eviction of expired tracking and webhook state.
pub mod cleanup;
/// Moderator fan-out and webhook hand-off for firing decisions.
pub mod dispatcher;
/// Inbound event handling: provenance gate, tracker, session bookkeeping.
pub mod pipeline;
/// Bounded worker pools for detection and webhook delivery.
pub mod workers;

#[cfg(test)]
pub(crate) mod testutil;
