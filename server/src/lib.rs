//! Sealed Relay Broker
//!
//! Relays Slack events to self-hosted automation servers and their replies
//! back to Slack. Inbound events are sealed to the server's key before they
//! leave the broker, so the broker cannot read them; outbound content is
//! decrypted only for the duration of the Slack call it feeds.

pub mod api;
pub mod config;
pub mod relay;
pub mod slack;
pub mod store;
pub mod workspaces;
