//! Network trait and related types
//!
//! The protocol capability boundary: an implementation owns the wire
//! connection (connecting, parsing, keep-alive, reconnection) and exposes
//! a state view plus raw actions. All precondition logic lives above this
//! seam, in [`crate::session::Session`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use super::event::NetworkEvent;
use crate::config::NetworkConfig;

/// Opaque session identifier assigned by the protocol capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Membership tier of a user on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Regular,
    Voiced,
    HalfOp,
    Op,
    SuperOp,
    Owner,
}

/// A channel mode as currently known to the protocol layer
///
/// Mode information arrives asynchronously after a join; `Pending` means
/// the layer has not been told it yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMode {
    Known(String),
    Pending,
}

/// Errors from establishing a network session
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("connection setup failed: {0}")]
    Setup(String),
}

/// One live connection to a remote network
///
/// State-view methods answer from the protocol layer's local picture of
/// the network and never block; action methods enqueue protocol traffic
/// and return once it is handed to the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Identifier assigned at creation
    fn id(&self) -> SessionId;

    /// Our current nickname
    fn nick(&self) -> String;

    /// Subscribe to protocol events for this session
    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent>;

    /// Names of channels we are currently on
    fn channels(&self) -> Vec<String>;

    /// True if we are currently on `channel`
    fn has_channel(&self, channel: &str) -> bool;

    /// Nicks present on `channel`, or `None` if we are not on it
    fn channel_members(&self, channel: &str) -> Option<Vec<String>>;

    /// Mode of `channel`, or `None` if we are not on it
    fn channel_mode(&self, channel: &str) -> Option<ChannelMode>;

    /// True if `nick` holds exactly `tier` on `channel`
    fn member_has(&self, channel: &str, nick: &str, tier: Privilege) -> bool;

    /// Prefix characters marking broadcast (channel) targets, as reported
    /// by the remote server; `None` if not (yet) reported
    fn broadcast_prefixes(&self) -> Option<String>;

    async fn join(&self, channel: &str, key: Option<&str>);

    async fn part(&self, channel: &str, message: Option<&str>);

    async fn send_message(&self, target: &str, text: &str);

    async fn send_action(&self, target: &str, text: &str);

    async fn send_notice(&self, target: &str, text: &str);

    async fn kick(&self, channel: &str, nick: &str, reason: Option<&str>);

    async fn set_mode(&self, channel: &str, mode: &str);

    async fn set_topic(&self, channel: &str, topic: &str);

    /// Set modes on our own nick
    async fn set_user_modes(&self, modes: &str);

    /// Request a graceful disconnect from the remote network
    async fn quit(&self, message: Option<&str>);

    /// Stop the worker from reconnecting after the next disconnect
    fn disable_reconnect(&self);
}

/// Factory for network sessions
///
/// Enables dependency injection of protocol implementations.
#[async_trait]
pub trait NetworkFactory: Send + Sync {
    /// Establish a session for `name` using `config`
    async fn connect(
        &self,
        name: &str,
        config: &NetworkConfig,
    ) -> Result<Arc<dyn Network>, NetworkError>;
}
