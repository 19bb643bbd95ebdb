//! Per-session command and query surface
//!
//! Session wraps a network capability and enforces every precondition
//! before an action reaches the protocol layer: the target channel must
//! be one we are on, a named user must actually be present, a join must
//! not duplicate an existing membership. Queries answer from the
//! protocol layer's state view.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::CommandError;
use crate::network::{ChannelMode, Network, Privilege, SessionId};
use crate::path::BusPath;

/// Delay between retries while channel mode information is pending.
const MODE_RETRY_DELAY: Duration = Duration::from_millis(10);

enum SendKind {
    Message,
    Action,
    Notice,
}

/// One managed connection to a remote network
pub struct Session {
    name: String,
    path: BusPath,
    network: Arc<dyn Network>,
    initial_modes: Option<String>,
}

impl Session {
    pub fn new(
        name: impl Into<String>,
        path: BusPath,
        network: Arc<dyn Network>,
        initial_modes: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            network,
            initial_modes,
        }
    }

    /// Human-chosen session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus path this session's surface is published under
    pub fn path(&self) -> &BusPath {
        &self.path
    }

    /// Identifier assigned by the protocol capability
    pub fn id(&self) -> SessionId {
        self.network.id()
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// User modes to apply once the session connects
    pub fn initial_modes(&self) -> Option<&str> {
        self.initial_modes.as_deref()
    }

    fn resolve_channel(&self, channel: &str) -> Result<(), CommandError> {
        if self.network.has_channel(channel) {
            Ok(())
        } else {
            Err(CommandError::NotOnChannel(channel.to_string()))
        }
    }

    /// Channel check first, then membership; the caller sees
    /// `NotOnChannel` for an unknown channel even if the user is also
    /// absent.
    fn resolve_member(&self, channel: &str, user: &str) -> Result<(), CommandError> {
        let members = self
            .network
            .channel_members(channel)
            .ok_or_else(|| CommandError::NotOnChannel(channel.to_string()))?;

        if members.iter().any(|m| m == user) {
            Ok(())
        } else {
            Err(CommandError::UserNotOnChannel {
                user: user.to_string(),
                channel: channel.to_string(),
            })
        }
    }

    /// Whether `dest` names a broadcast (channel) target. When the
    /// server has not reported its prefix set we assume it does.
    fn is_broadcast_target(&self, dest: &str) -> bool {
        match self.network.broadcast_prefixes() {
            None => true,
            Some(prefixes) => dest
                .chars()
                .next()
                .is_some_and(|first| prefixes.contains(first)),
        }
    }

    async fn send_to(&self, dest: &str, text: &str, kind: SendKind) -> Result<(), CommandError> {
        if self.is_broadcast_target(dest) {
            self.resolve_channel(dest)?;
        }
        match kind {
            SendKind::Message => self.network.send_message(dest, text).await,
            SendKind::Action => self.network.send_action(dest, text).await,
            SendKind::Notice => self.network.send_notice(dest, text).await,
        }
        Ok(())
    }

    // ==================== Commands ====================

    pub async fn join_channel(
        &self,
        channel: &str,
        key: Option<&str>,
    ) -> Result<(), CommandError> {
        if self.network.has_channel(channel) {
            return Err(CommandError::AlreadyOnChannel(channel.to_string()));
        }
        self.network.join(channel, key).await;
        Ok(())
    }

    pub async fn part_channel(
        &self,
        channel: &str,
        message: Option<&str>,
    ) -> Result<(), CommandError> {
        self.resolve_channel(channel)?;
        self.network.part(channel, message).await;
        Ok(())
    }

    pub async fn send_message(&self, dest: &str, text: &str) -> Result<(), CommandError> {
        self.send_to(dest, text, SendKind::Message).await
    }

    pub async fn send_action(&self, dest: &str, text: &str) -> Result<(), CommandError> {
        self.send_to(dest, text, SendKind::Action).await
    }

    pub async fn send_notice(&self, dest: &str, text: &str) -> Result<(), CommandError> {
        self.send_to(dest, text, SendKind::Notice).await
    }

    pub async fn kick(
        &self,
        channel: &str,
        user: &str,
        reason: Option<&str>,
    ) -> Result<(), CommandError> {
        self.resolve_member(channel, user)?;
        self.network.kick(channel, user, reason).await;
        Ok(())
    }

    pub async fn change_mode(&self, target: &str, mode: &str) -> Result<(), CommandError> {
        self.resolve_channel(target)?;
        self.network.set_mode(target, mode).await;
        Ok(())
    }

    pub async fn change_topic(&self, target: &str, topic: &str) -> Result<(), CommandError> {
        self.resolve_channel(target)?;
        self.network.set_topic(target, topic).await;
        Ok(())
    }

    pub async fn quit(&self, message: Option<&str>) {
        self.network.quit(message).await;
    }

    // ==================== Queries ====================

    pub fn nick(&self) -> String {
        self.network.nick()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.network.channels()
    }

    pub fn channel_members(&self, channel: &str) -> Result<Vec<String>, CommandError> {
        self.network
            .channel_members(channel)
            .ok_or_else(|| CommandError::NotOnChannel(channel.to_string()))
    }

    /// Mode of `channel`. Joins race against mode propagation in the
    /// protocol layer, so a pending mode is retried internally rather
    /// than surfaced to the caller.
    pub async fn channel_mode(&self, channel: &str) -> Result<String, CommandError> {
        loop {
            match self.network.channel_mode(channel) {
                None => return Err(CommandError::NotOnChannel(channel.to_string())),
                Some(ChannelMode::Known(mode)) => return Ok(mode),
                Some(ChannelMode::Pending) => sleep(MODE_RETRY_DELAY).await,
            }
        }
    }

    pub fn is_member(&self, channel: &str, user: &str) -> Result<bool, CommandError> {
        let members = self
            .network
            .channel_members(channel)
            .ok_or_else(|| CommandError::NotOnChannel(channel.to_string()))?;
        Ok(members.iter().any(|m| m == user))
    }

    /// True if `user` holds exactly `tier` on `channel`
    pub fn has_privilege(
        &self,
        channel: &str,
        user: &str,
        tier: Privilege,
    ) -> Result<bool, CommandError> {
        self.resolve_member(channel, user)?;
        Ok(self.network.member_has(channel, user, tier))
    }

    /// True if `user` is half-op or above, i.e. holds neither the plain
    /// nor the voiced tier
    pub fn is_privileged(&self, channel: &str, user: &str) -> Result<bool, CommandError> {
        let regular = self.has_privilege(channel, user, Privilege::Regular)?;
        let voiced = self.has_privilege(channel, user, Privilege::Voiced)?;
        Ok(!regular && !voiced)
    }
}
