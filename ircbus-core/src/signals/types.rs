//! Outbound notification types
//!
//! Every protocol event produces exactly one signal, stamped when the
//! callback fires. Manager-scoped signals (`loaded`, `stopped`) are
//! emitted at the manager's base path; everything else at the session's
//! own path.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::network::NetworkEvent;

/// Milliseconds since the Unix epoch at capture time.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Signals published on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// A session finished loading
    Loaded { session: String },

    /// A session stopped; `crashed` distinguishes an abnormal worker
    /// exit from a requested disconnect
    Stopped { session: String, crashed: bool },

    Connected {
        ts: u64,
    },
    Disconnected {
        ts: u64,
    },
    Message {
        ts: u64,
        source: String,
        target: Option<String>,
        text: String,
    },
    Action {
        ts: u64,
        source: String,
        target: Option<String>,
        text: String,
    },
    Notice {
        ts: u64,
        source: String,
        target: Option<String>,
        text: String,
    },
    Joined {
        ts: u64,
        user: String,
        channel: String,
    },
    Parted {
        ts: u64,
        user: String,
        channel: String,
        reason: Option<String>,
    },
    Quit {
        ts: u64,
        user: String,
        reason: Option<String>,
        channels: Vec<String>,
    },
    Kicked {
        ts: u64,
        source: String,
        channel: String,
        target: String,
        reason: Option<String>,
    },
    NickChanged {
        ts: u64,
        old: String,
        new: String,
        channels: Vec<String>,
    },
    ModeChanged {
        ts: u64,
        source: String,
        channel: String,
        mode: String,
    },
    TopicChanged {
        ts: u64,
        source: String,
        channel: String,
        topic: String,
        previous: Option<String>,
        previous_set_at: u64,
    },
    Invited {
        ts: u64,
        source: String,
        channel: String,
    },
    Addressed {
        ts: u64,
        source: String,
        channel: String,
        text: String,
    },
}

impl Signal {
    /// Translate a protocol event into its signal, stamped with `ts`.
    ///
    /// Returns `None` for `Terminated`, which is lifecycle bookkeeping
    /// rather than a session signal.
    pub fn from_event(event: NetworkEvent, ts: u64) -> Option<Self> {
        let signal = match event {
            NetworkEvent::Connected => Self::Connected { ts },
            NetworkEvent::Disconnected => Self::Disconnected { ts },
            NetworkEvent::Message {
                source,
                target,
                text,
            } => Self::Message {
                ts,
                source,
                target,
                text,
            },
            NetworkEvent::Action {
                source,
                target,
                text,
            } => Self::Action {
                ts,
                source,
                target,
                text,
            },
            NetworkEvent::Notice {
                source,
                target,
                text,
            } => Self::Notice {
                ts,
                source,
                target,
                text,
            },
            NetworkEvent::Joined { user, channel } => Self::Joined { ts, user, channel },
            NetworkEvent::Parted {
                user,
                channel,
                reason,
            } => Self::Parted {
                ts,
                user,
                channel,
                reason,
            },
            NetworkEvent::Quit {
                user,
                reason,
                channels,
            } => Self::Quit {
                ts,
                user,
                reason,
                channels,
            },
            NetworkEvent::Kicked {
                source,
                channel,
                target,
                reason,
            } => Self::Kicked {
                ts,
                source,
                channel,
                target,
                reason,
            },
            NetworkEvent::NickChanged { old, new, channels } => Self::NickChanged {
                ts,
                old,
                new,
                channels,
            },
            NetworkEvent::ModeChanged {
                source,
                channel,
                mode,
            } => Self::ModeChanged {
                ts,
                source,
                channel,
                mode,
            },
            NetworkEvent::TopicChanged {
                source,
                channel,
                topic,
                previous,
                previous_set_at,
            } => Self::TopicChanged {
                ts,
                source,
                channel,
                topic,
                previous,
                previous_set_at,
            },
            NetworkEvent::Invited { source, channel } => Self::Invited { ts, source, channel },
            NetworkEvent::Addressed {
                source,
                channel,
                text,
            } => Self::Addressed {
                ts,
                source,
                channel,
                text,
            },
            NetworkEvent::Terminated { .. } => return None,
        };

        Some(signal)
    }
}
