//! Protocol callback events
//!
//! One `NetworkEvent` is emitted by the protocol worker for every
//! asynchronous thing that happens on the wire. The bridge stamps each
//! event with a capture-time timestamp when it turns it into an outbound
//! signal; no ordering across sessions is implied.

use serde::{Deserialize, Serialize};

/// Events emitted by a network's protocol worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkEvent {
    /// Registration with the remote network completed
    Connected,

    /// Connection to the remote network was lost or closed
    Disconnected,

    /// Message to a channel, or directly to us (`target` is `None`)
    Message {
        source: String,
        target: Option<String>,
        text: String,
    },

    /// CTCP ACTION to a channel or directly to us
    Action {
        source: String,
        target: Option<String>,
        text: String,
    },

    /// Notice to a channel or directly to us
    Notice {
        source: String,
        target: Option<String>,
        text: String,
    },

    /// A user (possibly us) joined a channel
    Joined { user: String, channel: String },

    /// A user left a channel
    Parted {
        user: String,
        channel: String,
        reason: Option<String>,
    },

    /// A user quit the network; `channels` lists the channels we shared
    Quit {
        user: String,
        reason: Option<String>,
        channels: Vec<String>,
    },

    /// A user was kicked from a channel
    Kicked {
        source: String,
        channel: String,
        target: String,
        reason: Option<String>,
    },

    /// A user changed nick; `channels` lists the channels we shared
    NickChanged {
        old: String,
        new: String,
        channels: Vec<String>,
    },

    /// A channel mode change
    ModeChanged {
        source: String,
        channel: String,
        mode: String,
    },

    /// A channel topic change, with the value it replaced
    TopicChanged {
        source: String,
        channel: String,
        topic: String,
        previous: Option<String>,
        /// When the previous topic was set, ms since epoch
        previous_set_at: u64,
    },

    /// We were invited to a channel
    Invited { source: String, channel: String },

    /// A channel message addressed to our own nick
    Addressed {
        source: String,
        channel: String,
        text: String,
    },

    /// The protocol worker exited; `crashed` distinguishes an abnormal
    /// exit from a requested disconnect running to completion
    Terminated { crashed: bool },
}
