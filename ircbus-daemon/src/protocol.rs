//! Socket protocol message types
//!
//! One JSON object per line in each direction. Requests carry a client
//! correlation id and the bus path they address; the daemon answers each
//! request with exactly one `reply` or `fail`, and interleaves broadcast
//! `signal`/`exported`/`retracted` lines as they happen.

use serde::{Deserialize, Serialize};

use ircbus_core::{Privilege, Signal};

/// A single request line from a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientRequest {
    /// Client-chosen correlation id, echoed in the response
    pub id: u64,
    /// Bus path the operation addresses: the manager base path for
    /// management operations, `<base>/<name>` for session operations
    pub path: String,
    pub op: RequestOp,
}

/// Operations a client can invoke
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RequestOp {
    // ==================== Management surface ====================
    /// Names of loaded sessions
    ListSessions,

    /// Load the session definition `name` and bring the session up
    LoadSession { name: String },

    /// Request a graceful disconnect of session `name`
    StopSession { name: String },

    /// Drain every session and terminate the daemon
    Shutdown,

    // ==================== Session commands ====================
    JoinChannel {
        channel: String,
        key: Option<String>,
    },
    PartChannel {
        channel: String,
        message: Option<String>,
    },
    SendMessage {
        dest: String,
        text: String,
    },
    SendAction {
        dest: String,
        text: String,
    },
    SendNotice {
        dest: String,
        text: String,
    },
    Kick {
        channel: String,
        user: String,
        reason: Option<String>,
    },
    ChangeMode {
        target: String,
        mode: String,
    },
    ChangeTopic {
        target: String,
        text: String,
    },
    Quit {
        message: Option<String>,
    },

    // ==================== Session queries ====================
    Nick,
    ListChannelNames,
    ListChannelMembers {
        channel: String,
    },
    ChannelMode {
        channel: String,
    },
    IsMember {
        channel: String,
        user: String,
    },
    HasPrivilege {
        channel: String,
        user: String,
        tier: Privilege,
    },
    /// Half-op or above
    IsPrivileged {
        channel: String,
        user: String,
    },
}

/// Lines sent from the daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Successful response to a request
    Reply {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<serde_json::Value>,
    },

    /// Failed response to a request
    Fail {
        id: u64,
        /// Stable machine-readable failure kind
        kind: String,
        message: String,
    },

    /// A signal emitted on the bus
    Signal { path: String, signal: Signal },

    /// A surface became addressable
    Exported { path: String },

    /// A surface was withdrawn
    Retracted { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let request = ClientRequest {
            id: 7,
            path: "/net/ircbus/freenode".to_string(),
            op: RequestOp::Kick {
                channel: "#chan".to_string(),
                user: "alice".to_string(),
                reason: None,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"op\":\"kick\""), "{json}");

        let parsed: ClientRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn ops_use_snake_case_tags() {
        let parsed: ClientRequest = serde_json::from_str(
            r#"{"id":1,"path":"/net/ircbus","op":{"op":"load_session","name":"freenode"}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.op,
            RequestOp::LoadSession {
                name: "freenode".to_string(),
            }
        );
    }

    #[test]
    fn reply_without_value_omits_the_field() {
        let json = serde_json::to_string(&ServerMessage::Reply { id: 3, value: None }).unwrap();
        assert!(!json.contains("value"), "{json}");
    }

    #[test]
    fn privilege_tier_is_snake_case() {
        let parsed: RequestOp = serde_json::from_str(
            r##"{"op":"has_privilege","channel":"#chan","user":"alice","tier":"half_op"}"##,
        )
        .unwrap();
        assert_eq!(
            parsed,
            RequestOp::HasPrivilege {
                channel: "#chan".to_string(),
                user: "alice".to_string(),
                tier: Privilege::HalfOp,
            }
        );
    }
}
