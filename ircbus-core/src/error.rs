//! Error types for ircbus-core

use thiserror::Error;

/// Top-level error type for ircbus-core
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// Errors from bus path validation and composition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("malformed path component: {0:?}")]
    InvalidComponent(String),

    #[error("malformed bus path: {0:?}")]
    InvalidPath(String),
}

/// Errors from session lifecycle operations
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("invalid session name: {0:?}")]
    BadName(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("session not loaded: {0}")]
    NotLoaded(String),

    #[error("configuration error for session {name}: {source}")]
    Config {
        name: String,
        #[source]
        source: ConfigError,
    },

    #[error("failed to load session {name}: {reason}")]
    LoadError { name: String, reason: String },
}

/// Errors from session definition loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no definition found for session: {0}")]
    NotFound(String),

    #[error("could not read definition for session {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed definition for session {name}: {reason}")]
    Malformed { name: String, reason: String },
}

/// Precondition failures on session-scoped commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("user {user} is not on channel {channel}")]
    UserNotOnChannel { user: String, channel: String },

    #[error("already on channel: {0}")]
    AlreadyOnChannel(String),
}

/// Errors from the bus capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("could not publish object at {0}")]
    Export(String),

    #[error("could not send signal from {0}")]
    Emit(String),
}
