//! ircbus-core: Core library for the ircbus IRC session bridge
//!
//! This crate provides the foundational components for ircbus:
//!
//! - **Session management** - [`Manager`] for the session lifecycle and
//!   [`Session`] for per-session commands and queries
//! - **Signal system** - [`SignalBus`] trait and [`MemoryBus`] for
//!   publishing timestamped protocol notifications
//! - **Protocol capability** - [`Network`] trait, [`NetworkFactory`] and
//!   [`MockNetwork`] for the IRC layer behind the sessions
//! - **Configuration** - [`NetworkConfig`] definitions loaded through a
//!   [`ConfigSource`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    Manager                       │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │                 Session                    │  │
//! │  │  ┌───────────────┐  ┌───────────────────┐  │  │
//! │  │  │    Network    │  │    bridge task    │  │  │
//! │  │  │  (protocol)   │  │  events → signals │  │  │
//! │  │  └───────────────┘  └───────────────────┘  │  │
//! │  └────────────────────────────────────────────┘  │
//! └───────────────────────┬──────────────────────────┘
//!                         │
//!                     SignalBus
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod network;
pub mod path;
pub mod registry;
pub mod session;
pub mod signals;

// Re-export key types for convenience
pub use config::{
    AutojoinChannel, ConfigSource, DirConfigSource, MemoryConfigSource, NetworkConfig, TlsMode,
};
pub use error::{BridgeError, BusError, CommandError, ConfigError, ManagerError, PathError};
pub use manager::{DEFAULT_RETRACT_DELAY, Manager, ManagerConfig};
pub use network::{
    ChannelMode, MockCommand, MockNetwork, MockNetworkFactory, Network, NetworkError,
    NetworkEvent, NetworkFactory, Privilege, SessionId,
};
pub use path::BusPath;
pub use session::Session;
pub use signals::{MemoryBus, Signal, SignalBus};
