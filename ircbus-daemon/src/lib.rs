//! ircbus-daemon: socket front end for the ircbus session manager
//!
//! Exposes the [`ircbus_core::Manager`] over a Unix socket speaking
//! newline-delimited JSON: clients send [`protocol::ClientRequest`]
//! lines and receive per-request replies interleaved with the bus
//! broadcast traffic (signals, exports, retractions).

pub mod bus;
pub mod dispatch;
pub mod protocol;
pub mod service;

pub use bus::UnixBus;
pub use protocol::{ClientRequest, RequestOp, ServerMessage};
pub use service::{ServiceConfig, run};
