//! SignalBus trait definition
//!
//! The bus capability: how the manager publishes addressable surfaces
//! and signals to the rest of the machine. The wire transport behind it
//! (framing, dispatch, name registration) is the embedder's concern.

use async_trait::async_trait;

use super::types::Signal;
use crate::error::BusError;
use crate::path::BusPath;

/// Outbound half of the inter-process bus
#[async_trait]
pub trait SignalBus: Send + Sync {
    /// Publish an addressable object surface at `path`
    async fn announce(&self, path: &BusPath) -> Result<(), BusError>;

    /// Retract the surface at `path`; best-effort
    async fn retract(&self, path: &BusPath);

    /// Emit a signal from `path`
    async fn emit(&self, path: &BusPath, signal: Signal) -> Result<(), BusError>;
}
