//! Socket rendition of the bus capability
//!
//! UnixBus turns bus traffic into [`ServerMessage`] values fanned out
//! over a broadcast channel; each client connection holds a receiver and
//! writes what it gets to its socket. Announcing cannot fail here: a
//! surface is addressable as soon as clients are told about it.

use async_trait::async_trait;
use tokio::sync::broadcast;

use ircbus_core::{BusError, BusPath, Signal, SignalBus};

use crate::protocol::ServerMessage;

pub struct UnixBus {
    tx: broadcast::Sender<ServerMessage>,
}

impl UnixBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    fn send(&self, message: ServerMessage) {
        // No receivers just means no clients are connected.
        let _ = self.tx.send(message);
    }
}

impl Default for UnixBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl SignalBus for UnixBus {
    async fn announce(&self, path: &BusPath) -> Result<(), BusError> {
        self.send(ServerMessage::Exported {
            path: path.to_string(),
        });
        Ok(())
    }

    async fn retract(&self, path: &BusPath) {
        self.send(ServerMessage::Retracted {
            path: path.to_string(),
        });
    }

    async fn emit(&self, path: &BusPath, signal: Signal) -> Result<(), BusError> {
        self.send(ServerMessage::Signal {
            path: path.to_string(),
            signal,
        });
        Ok(())
    }
}
