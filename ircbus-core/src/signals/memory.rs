//! In-memory SignalBus implementation
//!
//! MemoryBus records announcements, retractions and emissions for
//! assertions and re-broadcasts emissions to live subscribers.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::broadcast;

use super::bus::SignalBus;
use super::types::Signal;
use crate::error::BusError;
use crate::path::BusPath;

/// In-memory implementation of [`SignalBus`]
pub struct MemoryBus {
    emitted: Mutex<Vec<(BusPath, Signal)>>,
    announced: Mutex<Vec<BusPath>>,
    retracted: Mutex<Vec<BusPath>>,
    refuse_announce: Mutex<bool>,
    tx: broadcast::Sender<(BusPath, Signal)>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            emitted: Mutex::new(Vec::new()),
            announced: Mutex::new(Vec::new()),
            retracted: Mutex::new(Vec::new()),
            refuse_announce: Mutex::new(false),
            tx,
        }
    }

    /// Make every subsequent `announce` fail
    pub fn refuse_announcements(&self) {
        *self.refuse_announce.lock().expect("bus lock poisoned") = true;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<(BusPath, Signal)> {
        self.tx.subscribe()
    }

    pub fn emitted(&self) -> Vec<(BusPath, Signal)> {
        self.emitted.lock().expect("bus lock poisoned").clone()
    }

    pub fn announced(&self) -> Vec<BusPath> {
        self.announced.lock().expect("bus lock poisoned").clone()
    }

    pub fn retracted(&self) -> Vec<BusPath> {
        self.retracted.lock().expect("bus lock poisoned").clone()
    }

    /// Signals emitted at `path`, in emission order
    pub fn emitted_at(&self, path: &BusPath) -> Vec<Signal> {
        self.emitted
            .lock()
            .expect("bus lock poisoned")
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, s)| s.clone())
            .collect()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl SignalBus for MemoryBus {
    async fn announce(&self, path: &BusPath) -> Result<(), BusError> {
        if *self.refuse_announce.lock().expect("bus lock poisoned") {
            return Err(BusError::Export(path.to_string()));
        }
        self.announced
            .lock()
            .expect("bus lock poisoned")
            .push(path.clone());
        Ok(())
    }

    async fn retract(&self, path: &BusPath) {
        self.retracted
            .lock()
            .expect("bus lock poisoned")
            .push(path.clone());
    }

    async fn emit(&self, path: &BusPath, signal: Signal) -> Result<(), BusError> {
        self.emitted
            .lock()
            .expect("bus lock poisoned")
            .push((path.clone(), signal.clone()));
        let _ = self.tx.send((path.clone(), signal));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_records_and_broadcasts() {
        let bus = MemoryBus::default();
        let mut rx = bus.subscribe();
        let path = BusPath::parse("/net/ircbus").unwrap();

        bus.emit(
            &path,
            Signal::Loaded {
                session: "freenode".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(bus.emitted().len(), 1);
        let (got_path, got_signal) = rx.recv().await.unwrap();
        assert_eq!(got_path, path);
        assert_eq!(
            got_signal,
            Signal::Loaded {
                session: "freenode".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn emitted_at_filters_by_path() {
        let bus = MemoryBus::default();
        let a = BusPath::parse("/a").unwrap();
        let b = BusPath::parse("/b").unwrap();

        bus.emit(&a, Signal::Connected { ts: 1 }).await.unwrap();
        bus.emit(&b, Signal::Connected { ts: 2 }).await.unwrap();

        assert_eq!(bus.emitted_at(&a), vec![Signal::Connected { ts: 1 }]);
    }

    #[tokio::test]
    async fn refused_announcement_is_an_error() {
        let bus = MemoryBus::default();
        bus.refuse_announcements();
        let path = BusPath::parse("/net").unwrap();
        assert!(bus.announce(&path).await.is_err());
        assert!(bus.announced().is_empty());
    }

    #[tokio::test]
    async fn announce_and_retract_are_recorded() {
        let bus = MemoryBus::default();
        let path = BusPath::parse("/net/ircbus/freenode").unwrap();

        bus.announce(&path).await.unwrap();
        bus.retract(&path).await;

        assert_eq!(bus.announced(), vec![path.clone()]);
        assert_eq!(bus.retracted(), vec![path]);
    }
}
