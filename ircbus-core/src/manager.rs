//! Session lifecycle manager
//!
//! Manager owns the session registry and drives the whole lifecycle:
//! create (validate, reserve, configure, connect, announce, commit),
//! stop (request a graceful disconnect; removal happens when the worker
//! reports termination), and the coordinated drain of every session at
//! shutdown.
//!
//! One mutex protects the registry, the draining flag and the decision
//! of which termination was the last one out. The lock is only ever
//! held to update that bookkeeping; capability calls (config loads,
//! connects, bus traffic) happen outside it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::ConfigSource;
use crate::error::ManagerError;
use crate::network::{NetworkEvent, NetworkFactory, SessionId};
use crate::path::{self, BusPath};
use crate::registry::Registry;
use crate::session::Session;
use crate::signals::{Signal, SignalBus, now_millis};

/// Grace period between a session's stopped signal and retracting its
/// bus surface, so subscribers can observe trailing signals.
pub const DEFAULT_RETRACT_DELAY: Duration = Duration::from_secs(5);

/// Manager construction parameters
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Bus path of the management surface; sessions are published
    /// directly beneath it
    pub base_path: BusPath,
    /// Grace period before a stopped session's surface is retracted
    pub retract_delay: Duration,
}

impl ManagerConfig {
    pub fn new(base_path: BusPath) -> Self {
        Self {
            base_path,
            retract_delay: DEFAULT_RETRACT_DELAY,
        }
    }

    pub fn with_retract_delay(mut self, delay: Duration) -> Self {
        self.retract_delay = delay;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    /// A shutdown request arrived; never reverts to Running
    Draining,
}

struct ManagerState {
    registry: Registry,
    phase: Phase,
    /// Set once, by whichever path observes the drain completing
    terminated: bool,
}

/// Manages the set of active sessions
pub struct Manager {
    config: ManagerConfig,
    bus: Arc<dyn SignalBus>,
    configs: Arc<dyn ConfigSource>,
    factory: Arc<dyn NetworkFactory>,
    state: Mutex<ManagerState>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl Manager {
    pub fn new(
        config: ManagerConfig,
        bus: Arc<dyn SignalBus>,
        configs: Arc<dyn ConfigSource>,
        factory: Arc<dyn NetworkFactory>,
    ) -> Arc<Self> {
        let (done_tx, done_rx) = watch::channel(false);
        Arc::new(Self {
            config,
            bus,
            configs,
            factory,
            state: Mutex::new(ManagerState {
                registry: Registry::new(),
                phase: Phase::Running,
                terminated: false,
            }),
            done_tx,
            done_rx,
        })
    }

    /// Bus path of the management surface
    pub fn base_path(&self) -> &BusPath {
        &self.config.base_path
    }

    fn state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().expect("manager state lock poisoned")
    }

    /// True exactly once: when draining and the last entry is gone.
    fn drain_complete(state: &mut ManagerState) -> bool {
        if state.phase == Phase::Draining && state.registry.is_empty() && !state.terminated {
            state.terminated = true;
            true
        } else {
            false
        }
    }

    fn release_terminal(&self) {
        info!("all sessions stopped");
        let _ = self.done_tx.send(true);
    }

    /// Roll a failed start back; the registry ends up exactly as it was
    /// before the call. A shutdown that arrived mid-start may be
    /// completed by this removal.
    fn abort_start(&self, name: &str) {
        let release = {
            let mut state = self.state();
            state.registry.abort(name);
            Self::drain_complete(&mut state)
        };
        if release {
            self.release_terminal();
        }
    }

    async fn request_stop(session: &Session, reason: &str) {
        let network = session.network();
        network.disable_reconnect();
        network.quit(Some(reason)).await;
    }

    /// Create and register the session `name`, publishing its surface
    /// beneath the manager's base path.
    pub async fn start(self: &Arc<Self>, name: &str) -> Result<(), ManagerError> {
        info!(session = name, "loading session definition");

        if !path::is_valid_component(name) {
            warn!(session = name, "rejecting invalid session name");
            return Err(ManagerError::BadName(name.to_string()));
        }

        // Claim the name before the slow part so a concurrent start of
        // the same name fails fast instead of racing to completion.
        self.state().registry.reserve(name)?;

        let definition = match self.configs.load(name) {
            Ok(definition) => definition,
            Err(source) => {
                warn!(session = name, error = %source, "definition unavailable");
                self.abort_start(name);
                return Err(ManagerError::Config {
                    name: name.to_string(),
                    source,
                });
            }
        };

        let session_path = match self.config.base_path.join(name) {
            Ok(path) => path,
            Err(_) => {
                self.abort_start(name);
                return Err(ManagerError::BadName(name.to_string()));
            }
        };

        let network = match self.factory.connect(name, &definition).await {
            Ok(network) => network,
            Err(e) => {
                warn!(session = name, error = %e, "could not establish session");
                self.abort_start(name);
                return Err(ManagerError::LoadError {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        // Subscribe before anything can happen on the session so the
        // bridge task observes every event from the beginning.
        let events = network.subscribe();

        if let Err(e) = self.bus.announce(&session_path).await {
            warn!(session = name, error = %e, "could not publish session surface");
            network.disable_reconnect();
            network.quit(Some("load failed")).await;
            self.abort_start(name);
            return Err(ManagerError::LoadError {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        let session = Arc::new(Session::new(
            name,
            session_path,
            network,
            definition.usermodes.clone(),
        ));

        let draining = {
            let mut state = self.state();
            state.registry.commit(name, Arc::clone(&session));
            state.phase == Phase::Draining
        };

        info!(session = name, id = %session.id(), "session loaded");

        if let Err(e) = self
            .bus
            .emit(
                &self.config.base_path,
                Signal::Loaded {
                    session: name.to_string(),
                },
            )
            .await
        {
            warn!(session = name, error = %e, "could not signal session load");
        }

        self.spawn_bridge(Arc::clone(&session), events);

        if draining {
            // Admitted during a drain: let it run, but stop it at once.
            debug!(session = name, "session started during drain; stopping");
            Self::request_stop(&session, "shutting down").await;
        }

        Ok(())
    }

    /// Request a graceful disconnect of session `name`.
    ///
    /// Returns immediately; the registry entry is removed only when the
    /// protocol worker reports termination.
    pub async fn stop(&self, name: &str) -> Result<(), ManagerError> {
        let session = self
            .state()
            .registry
            .lookup(name)
            .ok_or_else(|| ManagerError::NotLoaded(name.to_string()))?;

        info!(session = name, "stopping session");
        Self::request_stop(&session, "disconnecting").await;
        Ok(())
    }

    /// Names of currently loaded sessions, in no particular order.
    pub fn session_names(&self) -> Vec<String> {
        self.state().registry.names()
    }

    /// The loaded session `name`, if any.
    pub fn session(&self, name: &str) -> Option<Arc<Session>> {
        self.state().registry.lookup(name)
    }

    /// Stop every session and arrange for the terminal signal once the
    /// last one has drained. Idempotent; draining never reverts.
    pub async fn shutdown(&self) {
        info!("shutting down all sessions");

        let (sessions, release) = {
            let mut state = self.state();
            state.phase = Phase::Draining;
            let sessions = state.registry.active();
            let release = Self::drain_complete(&mut state);
            (sessions, release)
        };

        for session in &sessions {
            Self::request_stop(session, "shutting down").await;
        }

        if release {
            self.release_terminal();
        }
    }

    /// Completes once a shutdown has fully drained every session.
    pub async fn wait_terminated(&self) {
        let mut rx = self.done_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Forward protocol events for one session onto the bus until its
    /// worker terminates.
    fn spawn_bridge(
        self: &Arc<Self>,
        session: Arc<Session>,
        mut events: broadcast::Receiver<NetworkEvent>,
    ) {
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let id = session.id();
            loop {
                match events.recv().await {
                    Ok(NetworkEvent::Terminated { crashed }) => {
                        manager.handle_termination(id, crashed).await;
                        break;
                    }
                    Ok(event) => {
                        if event == NetworkEvent::Connected {
                            if let Some(modes) = session.initial_modes() {
                                debug!(session = session.name(), modes, "applying initial modes");
                                session.network().set_user_modes(modes).await;
                            }
                        }
                        let ts = now_millis();
                        if let Some(signal) = Signal::from_event(event, ts) {
                            if let Err(e) = manager.bus.emit(session.path(), signal).await {
                                warn!(session = session.name(), error = %e, "signal lost");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            session = session.name(),
                            missed, "event stream lagged; signals dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The worker vanished without reporting; that is
                        // a crash as far as observers are concerned.
                        warn!(session = session.name(), "event stream closed unexpectedly");
                        manager.handle_termination(id, true).await;
                        break;
                    }
                }
            }
        });
    }

    /// The termination callback: deregister, decide last-one-out under
    /// the same lock, signal, and retract the session surface after the
    /// grace period.
    async fn handle_termination(&self, id: SessionId, crashed: bool) {
        let (name, session, last) = {
            let mut state = self.state();
            let Some((name, session)) = state.registry.remove_by_id(id) else {
                return;
            };
            let last = Self::drain_complete(&mut state);
            (name, session, last)
        };

        if crashed {
            warn!(session = %name, "session terminated abnormally");
        } else {
            info!(session = %name, "session stopped");
        }

        if let Err(e) = self
            .bus
            .emit(
                &self.config.base_path,
                Signal::Stopped {
                    session: name.clone(),
                    crashed,
                },
            )
            .await
        {
            warn!(session = %name, error = %e, "could not signal session stop");
        }

        tokio::time::sleep(self.config.retract_delay).await;
        self.bus.retract(session.path()).await;

        if last {
            self.release_terminal();
        }
    }
}
