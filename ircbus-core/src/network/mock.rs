//! Mock network for testing
//!
//! MockNetwork gives tests a scriptable protocol layer: channel state and
//! membership tiers are set directly, issued actions are recorded for
//! assertions, and events (including termination) are triggered on
//! demand. It is also what the daemon runs with when no wire protocol
//! implementation is linked in.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::event::NetworkEvent;
use super::traits::{ChannelMode, Network, NetworkError, NetworkFactory, Privilege, SessionId};
use crate::config::NetworkConfig;

/// An action issued to a MockNetwork, recorded for assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCommand {
    Join {
        channel: String,
        key: Option<String>,
    },
    Part {
        channel: String,
        message: Option<String>,
    },
    Message {
        target: String,
        text: String,
    },
    Action {
        target: String,
        text: String,
    },
    Notice {
        target: String,
        text: String,
    },
    Kick {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    Mode {
        channel: String,
        mode: String,
    },
    Topic {
        channel: String,
        topic: String,
    },
    UserModes {
        modes: String,
    },
    Quit {
        message: Option<String>,
    },
}

struct MockChannel {
    mode: ChannelMode,
    members: HashMap<String, Privilege>,
}

struct MockState {
    nick: String,
    channels: HashMap<String, MockChannel>,
    chantypes: Option<String>,
    reconnect: bool,
    manual_termination: bool,
    commands: Vec<MockCommand>,
}

/// Mock implementation of [`Network`]
pub struct MockNetwork {
    id: SessionId,
    state: Mutex<MockState>,
    tx: Mutex<Option<broadcast::Sender<NetworkEvent>>>,
}

impl MockNetwork {
    pub fn new(id: SessionId, nick: &str) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            id,
            state: Mutex::new(MockState {
                nick: nick.to_string(),
                channels: HashMap::new(),
                chantypes: Some("#&".to_string()),
                reconnect: true,
                manual_termination: false,
                commands: Vec::new(),
            }),
            tx: Mutex::new(Some(tx)),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }

    // ==================== Scripting helpers ====================

    /// Put us on `channel` with a known mode
    pub fn add_channel(&self, channel: &str, mode: &str) {
        self.state().channels.insert(
            channel.to_string(),
            MockChannel {
                mode: ChannelMode::Known(mode.to_string()),
                members: HashMap::new(),
            },
        );
    }

    /// Put us on `channel` with mode information not yet arrived
    pub fn add_channel_pending_mode(&self, channel: &str) {
        self.state().channels.insert(
            channel.to_string(),
            MockChannel {
                mode: ChannelMode::Pending,
                members: HashMap::new(),
            },
        );
    }

    /// Resolve a pending mode (or replace a known one)
    pub fn set_channel_mode(&self, channel: &str, mode: &str) {
        if let Some(chan) = self.state().channels.get_mut(channel) {
            chan.mode = ChannelMode::Known(mode.to_string());
        }
    }

    /// Put `nick` on `channel` at `tier`
    pub fn add_member(&self, channel: &str, nick: &str, tier: Privilege) {
        if let Some(chan) = self.state().channels.get_mut(channel) {
            chan.members.insert(nick.to_string(), tier);
        }
    }

    /// Override the broadcast-prefix set (`None` simulates a server that
    /// never reported one)
    pub fn set_chantypes(&self, chantypes: Option<&str>) {
        self.state().chantypes = chantypes.map(str::to_string);
    }

    /// When set, `quit` only records the command; tests terminate the
    /// worker explicitly with [`MockNetwork::terminate`]
    pub fn set_manual_termination(&self, manual: bool) {
        self.state().manual_termination = manual;
    }

    /// Emit a protocol event to subscribers
    pub fn emit(&self, event: NetworkEvent) {
        let guard = self.tx.lock().expect("mock sender lock poisoned");
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Simulate the protocol worker exiting
    pub fn terminate(&self, crashed: bool) {
        self.emit(NetworkEvent::Terminated { crashed });
    }

    /// Simulate the protocol worker vanishing without a termination
    /// event; subscribers observe a closed stream
    pub fn drop_worker(&self) {
        self.tx.lock().expect("mock sender lock poisoned").take();
    }

    // ==================== Assertion helpers ====================

    pub fn commands(&self) -> Vec<MockCommand> {
        self.state().commands.clone()
    }

    pub fn reconnect_enabled(&self) -> bool {
        self.state().reconnect
    }

    fn record(&self, command: MockCommand) {
        self.state().commands.push(command);
    }
}

#[async_trait]
impl Network for MockNetwork {
    fn id(&self) -> SessionId {
        self.id
    }

    fn nick(&self) -> String {
        self.state().nick.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        let guard = self.tx.lock().expect("mock sender lock poisoned");
        match guard.as_ref() {
            Some(tx) => tx.subscribe(),
            // Worker already gone; hand out a receiver that reports the
            // stream as closed.
            None => broadcast::channel(1).1,
        }
    }

    fn channels(&self) -> Vec<String> {
        self.state().channels.keys().cloned().collect()
    }

    fn has_channel(&self, channel: &str) -> bool {
        self.state().channels.contains_key(channel)
    }

    fn channel_members(&self, channel: &str) -> Option<Vec<String>> {
        self.state()
            .channels
            .get(channel)
            .map(|c| c.members.keys().cloned().collect())
    }

    fn channel_mode(&self, channel: &str) -> Option<ChannelMode> {
        self.state().channels.get(channel).map(|c| c.mode.clone())
    }

    fn member_has(&self, channel: &str, nick: &str, tier: Privilege) -> bool {
        self.state()
            .channels
            .get(channel)
            .and_then(|c| c.members.get(nick))
            .is_some_and(|t| *t == tier)
    }

    fn broadcast_prefixes(&self) -> Option<String> {
        self.state().chantypes.clone()
    }

    async fn join(&self, channel: &str, key: Option<&str>) {
        self.record(MockCommand::Join {
            channel: channel.to_string(),
            key: key.map(str::to_string),
        });
    }

    async fn part(&self, channel: &str, message: Option<&str>) {
        self.record(MockCommand::Part {
            channel: channel.to_string(),
            message: message.map(str::to_string),
        });
    }

    async fn send_message(&self, target: &str, text: &str) {
        self.record(MockCommand::Message {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    async fn send_action(&self, target: &str, text: &str) {
        self.record(MockCommand::Action {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    async fn send_notice(&self, target: &str, text: &str) {
        self.record(MockCommand::Notice {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    async fn kick(&self, channel: &str, nick: &str, reason: Option<&str>) {
        self.record(MockCommand::Kick {
            channel: channel.to_string(),
            nick: nick.to_string(),
            reason: reason.map(str::to_string),
        });
    }

    async fn set_mode(&self, channel: &str, mode: &str) {
        self.record(MockCommand::Mode {
            channel: channel.to_string(),
            mode: mode.to_string(),
        });
    }

    async fn set_topic(&self, channel: &str, topic: &str) {
        self.record(MockCommand::Topic {
            channel: channel.to_string(),
            topic: topic.to_string(),
        });
    }

    async fn set_user_modes(&self, modes: &str) {
        self.record(MockCommand::UserModes {
            modes: modes.to_string(),
        });
    }

    async fn quit(&self, message: Option<&str>) {
        let manual = {
            let mut state = self.state();
            state.commands.push(MockCommand::Quit {
                message: message.map(str::to_string),
            });
            state.manual_termination
        };

        // Model the worker running the disconnect to completion unless a
        // test wants to drive termination itself.
        if !manual {
            self.terminate(false);
        }
    }

    fn disable_reconnect(&self) {
        self.state().reconnect = false;
    }
}

/// Factory producing MockNetworks, with scriptable connect failures
#[derive(Default)]
pub struct MockNetworkFactory {
    next_id: AtomicU64,
    fail_next: AtomicBool,
    manual_termination: AtomicBool,
    connect_delay_ms: AtomicU64,
    created: Mutex<Vec<(String, Arc<MockNetwork>)>>,
}

impl MockNetworkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `connect` fail with a setup error
    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Delay every `connect`, holding the in-flight window open so
    /// tests can interleave other operations with it
    pub fn delay_connects(&self, delay: Duration) {
        self.connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// All networks created by this factory get manual termination
    pub fn manual_termination(&self) {
        self.manual_termination.store(true, Ordering::SeqCst);
    }

    /// Networks created so far, with the session names they were
    /// created for
    pub fn created(&self) -> Vec<(String, Arc<MockNetwork>)> {
        self.created
            .lock()
            .expect("factory lock poisoned")
            .clone()
    }

    /// The network created for `name`, if any
    pub fn network(&self, name: &str) -> Option<Arc<MockNetwork>> {
        self.created
            .lock()
            .expect("factory lock poisoned")
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, net)| Arc::clone(net))
    }
}

#[async_trait]
impl NetworkFactory for MockNetworkFactory {
    async fn connect(
        &self,
        name: &str,
        config: &NetworkConfig,
    ) -> Result<Arc<dyn Network>, NetworkError> {
        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(NetworkError::Setup("scripted connect failure".to_string()));
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let network = Arc::new(MockNetwork::new(id, &config.nick));
        if self.manual_termination.load(Ordering::SeqCst) {
            network.set_manual_termination(true);
        }

        self.created
            .lock()
            .expect("factory lock poisoned")
            .push((name.to_string(), Arc::clone(&network)));

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;

    fn test_config() -> NetworkConfig {
        toml::from_str(
            r#"
            nick = "oops"
            username = "oops"
            realname = "test"
            server = "irc.example.net"
            port = 6667
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn factory_assigns_unique_ids() {
        let factory = MockNetworkFactory::new();
        let a = factory.connect("a", &test_config()).await.unwrap();
        let b = factory.connect("b", &test_config()).await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn fail_next_connect_fails_once() {
        let factory = MockNetworkFactory::new();
        factory.fail_next_connect();
        assert!(factory.connect("a", &test_config()).await.is_err());
        assert!(factory.connect("a", &test_config()).await.is_ok());
    }

    #[tokio::test]
    async fn actions_are_recorded() {
        let network = MockNetwork::new(SessionId(0), "oops");
        network.join("#chan", Some("key")).await;
        network.quit(Some("bye")).await;

        let commands = network.commands();
        assert_eq!(
            commands[0],
            MockCommand::Join {
                channel: "#chan".to_string(),
                key: Some("key".to_string()),
            }
        );
        assert_eq!(
            commands[1],
            MockCommand::Quit {
                message: Some("bye".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn quit_terminates_cleanly_by_default() {
        let network = MockNetwork::new(SessionId(0), "oops");
        let mut rx = network.subscribe();
        network.quit(None).await;
        assert_eq!(
            rx.recv().await.unwrap(),
            NetworkEvent::Terminated { crashed: false }
        );
    }

    #[tokio::test]
    async fn manual_termination_holds_the_worker() {
        let network = MockNetwork::new(SessionId(0), "oops");
        network.set_manual_termination(true);
        let mut rx = network.subscribe();
        network.quit(None).await;
        assert!(rx.try_recv().is_err());

        network.terminate(true);
        assert_eq!(
            rx.recv().await.unwrap(),
            NetworkEvent::Terminated { crashed: true }
        );
    }

    #[test]
    fn scripted_channel_state_is_visible() {
        let network = MockNetwork::new(SessionId(0), "oops");
        network.add_channel("#chan", "+nt");
        network.add_member("#chan", "alice", Privilege::Op);

        assert!(network.has_channel("#chan"));
        assert!(network.member_has("#chan", "alice", Privilege::Op));
        assert!(!network.member_has("#chan", "alice", Privilege::Regular));
        assert_eq!(
            network.channel_mode("#chan"),
            Some(ChannelMode::Known("+nt".to_string()))
        );
        assert_eq!(network.channel_members("#missing"), None);
    }

    #[tokio::test]
    async fn drop_worker_closes_the_event_stream() {
        let network = MockNetwork::new(SessionId(0), "oops");
        let mut rx = network.subscribe();
        network.drop_worker();
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
