//! End-to-end tests over a real Unix socket: a client drives the whole
//! session lifecycle through the daemon and observes the interleaved
//! bus broadcast traffic.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use ircbus_core::{BusPath, MockNetworkFactory, NetworkEvent, Signal};
use ircbus_daemon::protocol::{ClientRequest, RequestOp, ServerMessage};
use ircbus_daemon::service::{self, ServiceConfig};

const DEFINITION: &str = r#"
nick = "oops"
username = "oops"
realname = "test bridge"
server = "irc.example.net"
port = 6667
"#;

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    /// Broadcast lines read past while waiting for something else
    stash: Vec<ServerMessage>,
}

impl Client {
    async fn connect(socket: &Path) -> Self {
        for _ in 0..500 {
            if let Ok(stream) = UnixStream::connect(socket).await {
                let (reader, writer) = stream.into_split();
                return Self {
                    lines: BufReader::new(reader).lines(),
                    writer,
                    stash: Vec::new(),
                };
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("daemon did not come up");
    }

    async fn send(&mut self, id: u64, path: &str, op: RequestOp) {
        let request = ClientRequest {
            id,
            path: path.to_string(),
            op,
        };
        let mut line = serde_json::to_vec(&request).unwrap();
        line.push(b'\n');
        self.writer.write_all(&line).await.unwrap();
    }

    async fn next(&mut self) -> ServerMessage {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }

    /// The response to request `id`, stashing broadcast lines read past.
    async fn response(&mut self, id: u64) -> ServerMessage {
        loop {
            let message = self.next().await;
            match message {
                ServerMessage::Reply { id: got, .. } | ServerMessage::Fail { id: got, .. }
                    if got == id =>
                {
                    return message;
                }
                other => self.stash.push(other),
            }
        }
    }

    /// The first broadcast line matching `predicate`, checking stashed
    /// lines before reading more.
    async fn broadcast(&mut self, predicate: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        if let Some(i) = self.stash.iter().position(&predicate) {
            return self.stash.remove(i);
        }
        loop {
            let message = self.next().await;
            if predicate(&message) {
                return message;
            }
            self.stash.push(message);
        }
    }
}

fn service_config(dir: &Path) -> ServiceConfig {
    ServiceConfig::new(
        dir.join("ircbusd.sock"),
        dir.to_path_buf(),
        BusPath::parse("/net/ircbus").unwrap(),
    )
    .with_retract_delay(Duration::from_millis(5))
}

#[tokio::test]
async fn full_lifecycle_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("freenode.toml"), DEFINITION).unwrap();

    let config = service_config(dir.path());
    let socket = config.socket_path.clone();
    let factory = Arc::new(MockNetworkFactory::new());
    let service = tokio::spawn(service::run(config, Arc::clone(&factory) as _));

    let mut client = Client::connect(&socket).await;

    // Load a session; the reply is interleaved with the export and the
    // loaded signal.
    client
        .send(
            1,
            "/net/ircbus",
            RequestOp::LoadSession {
                name: "freenode".to_string(),
            },
        )
        .await;
    assert_eq!(
        client.response(1).await,
        ServerMessage::Reply { id: 1, value: None }
    );
    client
        .broadcast(|m| {
            matches!(m, ServerMessage::Exported { path } if path == "/net/ircbus/freenode")
        })
        .await;
    client
        .broadcast(|m| {
            matches!(
                m,
                ServerMessage::Signal {
                    path,
                    signal: Signal::Loaded { session },
                } if path == "/net/ircbus" && session == "freenode"
            )
        })
        .await;

    client.send(2, "/net/ircbus", RequestOp::ListSessions).await;
    assert_eq!(
        client.response(2).await,
        ServerMessage::Reply {
            id: 2,
            value: Some(json!(["freenode"])),
        }
    );

    // A protocol event becomes a signal on the session path.
    let network = factory.network("freenode").unwrap();
    network.emit(NetworkEvent::Joined {
        user: "alice!a@host".to_string(),
        channel: "#chan".to_string(),
    });
    let joined = client
        .broadcast(|m| {
            matches!(
                m,
                ServerMessage::Signal {
                    path,
                    signal: Signal::Joined { .. },
                } if path == "/net/ircbus/freenode"
            )
        })
        .await;
    match joined {
        ServerMessage::Signal {
            signal: Signal::Joined { ts, user, channel },
            ..
        } => {
            assert!(ts > 0);
            assert_eq!(user, "alice!a@host");
            assert_eq!(channel, "#chan");
        }
        other => panic!("unexpected line: {other:?}"),
    }

    // A session query through the session path.
    client.send(3, "/net/ircbus/freenode", RequestOp::Nick).await;
    assert_eq!(
        client.response(3).await,
        ServerMessage::Reply {
            id: 3,
            value: Some(json!("oops")),
        }
    );

    // Shutdown drains the session and the service returns.
    client.send(4, "/net/ircbus", RequestOp::Shutdown).await;
    assert_eq!(
        client.response(4).await,
        ServerMessage::Reply { id: 4, value: None }
    );
    client
        .broadcast(|m| {
            matches!(
                m,
                ServerMessage::Signal {
                    signal: Signal::Stopped { session, crashed: false },
                    ..
                } if session == "freenode"
            )
        })
        .await;
    client
        .broadcast(|m| {
            matches!(m, ServerMessage::Retracted { path } if path == "/net/ircbus/freenode")
        })
        .await;

    tokio::time::timeout(Duration::from_secs(5), service)
        .await
        .expect("service did not stop")
        .unwrap()
        .unwrap();
    assert!(!socket.exists());
}

#[tokio::test]
async fn malformed_lines_and_bad_requests_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = service_config(dir.path());
    let socket = config.socket_path.clone();
    let service = tokio::spawn(service::run(
        config,
        Arc::new(MockNetworkFactory::new()) as _,
    ));

    let mut client = Client::connect(&socket).await;

    client.writer.write_all(b"not json\n").await.unwrap();
    let response = client.next().await;
    assert!(matches!(
        response,
        ServerMessage::Fail { id: 0, ref kind, .. } if kind == "bad_request"
    ));

    client
        .send(
            1,
            "/net/ircbus",
            RequestOp::LoadSession {
                name: "missing".to_string(),
            },
        )
        .await;
    assert!(matches!(
        client.response(1).await,
        ServerMessage::Fail { id: 1, ref kind, .. } if kind == "config_error"
    ));

    client.send(2, "/net/ircbus", RequestOp::Shutdown).await;
    client.response(2).await;
    tokio::time::timeout(Duration::from_secs(5), service)
        .await
        .expect("service did not stop")
        .unwrap()
        .unwrap();
}
