//! Daemon service
//!
//! Builds the manager, listens on a Unix socket, and serves each client
//! with one task: request lines are dispatched in order, bus broadcast
//! lines are interleaved as they happen. The service returns once a
//! shutdown (SIGINT or a client `shutdown` request) has fully drained.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use ircbus_core::{BusPath, DirConfigSource, Manager, ManagerConfig, NetworkFactory};

use crate::bus::UnixBus;
use crate::dispatch;
use crate::protocol::{ClientRequest, ServerMessage};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket the daemon listens on; removed again on exit
    pub socket_path: PathBuf,
    /// Directory holding one `<name>.toml` definition per session
    pub config_dir: PathBuf,
    /// Bus path of the management surface
    pub base_path: BusPath,
    /// Grace period before a stopped session's surface is retracted
    pub retract_delay: Duration,
}

impl ServiceConfig {
    pub fn new(socket_path: PathBuf, config_dir: PathBuf, base_path: BusPath) -> Self {
        Self {
            socket_path,
            config_dir,
            base_path,
            retract_delay: ircbus_core::DEFAULT_RETRACT_DELAY,
        }
    }

    pub fn with_retract_delay(mut self, delay: Duration) -> Self {
        self.retract_delay = delay;
        self
    }
}

pub async fn run(config: ServiceConfig, factory: Arc<dyn NetworkFactory>) -> Result<()> {
    let bus = Arc::new(UnixBus::default());
    let configs = Arc::new(DirConfigSource::new(config.config_dir.clone()));
    let manager = Manager::new(
        ManagerConfig::new(config.base_path.clone()).with_retract_delay(config.retract_delay),
        Arc::clone(&bus) as _,
        configs,
        factory,
    );

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path).with_context(|| {
            format!("removing stale socket {}", config.socket_path.display())
        })?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("binding {}", config.socket_path.display()))?;
    info!(socket = %config.socket_path.display(), base = %config.base_path, "listening");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; shutting down");
                manager.shutdown().await;
                break;
            }
            _ = manager.wait_terminated() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("accepting connection")?;
                debug!("client connected");
                let manager = Arc::clone(&manager);
                let bus = Arc::clone(&bus);
                tokio::spawn(async move {
                    if let Err(e) = serve_client(manager, bus, stream).await {
                        debug!(error = %e, "client connection ended");
                    }
                });
            }
        }
    }

    manager.wait_terminated().await;

    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        warn!(error = %e, "could not remove socket file");
    }
    info!("daemon stopped");
    Ok(())
}

async fn serve_client(
    manager: Arc<Manager>,
    bus: Arc<UnixBus>,
    stream: UnixStream,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut broadcasts = bus.subscribe();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<ClientRequest>(&line) {
                    Ok(request) => dispatch::dispatch(&manager, request).await,
                    Err(e) => ServerMessage::Fail {
                        id: 0,
                        kind: "bad_request".to_string(),
                        message: e.to_string(),
                    },
                };
                write_line(&mut writer, &response).await?;
            }
            broadcast = broadcasts.recv() => {
                match broadcast {
                    Ok(message) => write_line(&mut writer, &message).await?,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "client fell behind; bus lines dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

async fn write_line(
    writer: &mut (impl AsyncWriteExt + Unpin),
    message: &ServerMessage,
) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(message).map_err(std::io::Error::other)?;
    line.push(b'\n');
    writer.write_all(&line).await
}
