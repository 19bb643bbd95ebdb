//! Session definitions
//!
//! Each session name maps to one TOML definition file, read once at load
//! time. The configuration capability is a trait so tests (and embedders
//! with their own config storage) can supply definitions directly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;

use crate::error::ConfigError;

/// Transport security for the remote connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plain TCP
    #[default]
    Off,
    /// TLS with certificate verification
    On,
    /// TLS accepting any certificate
    Insecure,
}

/// A channel to join automatically after connecting
///
/// Deserialized from `"#chan"` or `"#chan:key"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AutojoinChannel {
    pub name: String,
    pub key: Option<String>,
}

impl TryFrom<String> for AutojoinChannel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default();
        let key = parts.next();

        if name.is_empty() || parts.next().is_some() {
            return Err(format!("bad channel definition: {s:?}"));
        }

        Ok(Self {
            name: name.to_string(),
            key: key.map(str::to_string),
        })
    }
}

/// Validated definition of one remote network session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkConfig {
    /// Nickname to connect with
    pub nick: String,
    /// Username (ident) field
    pub username: String,
    /// Real name field
    pub realname: String,
    /// Remote server address
    pub server: String,
    /// Remote server port
    pub port: u16,
    /// Transport security mode
    #[serde(default)]
    pub tls: TlsMode,
    /// Local address to bind the connection to
    #[serde(default)]
    pub source_address: Option<String>,
    /// Password sent during registration
    #[serde(default)]
    pub server_password: Option<String>,
    /// Credential sent to the network's authentication service after
    /// connecting; joins are delayed until identification completes
    #[serde(default)]
    pub nickserv_password: Option<String>,
    /// User modes applied once connected
    #[serde(default)]
    pub usermodes: Option<String>,
    /// Channels joined automatically after connecting
    #[serde(default)]
    pub autojoin: Vec<AutojoinChannel>,
}

/// Capability yielding validated session definitions by name
pub trait ConfigSource: Send + Sync {
    fn load(&self, name: &str) -> Result<NetworkConfig, ConfigError>;
}

/// Reads `<dir>/<name>.toml` definition files
pub struct DirConfigSource {
    dir: PathBuf,
}

impl DirConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ConfigSource for DirConfigSource {
    fn load(&self, name: &str) -> Result<NetworkConfig, ConfigError> {
        let path = self.dir.join(format!("{name}.toml"));

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(name.to_string())
            } else {
                ConfigError::Unreadable {
                    name: name.to_string(),
                    source: e,
                }
            }
        })?;

        toml::from_str(&raw).map_err(|e| ConfigError::Malformed {
            name: name.to_string(),
            reason: e.message().to_string(),
        })
    }
}

/// In-memory config source for tests
#[derive(Default)]
pub struct MemoryConfigSource {
    configs: Mutex<HashMap<String, NetworkConfig>>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, config: NetworkConfig) {
        self.configs
            .lock()
            .expect("config map lock poisoned")
            .insert(name.to_string(), config);
    }
}

impl ConfigSource for MemoryConfigSource {
    fn load(&self, name: &str) -> Result<NetworkConfig, ConfigError> {
        self.configs
            .lock()
            .expect("config map lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))
    }
}
