use crate::error::GatewayError;
use crate::schema::FieldRule;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "DOCGATE_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub connection: ConnectionConfig,
    /// Logical database name -> connection URI.
    pub databases: BTreeMap<String, String>,
    /// Extra or overriding structural contracts, keyed by collection name.
    pub collections: BTreeMap<String, CollectionConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    pub body_limit: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            body_limit: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub connect_timeout_ms: u64,
    pub ping_retries: usize,
    pub sqlite_max_connections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3000,
            ping_retries: 2,
            sqlite_max_connections: 5,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub fields: BTreeMap<String, FieldRule>,
    /// Drop fields the contract does not declare.
    pub strict: bool,
    pub indexes: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            strict: true,
            indexes: Vec::new(),
        }
    }
}

impl Config {
    /// Layer defaults, `config.toml` (or `$DOCGATE_CONFIG`) and `DOCGATE_*` env vars.
    pub fn load() -> Result<Self, GatewayError> {
        let path = std::env::var_os("DOCGATE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        if cfg.databases.is_empty() {
            return Err(GatewayError::Config(Box::new(figment::Error::from(
                "no databases configured; set [databases] or DOCGATE_DATABASES__<NAME>".to_string(),
            ))));
        }
        Ok(cfg)
    }
}

/// Render a connection URI safe for logs: credentials are masked.
pub fn redact_uri(uri: &str) -> String {
    let Ok(mut url) = Url::parse(uri) else {
        return "<unparseable uri>".to_string();
    };
    if url.password().is_some() {
        let _ = url.set_password(Some("****"));
    }
    url.to_string()
}
