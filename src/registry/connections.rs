use crate::config::{Config, redact_uri};
use crate::db::{Connection, Connector, UriConnector};
use crate::error::RegistryError;
use crate::registry::single_flight::{SingleFlight, SlotState};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transport state of a database as seen by the registry.
///
/// There is no `Failed` state: a failed attempt is never cached, so the
/// database reads as absent (`state` returns `None`) and the next lookup
/// connects again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
}

/// Logical database name -> the one shared live connection for it.
pub struct ConnectionRegistry {
    uris: HashMap<String, String>,
    connector: Arc<dyn Connector>,
    cache: SingleFlight<String, Arc<Connection>, RegistryError>,
}

impl ConnectionRegistry {
    pub fn new(uris: HashMap<String, String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            uris,
            connector,
            cache: SingleFlight::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let uris = cfg
            .databases
            .iter()
            .map(|(name, uri)| (name.clone(), uri.clone()))
            .collect();
        Self::new(uris, Arc::new(UriConnector::new(cfg.connection.clone())))
    }

    /// Resolve the connection for `database`, establishing it on first use.
    pub async fn get_connection(&self, database: &str) -> Result<Arc<Connection>, RegistryError> {
        if let Some(conn) = self.cache.get(&database.to_string()) {
            debug!(database, "reusing cached connection");
            return Ok(conn);
        }

        let uri = self
            .uris
            .get(database)
            .cloned()
            .ok_or_else(|| RegistryError::UnconfiguredDatabase(database.to_string()))?;

        let connector = Arc::clone(&self.connector);
        let name = database.to_string();
        self.cache
            .get_or_try_init(database.to_string(), move || async move {
                info!(database = %name, uri = %redact_uri(&uri), "establishing connection");
                match connector.connect(&name, &uri).await {
                    Ok(conn) => Ok(Arc::new(conn)),
                    Err(e) => {
                        warn!(database = %name, error = %e, "connection attempt failed");
                        Err(e)
                    }
                }
            })
            .await
    }

    pub fn is_configured(&self, database: &str) -> bool {
        self.uris.contains_key(database)
    }

    pub fn state(&self, database: &str) -> Option<ConnectionState> {
        self.cache
            .state(&database.to_string())
            .map(|state| match state {
                SlotState::Constructing => ConnectionState::Connecting,
                SlotState::Ready => ConnectionState::Open,
            })
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Establishment attempts so far, including failed ones.
    pub fn attempts(&self) -> usize {
        self.cache.constructions()
    }
}
