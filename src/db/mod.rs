//! Database module: live connections and per-collection document stores.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for the SQLite document table
//! - `sqlite.rs`: SQLite-backed connection and store (records kept as JSON text)
//! - `mongo.rs`: MongoDB-backed connection and store

pub mod mongo;
pub mod schema;
pub mod sqlite;

pub use mongo::{MongoCollection, MongoConnection};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqliteCollection, SqliteConnection, SqlitePool};

use crate::config::{ConnectionConfig, redact_uri};
use crate::error::{GatewayError, RegistryError};
use crate::schema::StructuralContract;
use crate::types::records::{Record, RecordStream};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Storage operations a collection accessor delegates to.
///
/// Records handed to `insert`/`replace` carry no `_id`; records returned by
/// `list`/`find` always carry one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self) -> Result<RecordStream, GatewayError>;

    async fn find(&self, id: &str) -> Result<Option<Record>, GatewayError>;

    /// Persist every record or none of them. Returns ids in input order.
    ///
    /// SQLite writes the batch in one transaction. MongoDB inserts without a
    /// session (standalone servers have no transactions) and deletes the
    /// batch's pre-assigned ids when the insert fails partway.
    async fn insert(&self, records: Vec<Record>) -> Result<Vec<String>, GatewayError>;

    /// Returns false when no record has this id.
    async fn replace(&self, id: &str, record: Record) -> Result<bool, GatewayError>;

    async fn delete(&self, id: &str) -> Result<bool, GatewayError>;
}

pub enum Backend {
    Mongo(MongoConnection),
    Sqlite(SqliteConnection),
}

/// Live handle to one logical database.
pub struct Connection {
    database: String,
    backend: Backend,
}

impl Connection {
    pub fn new(database: impl Into<String>, backend: Backend) -> Self {
        Self {
            database: database.into(),
            backend,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn kind(&self) -> &'static str {
        match self.backend {
            Backend::Mongo(_) => "mongodb",
            Backend::Sqlite(_) => "sqlite",
        }
    }

    /// Open a store for `collection`, applying whatever the contract asks of the backend.
    pub async fn bind(
        &self,
        collection: &str,
        contract: &dyn StructuralContract,
    ) -> Result<Arc<dyn DocumentStore>, RegistryError> {
        let store: Arc<dyn DocumentStore> = match &self.backend {
            Backend::Mongo(conn) => Arc::new(
                conn.collection(collection, &contract.indexed_fields())
                    .await
                    .map_err(|e| RegistryError::Connection {
                        database: self.database.clone(),
                        reason: format!("binding collection `{collection}` failed: {e}"),
                    })?,
            ),
            Backend::Sqlite(conn) => Arc::new(conn.collection(collection)),
        };
        Ok(store)
    }
}

/// Establishes connections; the registry calls this at most once per in-flight key.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, database: &str, uri: &str) -> Result<Connection, RegistryError>;
}

/// Default connector: the URI scheme picks the backend.
#[derive(Debug, Clone, Default)]
pub struct UriConnector {
    options: ConnectionConfig,
}

impl UriConnector {
    pub fn new(options: ConnectionConfig) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for UriConnector {
    async fn connect(&self, database: &str, uri: &str) -> Result<Connection, RegistryError> {
        let redacted = redact_uri(uri);
        let failed = |reason: String| RegistryError::Connection {
            database: database.to_string(),
            reason: reason.replace(uri, &redacted),
        };

        let backend = if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            Backend::Mongo(
                MongoConnection::connect(uri, database, &self.options)
                    .await
                    .map_err(|e| failed(e.to_string()))?,
            )
        } else if uri.starts_with("sqlite:") {
            Backend::Sqlite(
                SqliteConnection::connect(uri, &self.options)
                    .await
                    .map_err(|e| failed(e.to_string()))?,
            )
        } else {
            let scheme = uri.split_once(':').map(|(s, _)| s).unwrap_or("<none>");
            return Err(failed(format!("unsupported URI scheme `{scheme}`")));
        };

        let conn = Connection::new(database, backend);
        info!(
            database,
            uri = %redacted,
            kind = conn.kind(),
            "connection established"
        );
        Ok(conn)
    }
}
