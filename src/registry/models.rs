use crate::config::Config;
use crate::error::RegistryError;
use crate::registry::connections::ConnectionRegistry;
use crate::registry::single_flight::SingleFlight;
use crate::schema::SchemaProvider;
use crate::service::accessor::CollectionAccessor;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Composite cache key. Kept as a pair so `("ab", "c")` and `("a", "bc")` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub database: String,
    pub collection: String,
}

impl ModelKey {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database, self.collection)
    }
}

/// (database, collection) -> the one shared accessor for it.
pub struct ModelRegistry {
    connections: Arc<ConnectionRegistry>,
    schemas: Arc<SchemaProvider>,
    cache: SingleFlight<ModelKey, Arc<CollectionAccessor>, RegistryError>,
}

impl ModelRegistry {
    pub fn new(connections: Arc<ConnectionRegistry>, schemas: Arc<SchemaProvider>) -> Self {
        Self {
            connections,
            schemas,
            cache: SingleFlight::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            Arc::new(ConnectionRegistry::from_config(cfg)),
            Arc::new(SchemaProvider::from_config(cfg)),
        )
    }

    /// Resolve the accessor for `collection` in `database`.
    ///
    /// The connection is resolved before the schema lookup, so an unknown
    /// collection still leaves a valid database's connection cached.
    pub async fn get_accessor(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Arc<CollectionAccessor>, RegistryError> {
        let key = ModelKey::new(database, collection);
        if let Some(accessor) = self.cache.get(&key) {
            debug!(model = %key, "reusing cached accessor");
            return Ok(accessor);
        }

        let connections = Arc::clone(&self.connections);
        let schemas = Arc::clone(&self.schemas);
        let build_key = key.clone();
        self.cache
            .get_or_try_init(key, move || async move {
                let connection = connections.get_connection(&build_key.database).await?;
                let contract = schemas
                    .get(&build_key.collection)
                    .ok_or_else(|| RegistryError::UnknownCollection(build_key.collection.clone()))?;
                let store = connection
                    .bind(&build_key.collection, contract.as_ref())
                    .await?;
                info!(model = %build_key, kind = connection.kind(), "collection accessor ready");
                Ok(Arc::new(CollectionAccessor::new(
                    build_key, connection, contract, store,
                )))
            })
            .await
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn schemas(&self) -> &Arc<SchemaProvider> {
        &self.schemas
    }

    /// Number of cached accessors.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Accessor constructions started so far, including failed ones.
    pub fn constructions(&self) -> usize {
        self.cache.constructions()
    }
}
