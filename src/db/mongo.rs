//! MongoDB client and collection wrapper

use backon::{ExponentialBuilder, Retryable};
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::StreamExt;
use mongodb::{Client, Collection, Database, IndexModel, options::ClientOptions};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::db::DocumentStore;
use crate::error::GatewayError;
use crate::types::records::{ID_FIELD, Record, RecordStream, with_id};
use async_trait::async_trait;

const APP_NAME: &str = "docgate";

fn ping_retry_policy(retries: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(1))
        .with_max_times(retries)
        .with_jitter()
}

/// MongoDB client wrapper bound to one database
#[derive(Clone)]
pub struct MongoConnection {
    client: Client,
    database: Database,
}

impl MongoConnection {
    /// Connect and verify with a ping; `fallback_db` is used when the URI names no database.
    pub async fn connect(
        uri: &str,
        fallback_db: &str,
        options: &ConnectionConfig,
    ) -> Result<Self, GatewayError> {
        let mut client_opts = ClientOptions::parse(uri).await?;
        client_opts.app_name = Some(APP_NAME.to_string());
        client_opts.server_selection_timeout = Some(options.connect_timeout());
        client_opts.connect_timeout = Some(options.connect_timeout());

        let client = Client::with_options(client_opts)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(fallback_db));

        (|| async { database.run_command(doc! { "ping": 1 }).await })
            .retry(ping_retry_policy(options.ping_retries))
            .notify(|err, dur: Duration| {
                warn!(
                    database = %database.name(),
                    "MongoDB ping failed ({}), retrying in {:?}",
                    err,
                    dur
                );
            })
            .await?;

        debug!(database = %database.name(), "MongoDB ping ok");
        Ok(Self { client, database })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn db_name(&self) -> &str {
        self.database.name()
    }

    /// Get a collection handle, creating the requested ascending indexes
    pub async fn collection(
        &self,
        name: &str,
        indexed_fields: &[&str],
    ) -> Result<MongoCollection, GatewayError> {
        let inner = self.database.collection::<Document>(name);

        if !indexed_fields.is_empty() {
            let indices: Vec<IndexModel> = indexed_fields
                .iter()
                .map(|field| IndexModel::builder().keys(doc! { *field: 1 }).build())
                .collect();
            inner.create_indexes(indices).await?;
        }

        Ok(MongoCollection { inner })
    }
}

/// Untyped collection; records are validated by the accessor before they get here.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    /// Unparseable ids can never match a stored record.
    fn id_filter(id: &str) -> Option<Document> {
        ObjectId::parse_str(id).ok().map(|oid| doc! { ID_FIELD: oid })
    }

    fn ids_filter(oids: &[ObjectId]) -> Document {
        let ids: Vec<Bson> = oids.iter().copied().map(Bson::ObjectId).collect();
        doc! { ID_FIELD: { "$in": ids } }
    }

    pub fn inner(&self) -> &Collection<Document> {
        &self.inner
    }
}

fn document_to_record(mut doc: Document) -> Record {
    let id = match doc.remove(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => match other.into_relaxed_extjson() {
            Value::String(s) => s,
            v => v.to_string(),
        },
        None => String::new(),
    };
    let record = doc
        .into_iter()
        .map(|(k, v)| (k, v.into_relaxed_extjson()))
        .collect();
    with_id(id, record)
}

/// Inverse of `document_to_record`: relaxed extended JSON such as `{"$date": ..}`
/// goes back to its BSON type instead of becoming a subdocument.
fn record_to_document(record: Record) -> Result<Document, GatewayError> {
    Document::try_from(record)
        .map_err(|e| GatewayError::BadRequest(format!("invalid extended JSON value: {e}")))
}

#[async_trait]
impl DocumentStore for MongoCollection {
    async fn list(&self) -> Result<RecordStream, GatewayError> {
        let cursor = self.inner.find(doc! {}).await?;
        Ok(cursor
            .map(|res| res.map(document_to_record).map_err(GatewayError::from))
            .boxed())
    }

    async fn find(&self, id: &str) -> Result<Option<Record>, GatewayError> {
        let Some(filter) = Self::id_filter(id) else {
            return Ok(None);
        };
        Ok(self.inner.find_one(filter).await?.map(document_to_record))
    }

    async fn insert(&self, records: Vec<Record>) -> Result<Vec<String>, GatewayError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let mut oids = Vec::with_capacity(records.len());
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            let oid = ObjectId::new();
            let mut doc = record_to_document(record)?;
            doc.insert(ID_FIELD, oid);
            oids.push(oid);
            docs.push(doc);
        }

        if let Err(err) = self.inner.insert_many(docs).await {
            // Ordered inserts stop at the first failure; remove what landed before it.
            if let Err(cleanup) = self.inner.delete_many(Self::ids_filter(&oids)).await {
                warn!(
                    collection = %self.inner.name(),
                    error = %cleanup,
                    "could not roll back partial insert"
                );
            }
            return Err(err.into());
        }
        Ok(oids.into_iter().map(ObjectId::to_hex).collect())
    }

    async fn replace(&self, id: &str, record: Record) -> Result<bool, GatewayError> {
        let Some(filter) = Self::id_filter(id) else {
            return Ok(false);
        };
        let replacement = record_to_document(record)?;
        let res = self.inner.replace_one(filter, replacement).await?;
        Ok(res.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let Some(filter) = Self::id_filter(id) else {
            return Ok(false);
        };
        let res = self.inner.delete_one(filter).await?;
        Ok(res.deleted_count > 0)
    }
}
