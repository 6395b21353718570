use crate::config::ConnectionConfig;
use crate::db::DocumentStore;
use crate::db::schema::SQLITE_INIT;
use crate::error::GatewayError;
use crate::types::records::{Record, RecordStream, with_id};
use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub type SqlitePool = Pool<Sqlite>;

/// Rows buffered ahead of the consumer while listing.
const LIST_BUFFER: usize = 64;

#[derive(Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    pub async fn connect(uri: &str, options: &ConnectionConfig) -> Result<Self, GatewayError> {
        let connect_opts = SqliteConnectOptions::from_str(uri)?.create_if_missing(true);

        // Every in-memory connection is its own database: pin exactly one and never recycle it.
        let pool_opts = if uri.contains(":memory:") || uri.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(options.sqlite_max_connections.max(1))
        };

        let pool = pool_opts
            .acquire_timeout(options.connect_timeout())
            .connect_with(connect_opts)
            .await?;
        let conn = Self { pool };
        conn.init_schema().await?;
        Ok(conn)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    async fn init_schema(&self) -> Result<(), GatewayError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn collection(&self, name: &str) -> SqliteCollection {
        SqliteCollection {
            pool: self.pool.clone(),
            collection: name.to_string(),
        }
    }
}

/// One collection's slice of the shared `documents` table.
#[derive(Clone)]
pub struct SqliteCollection {
    pool: SqlitePool,
    collection: String,
}

impl SqliteCollection {
    pub fn name(&self) -> &str {
        &self.collection
    }

    fn row_to_record(row: SqliteRow) -> Result<Record, GatewayError> {
        let id: String = row.try_get("id")?;
        let body: String = row.try_get("body")?;
        let record: Record = serde_json::from_str(&body)?;
        Ok(with_id(id, record))
    }
}

#[async_trait]
impl DocumentStore for SqliteCollection {
    async fn list(&self) -> Result<RecordStream, GatewayError> {
        let (tx, rx) = mpsc::channel(LIST_BUFFER);
        let pool = self.pool.clone();
        let collection = self.collection.clone();

        tokio::spawn(async move {
            let mut rows =
                sqlx::query("SELECT id, body FROM documents WHERE collection = ? ORDER BY seq")
                    .bind(&collection)
                    .fetch(&pool);
            while let Some(row) = rows.next().await {
                let item = row
                    .map_err(GatewayError::from)
                    .and_then(SqliteCollection::row_to_record);
                let stop = item.is_err();
                // Receiver dropped: the consumer stopped reading.
                if tx.send(item).await.is_err() || stop {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn find(&self, id: &str) -> Result<Option<Record>, GatewayError> {
        let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
            .bind(&self.collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_record).transpose()
    }

    /// Batch insert using a single transaction. Returns ids in the same order.
    async fn insert(&self, records: Vec<Record>) -> Result<Vec<String>, GatewayError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let id = ObjectId::new().to_hex();
            let body = serde_json::to_string(&record)?;
            sqlx::query(
                r#"INSERT INTO documents (id, collection, body, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&id)
            .bind(&self.collection)
            .bind(body)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn replace(&self, id: &str, record: Record) -> Result<bool, GatewayError> {
        let body = serde_json::to_string(&record)?;
        let res = sqlx::query(
            "UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .bind(&self.collection)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let res = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(&self.collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
