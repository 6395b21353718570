use crate::db::{Connection, DocumentStore};
use crate::error::{FieldViolation, GatewayError, ValidationError};
use crate::registry::ModelKey;
use crate::schema::StructuralContract;
use crate::types::records::{Record, RecordStream, merge, with_id};
use std::sync::Arc;
use tracing::debug;

/// Typed handle for one collection in one database. Immutable once built.
pub struct CollectionAccessor {
    key: ModelKey,
    connection: Arc<Connection>,
    contract: Arc<dyn StructuralContract>,
    store: Arc<dyn DocumentStore>,
}

impl CollectionAccessor {
    pub fn new(
        key: ModelKey,
        connection: Arc<Connection>,
        contract: Arc<dyn StructuralContract>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            key,
            connection,
            contract,
            store,
        }
    }

    pub fn key(&self) -> &ModelKey {
        &self.key
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn contract(&self) -> &Arc<dyn StructuralContract> {
        &self.contract
    }

    /// Stream every record in the collection. Empty collections yield an empty stream.
    pub async fn list_all(&self) -> Result<RecordStream, GatewayError> {
        self.store.list().await
    }

    pub async fn insert_one(&self, record: Record) -> Result<String, GatewayError> {
        let valid = self.contract.validate(record)?;
        let id = self
            .store
            .insert(vec![valid])
            .await?
            .pop()
            .ok_or_else(|| GatewayError::Internal("store returned no id".to_string()))?;
        debug!(model = %self.key, id = %id, "inserted record");
        Ok(id)
    }

    /// All-or-nothing: nothing is written unless every record validates.
    pub async fn insert_many(&self, records: Vec<Record>) -> Result<Vec<String>, GatewayError> {
        let mut valid = Vec::with_capacity(records.len());
        let mut violations = Vec::new();

        for (idx, record) in records.into_iter().enumerate() {
            match self.contract.validate(record) {
                Ok(r) => valid.push(r),
                Err(e) => violations.extend(e.violations.into_iter().map(|v| {
                    FieldViolation::new(format!("documents[{idx}].{}", v.field), v.message)
                })),
            }
        }

        if !violations.is_empty() {
            return Err(ValidationError {
                collection: self.contract.collection().to_string(),
                violations,
            }
            .into());
        }
        if valid.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.store.insert(valid).await?;
        debug!(model = %self.key, count = ids.len(), "inserted records");
        Ok(ids)
    }

    /// Returns false when no record has this id.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool, GatewayError> {
        let found = self.store.delete(id).await?;
        debug!(model = %self.key, id, found, "delete by id");
        Ok(found)
    }

    /// Merge `partial` into the stored record and re-validate the result.
    /// Returns `None` when no record has this id.
    pub async fn update_by_id(
        &self,
        id: &str,
        partial: Record,
    ) -> Result<Option<Record>, GatewayError> {
        let Some(current) = self.store.find(id).await? else {
            return Ok(None);
        };
        let valid = self.contract.validate(merge(current, partial))?;
        if !self.store.replace(id, valid.clone()).await? {
            // Deleted between the read and the write.
            return Ok(None);
        }
        debug!(model = %self.key, id, "updated record");
        Ok(Some(with_id(id, valid)))
    }
}
