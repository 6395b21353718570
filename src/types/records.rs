use crate::error::GatewayError;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless document as it crosses the HTTP boundary.
pub type Record = Map<String, Value>;

/// Lazy, single-pass cursor over a collection.
pub type RecordStream = BoxStream<'static, Result<Record, GatewayError>>;

/// Field carrying a record's generated identity.
pub const ID_FIELD: &str = "_id";

/// Attach the identity to a stored record.
pub fn with_id(id: impl Into<String>, record: Record) -> Record {
    let mut out = Record::with_capacity(record.len() + 1);
    out.insert(ID_FIELD.to_string(), Value::String(id.into()));
    out.extend(record.into_iter().filter(|(k, _)| k != ID_FIELD));
    out
}

/// Overlay `partial` onto `current`; `_id` in either is discarded.
pub fn merge(mut current: Record, partial: Record) -> Record {
    current.remove(ID_FIELD);
    current.extend(partial.into_iter().filter(|(k, _)| k != ID_FIELD));
    current
}

/// POST /insert body: exactly one of `document` or `documents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsertBody {
    pub document: Option<Record>,
    pub documents: Option<Vec<Record>>,
}

/// PUT /update body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBody {
    pub update: Option<Record>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedOne {
    pub inserted_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedMany {
    pub inserted_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub deleted: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overrides_and_ignores_id() {
        let current = json!({"_id": "a", "name": "Widget", "price": 1})
            .as_object()
            .cloned()
            .unwrap();
        let partial = json!({"_id": "b", "price": 5}).as_object().cloned().unwrap();
        let merged = merge(current, partial);
        assert_eq!(
            Value::Object(merged),
            json!({"name": "Widget", "price": 5})
        );
    }

    #[test]
    fn with_id_replaces_stale_id() {
        let rec = json!({"_id": "old", "name": "x"}).as_object().cloned().unwrap();
        let out = with_id("new", rec);
        assert_eq!(out.get(ID_FIELD), Some(&json!("new")));
        assert_eq!(out.len(), 2);
    }
}
