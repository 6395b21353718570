use docgate::config::Config;
use docgate::registry::ModelRegistry;
use docgate::types::records::Record;
use docgate::{CollectionAccessor, GatewayError};
use futures::TryStreamExt;
use serde_json::{Value, json};
use std::sync::Arc;

fn record(v: Value) -> Record {
    v.as_object().cloned().expect("test record must be an object")
}

async fn products() -> Arc<CollectionAccessor> {
    let mut cfg = Config::default();
    cfg.databases
        .insert("shop".to_string(), "sqlite::memory:".to_string());
    let models = ModelRegistry::from_config(&cfg);
    models
        .get_accessor("shop", "products")
        .await
        .expect("products accessor")
}

async fn list(accessor: &CollectionAccessor) -> Vec<Record> {
    accessor
        .list_all()
        .await
        .expect("list")
        .try_collect()
        .await
        .expect("collect")
}

#[tokio::test]
async fn empty_collection_lists_nothing() {
    let accessor = products().await;
    assert!(list(&accessor).await.is_empty());
}

#[tokio::test]
async fn insert_list_delete_round_trip() {
    let accessor = products().await;

    let id = accessor
        .insert_one(record(json!({"name": "Widget", "price": 9.99})))
        .await
        .expect("insert widget");
    assert!(!id.is_empty());

    let all = list(&accessor).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get("_id"), Some(&json!(id)));
    assert_eq!(all[0].get("name"), Some(&json!("Widget")));
    assert_eq!(all[0].get("price"), Some(&json!(9.99)));

    assert!(accessor.delete_by_id(&id).await.unwrap());
    assert!(list(&accessor).await.is_empty());
}

#[tokio::test]
async fn invalid_record_is_not_persisted() {
    let accessor = products().await;

    let err = accessor
        .insert_one(record(json!({"name": "Bad", "price": -1})))
        .await
        .unwrap_err();
    match err {
        GatewayError::Validation(v) => assert_eq!(v.violations[0].field, "price"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(list(&accessor).await.is_empty());
}

#[tokio::test]
async fn insert_many_is_all_or_nothing() {
    let accessor = products().await;

    let err = accessor
        .insert_many(vec![
            record(json!({"name": "A", "price": 1})),
            record(json!({"name": "B"})),
            record(json!({"name": "C", "price": -3})),
        ])
        .await
        .unwrap_err();
    let GatewayError::Validation(v) = err else {
        panic!("expected validation error");
    };
    let fields: Vec<_> = v.violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["documents[1].price", "documents[2].price"]);
    assert!(list(&accessor).await.is_empty());

    let ids = accessor
        .insert_many(vec![
            record(json!({"name": "A", "price": 1})),
            record(json!({"name": "B", "price": 2})),
        ])
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    let names: Vec<_> = list(&accessor)
        .await
        .into_iter()
        .map(|r| r.get("name").cloned().unwrap())
        .collect();
    assert_eq!(names, vec![json!("A"), json!("B")]);
}

#[tokio::test]
async fn update_merges_and_revalidates() {
    let accessor = products().await;
    let id = accessor
        .insert_one(record(json!({"name": "Widget", "price": 9.99})))
        .await
        .unwrap();

    let updated = accessor
        .update_by_id(&id, record(json!({"price": 5})))
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(updated.get("_id"), Some(&json!(id)));
    assert_eq!(updated.get("name"), Some(&json!("Widget")));
    assert_eq!(updated.get("price"), Some(&json!(5)));

    let err = accessor
        .update_by_id(&id, record(json!({"price": -2})))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation(_)));
    assert_eq!(list(&accessor).await[0].get("price"), Some(&json!(5)));
}

#[tokio::test]
async fn missing_ids_are_normal_outcomes() {
    let accessor = products().await;
    assert!(
        accessor
            .update_by_id("nonexistent-id", record(json!({"price": 5})))
            .await
            .unwrap()
            .is_none()
    );
    assert!(!accessor.delete_by_id("nonexistent-id").await.unwrap());
}
