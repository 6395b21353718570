use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;

use crate::middleware::{InsertPayload, UpdatePayload};
use crate::types::records::{Deleted, InsertedMany, InsertedOne, Record};
use crate::{GatewayError, router::GatewayState};

/// GET /find/{database}/{collection}
pub async fn find_all(
    State(state): State<GatewayState>,
    Path((database, collection)): Path<(String, String)>,
) -> Result<Json<Vec<Record>>, GatewayError> {
    let accessor = state.models.get_accessor(&database, &collection).await?;
    let records: Vec<Record> = accessor.list_all().await?.try_collect().await?;
    Ok(Json(records))
}

/// POST /insert/{database}/{collection}
pub async fn insert(
    State(state): State<GatewayState>,
    Path((database, collection)): Path<(String, String)>,
    payload: InsertPayload,
) -> Result<Response, GatewayError> {
    let accessor = state.models.get_accessor(&database, &collection).await?;
    let resp = match payload {
        InsertPayload::One(document) => {
            let inserted_id = accessor.insert_one(document).await?;
            (StatusCode::CREATED, Json(InsertedOne { inserted_id })).into_response()
        }
        InsertPayload::Many(documents) => {
            let inserted_ids = accessor.insert_many(documents).await?;
            (StatusCode::CREATED, Json(InsertedMany { inserted_ids })).into_response()
        }
    };
    Ok(resp)
}

/// DELETE /delete/{database}/{collection}/{id}
pub async fn delete_by_id(
    State(state): State<GatewayState>,
    Path((database, collection, id)): Path<(String, String, String)>,
) -> Result<Json<Deleted>, GatewayError> {
    let accessor = state.models.get_accessor(&database, &collection).await?;
    if accessor.delete_by_id(&id).await? {
        Ok(Json(Deleted { deleted: id }))
    } else {
        Err(GatewayError::NotFound(id))
    }
}

/// PUT /update/{database}/{collection}/{id}
pub async fn update_by_id(
    State(state): State<GatewayState>,
    Path((database, collection, id)): Path<(String, String, String)>,
    UpdatePayload(update): UpdatePayload,
) -> Result<Json<Record>, GatewayError> {
    let accessor = state.models.get_accessor(&database, &collection).await?;
    match accessor.update_by_id(&id, update).await? {
        Some(record) => Ok(Json(record)),
        None => Err(GatewayError::NotFound(id)),
    }
}
