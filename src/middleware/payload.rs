use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::GatewayError;
use crate::types::records::{InsertBody, Record, UpdateBody};

/// Body extraction failures in the gateway's error shape. Everything except an
/// oversized body is a client error.
fn reject(rejection: JsonRejection) -> Response {
    let reason = rejection.body_text();
    let err = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => GatewayError::PayloadTooLarge(reason),
        _ => GatewayError::BadRequest(reason),
    };
    err.into_response()
}

/// What a POST /insert body asks for, after the presence rules are applied.
#[derive(Debug, Clone)]
pub enum InsertPayload {
    One(Record),
    Many(Vec<Record>),
}

impl TryFrom<InsertBody> for InsertPayload {
    type Error = GatewayError;

    fn try_from(body: InsertBody) -> Result<Self, Self::Error> {
        match (body.document, body.documents) {
            (Some(doc), None) => Ok(Self::One(doc)),
            (None, Some(docs)) => Ok(Self::Many(docs)),
            (Some(_), Some(_)) => Err(GatewayError::BadRequest(
                "send either `document` or `documents`, not both".to_string(),
            )),
            (None, None) => Err(GatewayError::BadRequest(
                "missing `document` or `documents` in request body".to_string(),
            )),
        }
    }
}

impl<S> FromRequest<S> for InsertPayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = match Json::<InsertBody>::from_request(req, state).await {
            Ok(v) => v,
            Err(rejection) => return Err(reject(rejection)),
        };
        InsertPayload::try_from(body).map_err(IntoResponse::into_response)
    }
}

/// The `update` object of a PUT /update body.
#[derive(Debug, Clone)]
pub struct UpdatePayload(pub Record);

impl<S> FromRequest<S> for UpdatePayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = match Json::<UpdateBody>::from_request(req, state).await {
            Ok(v) => v,
            Err(rejection) => return Err(reject(rejection)),
        };
        match body.update {
            Some(update) => Ok(UpdatePayload(update)),
            None => Err(
                GatewayError::BadRequest("missing `update` in request body".to_string())
                    .into_response(),
            ),
        }
    }
}
