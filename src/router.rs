use crate::config::Config;
use crate::handlers::collections;
use crate::registry::ModelRegistry;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayState {
    pub models: Arc<ModelRegistry>,
}

impl GatewayState {
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self { models }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(Arc::new(ModelRegistry::from_config(cfg)))
    }
}

pub fn gateway_router(state: GatewayState, body_limit: usize) -> Router {
    Router::new()
        .route("/find/{database}/{collection}", get(collections::find_all))
        .route("/insert/{database}/{collection}", post(collections::insert))
        .route(
            "/delete/{database}/{collection}/{id}",
            delete(collections::delete_by_id),
        )
        .route(
            "/update/{database}/{collection}/{id}",
            put(collections::update_by_id),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
