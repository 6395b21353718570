pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod schema;
pub mod service;
pub mod types;

pub use error::{GatewayError, RegistryError, ValidationError};
pub use registry::{ConnectionRegistry, ModelRegistry};
pub use service::CollectionAccessor;
