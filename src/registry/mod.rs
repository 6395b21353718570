//! Process-scoped registries for connections and collection accessors.
//!
//! Layout:
//! - `single_flight.rs`: keyed cache with per-key coalesced construction
//! - `connections.rs`: database name -> shared connection
//! - `models.rs`: (database, collection) -> shared accessor

pub mod connections;
pub mod models;
pub mod single_flight;

pub use connections::{ConnectionRegistry, ConnectionState};
pub use models::{ModelKey, ModelRegistry};
pub use single_flight::{SingleFlight, SlotState};
