pub mod payload;

pub use payload::{InsertPayload, UpdatePayload};
