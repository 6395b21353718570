use super::contract::{DeclaredContract, FieldKind, FieldRule};
use std::collections::BTreeMap;

pub const PRODUCT_COLLECTION: &str = "products";

/// `name`: required trimmed string; `price`: required non-negative number.
pub fn product_contract() -> DeclaredContract {
    let mut fields = BTreeMap::new();
    fields.insert(
        "name".to_string(),
        FieldRule::of(FieldKind::String).required().trimmed(),
    );
    fields.insert(
        "price".to_string(),
        FieldRule::of(FieldKind::Number).required().min(0.0),
    );
    DeclaredContract::new(PRODUCT_COLLECTION, fields)
}
