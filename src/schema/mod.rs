//! Structural contracts and the registration table the model registry reads.
//!
//! Layout:
//! - `contract.rs`: the `StructuralContract` capability set and the rule-table implementation
//! - `products.rs`: built-in `products` contract

pub mod contract;
pub mod products;

pub use contract::{DeclaredContract, FieldKind, FieldRule, StructuralContract};
pub use products::{PRODUCT_COLLECTION, product_contract};

use crate::config::Config;
use std::collections::HashMap;
use std::sync::Arc;

/// Closed set of collection name -> contract, populated once at start-up.
#[derive(Debug, Default)]
pub struct SchemaProvider {
    contracts: HashMap<String, Arc<dyn StructuralContract>>,
}

impl SchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in contracts only.
    pub fn builtin() -> Self {
        let mut provider = Self::new();
        provider.register(product_contract());
        provider
    }

    /// Built-ins, then every `[collections.*]` entry from config (which may override them).
    pub fn from_config(cfg: &Config) -> Self {
        let mut provider = Self::builtin();
        for (name, coll) in &cfg.collections {
            provider.register(
                DeclaredContract::new(name.clone(), coll.fields.clone())
                    .with_strict(coll.strict)
                    .with_indexes(coll.indexes.clone()),
            );
        }
        provider
    }

    pub fn register(&mut self, contract: impl StructuralContract + 'static) {
        self.contracts
            .insert(contract.collection().to_string(), Arc::new(contract));
    }

    pub fn get(&self, collection: &str) -> Option<Arc<dyn StructuralContract>> {
        self.contracts.get(collection).cloned()
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.contracts.contains_key(collection)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contracts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
