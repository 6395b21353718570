use crate::error::{FieldViolation, ValidationError};
use crate::types::records::{ID_FIELD, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Capability set every collection schema exposes to the registry.
pub trait StructuralContract: Debug + Send + Sync {
    fn collection(&self) -> &str;

    fn required_fields(&self) -> Vec<&str>;

    /// Check `record` and return its normalized form (trimmed, defaulted,
    /// undeclared fields dropped when strict).
    fn validate(&self, record: Record) -> Result<Record, ValidationError>;

    /// Fields the storage backend should index on bind.
    fn indexed_fields(&self) -> Vec<&str> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    #[default]
    Any,
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::Array => "an array",
            FieldKind::Object => "an object",
            FieldKind::Any => "any value",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldRule {
    pub kind: FieldKind,
    pub required: bool,
    pub trim: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub one_of: Option<Vec<Value>>,
    pub default: Option<Value>,
}

impl FieldRule {
    pub fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Apply this rule to one present value, returning the normalized value.
    fn check(&self, value: Value) -> Result<Value, String> {
        let value = match (self.kind, value) {
            (FieldKind::String, Value::String(s)) => {
                let s = if self.trim { s.trim().to_string() } else { s };
                if self.required && s.is_empty() {
                    return Err("is required".to_string());
                }
                let len = s.chars().count();
                if let Some(min) = self.min_length
                    && len < min
                {
                    return Err(format!("must be at least {min} characters"));
                }
                if let Some(max) = self.max_length
                    && len > max
                {
                    return Err(format!("must be at most {max} characters"));
                }
                Value::String(s)
            }
            (FieldKind::Number, v @ Value::Number(_)) => {
                self.check_bounds(&v)?;
                v
            }
            (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                let v = Value::Number(n);
                self.check_bounds(&v)?;
                v
            }
            (FieldKind::Boolean, v @ Value::Bool(_))
            | (FieldKind::Array, v @ Value::Array(_))
            | (FieldKind::Object, v @ Value::Object(_))
            | (FieldKind::Any, v) => v,
            (kind, _) => return Err(format!("must be {}", kind.describe())),
        };

        if let Some(allowed) = &self.one_of
            && !allowed.contains(&value)
        {
            return Err("is not one of the allowed values".to_string());
        }
        Ok(value)
    }

    fn check_bounds(&self, value: &Value) -> Result<(), String> {
        let Some(n) = value.as_f64() else {
            return Ok(());
        };
        if let Some(min) = self.min
            && n < min
        {
            return Err(format!("must be at least {min}"));
        }
        if let Some(max) = self.max
            && n > max
        {
            return Err(format!("must be at most {max}"));
        }
        Ok(())
    }
}

/// Contract built from a table of per-field rules.
#[derive(Debug, Clone)]
pub struct DeclaredContract {
    collection: String,
    fields: BTreeMap<String, FieldRule>,
    strict: bool,
    indexes: Vec<String>,
}

impl DeclaredContract {
    pub fn new(collection: impl Into<String>, fields: BTreeMap<String, FieldRule>) -> Self {
        Self {
            collection: collection.into(),
            fields,
            strict: true,
            indexes: Vec::new(),
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_indexes(mut self, indexes: Vec<String>) -> Self {
        self.indexes = indexes;
        self
    }
}

impl StructuralContract for DeclaredContract {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, rule)| rule.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn validate(&self, mut record: Record) -> Result<Record, ValidationError> {
        record.remove(ID_FIELD);

        let mut out = Record::new();
        let mut violations = Vec::new();

        for (name, rule) in &self.fields {
            let value = match record.remove(name) {
                Some(Value::Null) | None => rule.default.clone(),
                Some(v) => Some(v),
            };
            match value {
                Some(v) => match rule.check(v) {
                    Ok(v) => {
                        out.insert(name.clone(), v);
                    }
                    Err(msg) => violations.push(FieldViolation::new(name, msg)),
                },
                None if rule.required => {
                    violations.push(FieldViolation::new(name, "is required"));
                }
                None => {}
            }
        }

        if !self.strict {
            out.extend(record);
        }

        if violations.is_empty() {
            Ok(out)
        } else {
            Err(ValidationError {
                collection: self.collection.clone(),
                violations,
            })
        }
    }

    fn indexed_fields(&self) -> Vec<&str> {
        self.indexes.iter().map(String::as_str).collect()
    }
}
