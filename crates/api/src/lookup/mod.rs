//! Lookup tables: fertilizer types, categories and companies.

pub mod service;
pub mod type_cache;

use serde::Serialize;
use serde_json::Value;

use crate::db::Row;

pub use service::LookupService;
pub use type_cache::TypeCategoryCache;

/// A fertilizer type from `m_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRecord {
    pub id: String,
    pub category: String,
}

impl TypeRecord {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: row.get("id").and_then(value_to_id)?,
            category: row
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// A category from `m_category`, `type_id` is its parent type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub type_id: Option<String>,
}

impl CategoryRecord {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: row.get("id").and_then(value_to_id)?,
            name: row
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            type_id: row.get("type_id").and_then(value_to_id),
        })
    }
}

/// Identifier text for an INTEGER or TEXT id column.
pub(crate) fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
