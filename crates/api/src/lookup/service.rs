//! Lookup queries for types, categories and companies.

use std::sync::Arc;

use serde_json::Value;

use super::{CategoryRecord, TypeRecord};
use crate::db::{Database, SqlValue};
use crate::error::{ApiError, ApiResult};

const TYPES_SQL: &str = "SELECT DISTINCT id, category FROM m_type WHERE id IS NOT NULL ORDER BY id";

const COMPANIES_SQL: &str =
    "SELECT DISTINCT company FROM t_fertilizers WHERE company IS NOT NULL ORDER BY company";

const CATEGORIES_BY_TYPE_SQL: &str = "SELECT id, name, master_id AS type_id FROM m_category \
     WHERE master_id = ? AND id IS NOT NULL ORDER BY id";

const CATEGORY_BY_ID_SQL: &str =
    "SELECT id, name, master_id AS type_id FROM m_category WHERE id = ?";

/// Service for the lookup tables.
pub struct LookupService {
    db: Arc<dyn Database>,
}

impl LookupService {
    pub fn new(db: Arc<dyn Database>) -> Arc<Self> {
        Arc::new(Self { db })
    }

    /// All fertilizer types.
    pub async fn types(&self) -> ApiResult<Vec<TypeRecord>> {
        let rows = self.db.all(TYPES_SQL, &[]).await.map_err(ApiError::query)?;
        let types: Vec<_> = rows.iter().filter_map(TypeRecord::from_row).collect();
        tracing::debug!(count = types.len(), "loaded types");
        Ok(types)
    }

    /// Distinct registered company names.
    pub async fn companies(&self) -> ApiResult<Vec<String>> {
        let rows = self
            .db
            .all(COMPANIES_SQL, &[])
            .await
            .map_err(ApiError::query)?;
        let companies: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("company").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        tracing::debug!(count = companies.len(), "loaded companies");
        Ok(companies)
    }

    /// Categories belonging to a type.
    pub async fn categories_by_type(&self, type_id: &str) -> ApiResult<Vec<CategoryRecord>> {
        let rows = self
            .db
            .all(CATEGORIES_BY_TYPE_SQL, &[SqlValue::from_id(type_id)])
            .await
            .map_err(ApiError::query)?;
        let categories: Vec<_> = rows.iter().filter_map(CategoryRecord::from_row).collect();
        tracing::debug!(type_id, count = categories.len(), "loaded categories");
        Ok(categories)
    }

    /// A single category.
    pub async fn category_by_id(&self, id: &str) -> ApiResult<CategoryRecord> {
        let row = self
            .db
            .first(CATEGORY_BY_ID_SQL, &[SqlValue::from_id(id)])
            .await
            .map_err(ApiError::query)?;

        row.as_ref()
            .and_then(CategoryRecord::from_row)
            .ok_or_else(|| ApiError::not_found(format!("category {id} not found")))
    }
}
