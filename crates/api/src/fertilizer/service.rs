//! Fertilizer search execution and record lookups.

use std::sync::Arc;

use serde_json::Value;

use super::query_builder::FilterQuery;
use super::types::{COMPONENT_COLUMNS, CategorySelector, FilterSpec};
use super::validation::{RawQuery, validate_components};
use crate::db::{Database, Row, SqlValue};
use crate::error::{ApiError, ApiResult, ErrorDetail};
use crate::lookup::TypeCategoryCache;

const FIND_BY_ID_SQL: &str = "SELECT * FROM t_fertilizers WHERE id = ?";

const STATS_SQL: &str = "SELECT \
     COUNT(*) AS total_count, \
     COUNT(DISTINCT company) AS company_count, \
     MIN(reg_date) AS earliest_reg_date, \
     MAX(reg_date) AS latest_reg_date, \
     AVG(nitrogen) AS avg_nitrogen, \
     AVG(phos) AS avg_phos, \
     AVG(k) AS avg_k \
     FROM t_fertilizers";

const COMPONENT_SEARCH_SQL: &str = "SELECT * FROM t_fertilizers \
     WHERE nitrogen BETWEEN ? AND ? \
     AND phos BETWEEN ? AND ? \
     AND k BETWEEN ? AND ? \
     ORDER BY id";

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub rows: Vec<Row>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Service running fertilizer queries.
pub struct FertilizerService {
    db: Arc<dyn Database>,
    type_cache: Arc<TypeCategoryCache>,
}

impl FertilizerService {
    pub fn new(db: Arc<dyn Database>, type_cache: Arc<TypeCategoryCache>) -> Arc<Self> {
        Arc::new(Self { db, type_cache })
    }

    /// Run a validated search: total count plus the requested page.
    pub async fn search(&self, spec: &FilterSpec) -> ApiResult<SearchResult> {
        let type_categories = match &spec.category_selector {
            CategorySelector::Type(type_id) => self.type_cache.resolve(type_id).await,
            CategorySelector::All | CategorySelector::Tags(_) => Vec::new(),
        };

        let query = FilterQuery::build(spec, &type_categories);
        let count_sql = query.count_sql();
        let data_sql = query.data_sql();

        tracing::debug!(
            sql = %data_sql,
            predicates = query.predicates().len(),
            "executing fertilizer search"
        );

        let total = self
            .db
            .first(&count_sql, &query.where_binds())
            .await
            .map_err(ApiError::query)?
            .and_then(|row| row.get("count").and_then(Value::as_u64))
            .unwrap_or(0);

        let rows = self
            .db
            .all(&data_sql, &query.data_binds())
            .await
            .map_err(ApiError::query)?;

        tracing::debug!(total, returned = rows.len(), "fertilizer search complete");

        Ok(SearchResult {
            rows,
            total,
            page: spec.page,
            per_page: spec.per_page.get(),
        })
    }

    /// A single fertilizer by numeric id.
    pub async fn get_by_id(&self, id: &str) -> ApiResult<Row> {
        let Ok(numeric_id) = id.trim().parse::<i64>() else {
            return Err(ApiError::invalid_parameter(
                "id",
                "invalid fertilizer id",
                "id must be numeric",
            ));
        };

        let row = self
            .db
            .first(FIND_BY_ID_SQL, &[SqlValue::Integer(numeric_id)])
            .await
            .map_err(ApiError::query)?;

        row.ok_or_else(|| ApiError::NotFound {
            message: format!("fertilizer {numeric_id} not found"),
            details: vec![ErrorDetail::field("id", "no fertilizer with this id")],
        })
    }

    /// Aggregate statistics over the whole registry.
    pub async fn stats(&self) -> ApiResult<Row> {
        let row = self
            .db
            .first(STATS_SQL, &[])
            .await
            .map_err(ApiError::query)?;
        Ok(row.unwrap_or_default())
    }

    /// Fertilizers whose nitrogen, phosphate and potash all lie in range.
    pub async fn search_by_components(&self, raw: &RawQuery) -> ApiResult<Vec<Row>> {
        let Some(json) = raw.json("components") else {
            return Err(ApiError::missing_parameter(
                "components",
                "components must be provided",
            ));
        };

        let components = validate_components(json)?;

        let mut binds = Vec::with_capacity(COMPONENT_COLUMNS.len() * 2);
        for column in COMPONENT_COLUMNS {
            let Some(filter) = components.get(column) else {
                return Err(ApiError::invalid_parameter(
                    "components",
                    "missing required components",
                    "nitrogen, phos and k must all be specified",
                ));
            };
            binds.push(SqlValue::Real(filter.min));
            binds.push(SqlValue::Real(filter.max));
        }

        let rows = self
            .db
            .all(COMPONENT_SEARCH_SQL, &binds)
            .await
            .map_err(ApiError::query)?;

        tracing::debug!(count = rows.len(), "component search complete");
        Ok(rows)
    }
}
