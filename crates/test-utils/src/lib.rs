//! Fertilizer API test utilities.
//!
//! Fixture builders that seed the registry tables, and assertion helpers
//! for JSON responses.

use sqlx::SqlitePool;

/// Create a test fertilizer with default values.
///
/// Defaults: level 1, registration date 2020-01-01, no composition values.
pub fn test_fertilizer(id: i64, prod_name: &str) -> TestFertilizer {
    TestFertilizer {
        id,
        level: 1,
        reg_no: format!("REG-{id:05}"),
        reg_date: Some("2020-01-01".to_string()),
        company: Some("Test Fertilizer Co.".to_string()),
        prod_name: prod_name.to_string(),
        form_name: None,
        shape: None,
        effect: None,
        category_id: None,
        nitrogen: None,
        phos: None,
        k: None,
    }
}

/// A fertilizer row builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestFertilizer {
    pub id: i64,
    pub level: i64,
    pub reg_no: String,
    pub reg_date: Option<String>,
    pub company: Option<String>,
    pub prod_name: String,
    pub form_name: Option<String>,
    pub shape: Option<String>,
    pub effect: Option<String>,
    pub category_id: Option<i64>,
    pub nitrogen: Option<f64>,
    pub phos: Option<f64>,
    pub k: Option<f64>,
}

impl TestFertilizer {
    /// Set the registration level.
    pub fn with_level(mut self, level: i64) -> Self {
        self.level = level;
        self
    }

    /// Set the registration number.
    pub fn with_reg_no(mut self, reg_no: &str) -> Self {
        self.reg_no = reg_no.to_string();
        self
    }

    /// Set the registration date (`YYYY-MM-DD`).
    pub fn with_reg_date(mut self, reg_date: &str) -> Self {
        self.reg_date = Some(reg_date.to_string());
        self
    }

    /// Set the company.
    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    /// Clear the company.
    pub fn without_company(mut self) -> Self {
        self.company = None;
        self
    }

    /// Set the form name.
    pub fn with_form_name(mut self, form_name: &str) -> Self {
        self.form_name = Some(form_name.to_string());
        self
    }

    /// Set the shape.
    pub fn with_shape(mut self, shape: &str) -> Self {
        self.shape = Some(shape.to_string());
        self
    }

    /// Set the effect.
    pub fn with_effect(mut self, effect: &str) -> Self {
        self.effect = Some(effect.to_string());
        self
    }

    /// Set the category.
    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Set nitrogen, phosphate and potash percentages.
    pub fn with_npk(mut self, nitrogen: f64, phos: f64, k: f64) -> Self {
        self.nitrogen = Some(nitrogen);
        self.phos = Some(phos);
        self.k = Some(k);
        self
    }

    /// Insert the row into `t_fertilizers`.
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO t_fertilizers \
             (id, level, reg_no, reg_date, company, prod_name, form_name, shape, effect, \
              category_id, nitrogen, phos, k) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.level)
        .bind(&self.reg_no)
        .bind(&self.reg_date)
        .bind(&self.company)
        .bind(&self.prod_name)
        .bind(&self.form_name)
        .bind(&self.shape)
        .bind(&self.effect)
        .bind(self.category_id)
        .bind(self.nitrogen)
        .bind(self.phos)
        .bind(self.k)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Insert a fertilizer type into `m_type`.
pub async fn seed_type(pool: &SqlitePool, id: i64, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO m_type (id, category) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a category of `type_id` into `m_category`.
pub async fn seed_category(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    type_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO m_category (id, name, master_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(type_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Assertion helpers for JSON responses.
#[allow(clippy::unwrap_used)]
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual,
            expected,
            "JSON mismatch:\nactual: {}\nexpected: {}",
            serde_json::to_string_pretty(actual).unwrap(),
            serde_json::to_string_pretty(expected).unwrap()
        );
    }

    /// Assert that a body is the error envelope with `code`.
    pub fn error_code(body: &Value, code: &str) {
        assert_eq!(
            body["error"]["code"], code,
            "Expected error code '{code}', got: {body}"
        );
    }

    /// Assert that an error envelope reports an issue on `field`.
    pub fn error_field(body: &Value, field: &str) {
        let fields: Vec<&str> = body["error"]["details"]
            .as_array()
            .map(|details| {
                details
                    .iter()
                    .filter_map(|d| d["field"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        assert!(
            fields.contains(&field),
            "Expected an issue on '{field}', got fields {fields:?} in {body}"
        );
    }

    /// Ids of the records in `data`, in response order.
    pub fn ids(body: &Value) -> Vec<i64> {
        body["data"]
            .as_array()
            .map(|rows| rows.iter().filter_map(|r| r["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}
