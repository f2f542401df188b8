//! Database connection pool management and the prepared-statement seam.
//!
//! Services talk to storage through the [`Database`] trait: positional `?`
//! placeholders, bound [`SqlValue`]s, and rows surfaced as JSON objects keyed
//! by column name.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};

use crate::config::Config;

/// A result row keyed by column name.
pub type Row = Map<String, Value>;

/// A value bound to a positional `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Bind an identifier: numeric-looking ids bind as integers, others as text.
    pub fn from_id(id: &str) -> Self {
        id.parse::<i64>()
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(id.to_string()))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

/// Prepared-statement capability used by the services.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement and return every row.
    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a statement and return the first row, if any.
    async fn first(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>>;
}

/// [`Database`] over a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_all<'q>(
    sql: &'q str,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| match param {
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        })
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = bind_all(sql, params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn first(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        let row = bind_all(sql, params).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_json).transpose()
    }
}

/// Convert a SQLite row to a JSON object using each value's storage class.
fn row_to_json(row: &SqliteRow) -> Result<Row> {
    let mut object = Map::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let storage = {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => Value::from(row.try_get::<i64, _>(index)?),
            Some("REAL") => Number::from_f64(row.try_get::<f64, _>(index)?)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Some("BLOB") => {
                let bytes: Vec<u8> = row.try_get(index)?;
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(_) => Value::String(row.try_get::<String, _>(index)?),
        };

        object.insert(column.name().to_string(), value);
    }

    Ok(object)
}

/// Create a SQLite connection pool.
///
/// In-memory databases live only as long as their connection, so they are
/// pinned to a single connection that never expires.
pub async fn create_pool(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL is not a valid SQLite URL")?
        .create_if_missing(true)
        // Text filters are case-sensitive substring matches.
        .pragma("case_sensitive_like", "ON");

    let mut pool_options =
        SqlitePoolOptions::new().max_connections(config.database_max_connections);
    if config.database_url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .context("failed to connect to SQLite")?;

    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply migrations")?;
    Ok(())
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn memory_db() -> SqliteDatabase {
        let pool = create_pool(&Config::in_memory()).await.unwrap();
        SqliteDatabase::new(pool)
    }

    #[test]
    fn ids_bind_by_shape() {
        assert_eq!(SqlValue::from_id("42"), SqlValue::Integer(42));
        assert_eq!(SqlValue::from_id("-7"), SqlValue::Integer(-7));
        assert_eq!(SqlValue::from_id("A12"), SqlValue::Text("A12".into()));
        assert_eq!(SqlValue::from_id("1.5"), SqlValue::Text("1.5".into()));
    }

    #[tokio::test]
    async fn rows_map_storage_classes_to_json() {
        let db = memory_db().await;
        let row = db
            .first(
                "SELECT ? AS i, ? AS r, ? AS t, NULL AS n",
                &[SqlValue::Integer(3), SqlValue::Real(1.5), "x".into()],
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row["i"], Value::from(3));
        assert_eq!(row["r"], Value::from(1.5));
        assert_eq!(row["t"], Value::from("x"));
        assert_eq!(row["n"], Value::Null);
    }

    #[tokio::test]
    async fn first_returns_none_for_empty_result() {
        let db = memory_db().await;
        let row = db
            .first("SELECT 1 AS one WHERE 1 = 0", &[])
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn invalid_sql_is_an_error() {
        let db = memory_db().await;
        let err = db.all("SELECT * FROM missing_table", &[]).await.unwrap_err();
        assert!(format!("{err:#}").contains("missing_table"));
    }

    #[tokio::test]
    async fn like_is_case_sensitive_and_honours_escape() {
        let db = memory_db().await;
        let row = db
            .first(
                "SELECT 'Bone Meal' LIKE ? AS folded, 'Bone Meal' LIKE ? AS exact, \
                 'REG-100%' LIKE ? ESCAPE '\\' AS escaped",
                &["%bone%".into(), "%Bone%".into(), r"%100\%%".into()],
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row["folded"], Value::from(0));
        assert_eq!(row["exact"], Value::from(1));
        assert_eq!(row["escaped"], Value::from(1));
    }

    #[tokio::test]
    async fn migrations_create_schema_and_pool_is_healthy() {
        let db = memory_db().await;
        run_migrations(db.pool()).await.unwrap();
        assert!(check_health(db.pool()).await);

        let rows = db
            .all("SELECT COUNT(*) AS count FROM t_fertilizers", &[])
            .await
            .unwrap();
        assert_eq!(rows[0]["count"], Value::from(0));
    }
}
