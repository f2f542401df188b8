//! Fertilizer search query builder using SeaQuery.
//!
//! A [`FilterSpec`] becomes an ordered list of SQL predicates with their bound
//! values. SeaQuery renders the SELECT skeleton (table, WHERE conjunction,
//! ORDER BY); user input only ever reaches the database through `?`
//! placeholders.

use sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use super::types::{
    COMPONENT_COLUMNS, CategorySelector, FERTILIZER_TABLE, FilterSpec, SortDirection,
};
use crate::db::SqlValue;

/// One WHERE conjunct and the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

impl Predicate {
    fn new(sql: impl Into<String>, binds: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    fn bare(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Count and page queries for one search.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    predicates: Vec<Predicate>,
    sort_column: &'static str,
    sort_direction: SortDirection,
    limit: u32,
    offset: u64,
}

impl FilterQuery {
    /// Build the predicates for `spec`.
    ///
    /// `type_categories` holds the categories already resolved for a
    /// [`CategorySelector::Type`] selector and is ignored otherwise.
    pub fn build(spec: &FilterSpec, type_categories: &[String]) -> Self {
        let mut predicates = Vec::new();

        add_component_filters(spec, &mut predicates);

        if !spec.levels.is_empty() {
            predicates.push(Predicate::new(
                format!("level IN ({})", placeholders(spec.levels.len())),
                spec.levels.iter().copied().map(SqlValue::Integer).collect(),
            ));
        }

        if let Some(reg_no) = &spec.reg_no {
            predicates.push(Predicate::new(
                r"reg_no LIKE ? ESCAPE '\'",
                vec![contains_pattern(reg_no)],
            ));
        }

        if let Some(from) = spec.reg_date_from {
            predicates.push(Predicate::new(
                "date(reg_date) >= date(?)",
                vec![SqlValue::Text(from.format("%Y-%m-%d").to_string())],
            ));
        }

        if let Some(to) = spec.reg_date_to {
            predicates.push(Predicate::new(
                "date(reg_date) <= date(?)",
                vec![SqlValue::Text(to.format("%Y-%m-%d").to_string())],
            ));
        }

        if let Some(name) = &spec.name {
            predicates.push(Predicate::new(
                r"(prod_name LIKE ? ESCAPE '\' OR form_name LIKE ? ESCAPE '\')",
                vec![contains_pattern(name), contains_pattern(name)],
            ));
        }

        if let Some(company) = &spec.company {
            predicates.push(Predicate::new(
                r"company LIKE ? ESCAPE '\'",
                vec![contains_pattern(company)],
            ));
        }

        if let Some(shape) = &spec.shape {
            predicates.push(Predicate::new(
                "COALESCE(shape, '') = ?",
                vec![SqlValue::Text(shape.clone())],
            ));
        }

        if let Some(effect) = &spec.effect {
            predicates.push(Predicate::new(
                "effect = ?",
                vec![SqlValue::Text(effect.clone())],
            ));
        }

        add_category_filter(&spec.category_selector, type_categories, &mut predicates);

        Self {
            predicates,
            sort_column: spec.sort.column(),
            sort_direction: spec.sort.direction,
            limit: spec.per_page.get(),
            offset: spec.offset(),
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Values for the WHERE placeholders, in predicate order.
    pub fn where_binds(&self) -> Vec<SqlValue> {
        self.predicates
            .iter()
            .flat_map(|p| p.binds.iter().cloned())
            .collect()
    }

    /// Values for [`FilterQuery::data_sql`]: WHERE binds, then limit and offset.
    pub fn data_binds(&self) -> Vec<SqlValue> {
        let mut binds = self.where_binds();
        binds.push(SqlValue::Integer(i64::from(self.limit)));
        binds.push(SqlValue::Integer(
            i64::try_from(self.offset).unwrap_or(i64::MAX),
        ));
        binds
    }

    /// `SELECT COUNT(*)` over the filtered rows.
    pub fn count_sql(&self) -> String {
        let mut query = Query::select();
        query
            .expr_as(Expr::col(Asterisk).count(), Alias::new("count"))
            .from(Alias::new(FERTILIZER_TABLE));
        self.add_filters(&mut query);
        render(&query)
    }

    /// One page of filtered rows.
    pub fn data_sql(&self) -> String {
        let mut query = Query::select();
        query.column(Asterisk).from(Alias::new(FERTILIZER_TABLE));
        self.add_filters(&mut query);

        let order = match self.sort_direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        query.order_by(Alias::new(self.sort_column), order);

        format!("{} LIMIT ? OFFSET ?", render(&query))
    }

    fn add_filters(&self, query: &mut SelectStatement) {
        for predicate in &self.predicates {
            query.and_where(Expr::cust(predicate.sql.as_str()));
        }
    }
}

/// Render without inlining values; every bind stays a `?` placeholder.
fn render(query: &SelectStatement) -> String {
    let (sql, _values) = query.build(SqliteQueryBuilder);
    sql
}

fn add_component_filters(spec: &FilterSpec, predicates: &mut Vec<Predicate>) {
    for column in COMPONENT_COLUMNS {
        let Some(filter) = spec.components.get(column) else {
            continue;
        };

        predicates.push(Predicate::new(
            format!("{column} >= ?"),
            vec![SqlValue::Real(filter.min)],
        ));
        predicates.push(Predicate::new(
            format!("{column} <= ?"),
            vec![SqlValue::Real(filter.max)],
        ));

        if !filter.include_empty {
            if filter.min == 0.0 {
                predicates.push(Predicate::bare(format!("{column} IS NOT NULL")));
            } else {
                predicates.push(Predicate::bare(format!(
                    "({column} IS NOT NULL AND {column} > 0)"
                )));
            }
        }
    }
}

fn add_category_filter(
    selector: &CategorySelector,
    type_categories: &[String],
    predicates: &mut Vec<Predicate>,
) {
    let ids: Vec<&str> = match selector {
        CategorySelector::All => return,
        CategorySelector::Tags(tags) => tags.iter().filter_map(|t| t.category_id()).collect(),
        CategorySelector::Type(_) => type_categories.iter().map(String::as_str).collect(),
    };

    if ids.is_empty() {
        predicates.push(Predicate::bare("1 = 0"));
        return;
    }

    predicates.push(Predicate::new(
        format!(
            "{FERTILIZER_TABLE}.category_id IN ({})",
            placeholders(ids.len())
        ),
        ids.into_iter().map(SqlValue::from_id).collect(),
    ));
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn contains_pattern(value: &str) -> SqlValue {
    SqlValue::Text(format!("%{}%", escape_like_wildcards(value)))
}

/// Escape LIKE wildcards in user input (`%`, `_`, `\`) so they match literally.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
