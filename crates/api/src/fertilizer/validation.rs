//! Query-string validation for fertilizer searches.
//!
//! Scalar parameters are checked together so a single error reports every
//! offending field. The JSON-encoded `components` and `typeFilters`
//! parameters are checked afterwards, each failing on its own.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use super::types::{
    CategorySelector, ComponentFilter, ComponentFilters, FilterSpec, FilterTag, PerPage,
    SortDirection, SortSpec, canonical_component,
};
use crate::error::{ApiError, ApiResult, ErrorDetail};

#[allow(clippy::expect_used)]
static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex literal"));

/// Raw query-string pairs in request order. Keys may repeat.
#[derive(Debug, Clone, Default)]
pub struct RawQuery {
    pairs: Vec<(String, String)>,
}

impl RawQuery {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First non-empty value for `key`. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// JSON-encoded parameter, either one string or repeated keys.
    pub fn json(&self, key: &str) -> Option<RawJson> {
        let mut values: Vec<String> = self
            .pairs
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect();
        match values.len() {
            0 => None,
            1 => values.pop().map(RawJson::Text),
            _ => Some(RawJson::Items(values)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A JSON sub-payload in one of the shapes clients send it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawJson {
    /// One JSON document as text.
    Text(String),
    /// The same key repeated, one JSON document per occurrence.
    Items(Vec<String>),
    /// Already decoded.
    Parsed(Value),
}

impl RawJson {
    /// Decode into a single JSON value. Repeated items become one array.
    pub fn into_value(self, field: &str) -> ApiResult<Value> {
        let parse = |text: &str| {
            serde_json::from_str::<Value>(text).map_err(|e| {
                tracing::warn!(field, error = %e, "malformed JSON parameter");
                ApiError::malformed_json(field)
            })
        };

        match self {
            RawJson::Text(text) => parse(&text),
            RawJson::Items(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in &items {
                    match parse(item)? {
                        Value::Array(inner) => values.extend(inner),
                        other => values.push(other),
                    }
                }
                Ok(Value::Array(values))
            }
            RawJson::Parsed(value) => Ok(value),
        }
    }
}

/// Validate a search query and produce its [`FilterSpec`].
pub fn validate_query_params(raw: &RawQuery) -> ApiResult<FilterSpec> {
    let mut issues = Vec::new();

    let page = parse_page(raw.get("page"), &mut issues);
    let per_page = parse_per_page(raw.get("perPage"), &mut issues);
    let reg_date_from = parse_date("reg_date_from", raw.get("reg_date_from"), &mut issues);
    let reg_date_to = parse_date("reg_date_to", raw.get("reg_date_to"), &mut issues);
    if let (Some(from), Some(to)) = (reg_date_from, reg_date_to)
        && from > to
    {
        issues.push(ErrorDetail::field(
            "reg_date_range",
            "reg_date_from must not be later than reg_date_to",
        ));
    }
    let levels = parse_levels(raw.get("level"), &mut issues);
    let sort = parse_sort(raw.get("sortBy"), raw.get("sortOrder"), &mut issues);

    if !issues.is_empty() {
        tracing::warn!(issues = ?issues, "query parameter validation failed");
        return Err(ApiError::validation("invalid query parameters", issues));
    }

    let components = match raw.json("components") {
        Some(json) => validate_components(json)?,
        None => ComponentFilters::new(),
    };

    let tags = match raw.json("typeFilters") {
        Some(json) => validate_type_filters(json)?,
        None => Vec::new(),
    };

    let category_selector = if !tags.is_empty() {
        CategorySelector::Tags(tags)
    } else {
        match raw.get("selectedTypeId") {
            Some(type_id) if type_id != "null" => CategorySelector::Type(type_id.to_string()),
            _ => CategorySelector::All,
        }
    };

    let spec = FilterSpec {
        name: raw.get("name").map(str::to_string),
        company: raw.get("company").map(str::to_string),
        reg_no: raw.get("reg_no").map(str::to_string),
        reg_date_from,
        reg_date_to,
        components,
        levels,
        shape: raw.get("shape").map(str::to_string),
        effect: raw.get("effect").map(str::to_string),
        category_selector,
        page,
        per_page,
        sort,
        show_form_name: raw.get("showFormName") == Some("true"),
    };

    tracing::debug!(
        page = spec.page,
        per_page = spec.per_page.get(),
        components = spec.components.len(),
        category_selector = ?spec.category_selector,
        "query parameters validated"
    );

    Ok(spec)
}

fn parse_page(value: Option<&str>, issues: &mut Vec<ErrorDetail>) -> u32 {
    let Some(value) = value else {
        return 1;
    };
    match value.trim().parse::<u32>() {
        Ok(page) if page >= 1 => page,
        _ => {
            issues.push(ErrorDetail::field("page", "page must be a positive integer"));
            1
        }
    }
}

fn parse_per_page(value: Option<&str>, issues: &mut Vec<ErrorDetail>) -> PerPage {
    let Some(value) = value else {
        return PerPage::default();
    };
    match value.trim().parse::<u32>().ok().map(PerPage::try_from) {
        Some(Ok(per_page)) => per_page,
        _ => {
            issues.push(ErrorDetail::field(
                "perPage",
                "perPage must be one of 10, 20, 50 or 100",
            ));
            PerPage::default()
        }
    }
}

fn parse_date(
    field: &str,
    value: Option<&str>,
    issues: &mut Vec<ErrorDetail>,
) -> Option<NaiveDate> {
    let value = value?;
    if !DATE_FORMAT.is_match(value) {
        issues.push(ErrorDetail::field(field, "date must use the YYYY-MM-DD format"));
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            issues.push(ErrorDetail::field(field, "date is not a valid calendar date"));
            None
        }
    }
}

fn parse_levels(value: Option<&str>, issues: &mut Vec<ErrorDetail>) -> Vec<i64> {
    let Some(value) = value else {
        return FilterSpec::DEFAULT_LEVELS.to_vec();
    };
    let parsed: Result<Vec<i64>, _> = value.split(',').map(|l| l.trim().parse::<i64>()).collect();
    match parsed {
        Ok(levels) => levels,
        Err(_) => {
            issues.push(ErrorDetail::field(
                "level",
                "level must be a comma-separated list of integers",
            ));
            FilterSpec::DEFAULT_LEVELS.to_vec()
        }
    }
}

fn parse_sort(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    issues: &mut Vec<ErrorDetail>,
) -> SortSpec {
    let direction = match sort_order {
        None => SortDirection::default(),
        Some(order) => SortDirection::parse(order).unwrap_or_else(|| {
            issues.push(ErrorDetail::field("sortOrder", "sortOrder must be asc or desc"));
            SortDirection::default()
        }),
    };

    let column = sort_by.unwrap_or("id");
    SortSpec::new(column, direction).unwrap_or_else(|| {
        issues.push(ErrorDetail::field(
            "sortBy",
            format!("cannot sort by unknown column '{column}'"),
        ));
        SortSpec::default()
    })
}

/// Validate the `components` parameter: an object of per-component ranges.
pub fn validate_components(json: RawJson) -> ApiResult<ComponentFilters> {
    let value = json.into_value("components")?;

    let Value::Object(entries) = value else {
        return Err(components_error(vec![ErrorDetail::field(
            "components",
            "expected a JSON object keyed by component",
        )]));
    };

    let mut issues = Vec::new();
    let mut filters = ComponentFilters::new();
    for (key, entry) in &entries {
        if let Some(filter) = validate_component(key, entry, &mut issues) {
            filters.insert(canonical_component(key).to_string(), filter);
        }
    }

    if !issues.is_empty() {
        return Err(components_error(issues));
    }

    tracing::debug!(count = filters.len(), "components validated");
    Ok(filters)
}

fn components_error(issues: Vec<ErrorDetail>) -> ApiError {
    tracing::warn!(issues = ?issues, "components validation failed");
    ApiError::validation("invalid components parameter", issues)
}

fn validate_component(
    key: &str,
    entry: &Value,
    issues: &mut Vec<ErrorDetail>,
) -> Option<ComponentFilter> {
    let prefix = format!("components.{key}");
    let Some(object) = entry.as_object() else {
        issues.push(ErrorDetail::field(
            prefix,
            "expected an object with min, max and includeEmpty",
        ));
        return None;
    };

    let min = percentage(object, "min", &prefix, issues);
    let max = percentage(object, "max", &prefix, issues);
    let include_empty = match object.get("includeEmpty") {
        Some(Value::Bool(flag)) => Some(*flag),
        Some(_) => {
            issues.push(ErrorDetail::field(
                format!("{prefix}.includeEmpty"),
                "expected a boolean",
            ));
            None
        }
        None => {
            issues.push(ErrorDetail::field(
                format!("{prefix}.includeEmpty"),
                "required",
            ));
            None
        }
    };

    let (min, max, include_empty) = (min?, max?, include_empty?);
    if min > max {
        issues.push(ErrorDetail::field(
            format!("{prefix}.range"),
            "min must be less than or equal to max",
        ));
        return None;
    }

    Some(ComponentFilter {
        min,
        max,
        include_empty,
    })
}

fn percentage(
    object: &Map<String, Value>,
    name: &str,
    prefix: &str,
    issues: &mut Vec<ErrorDetail>,
) -> Option<f64> {
    let field = format!("{prefix}.{name}");
    match object.get(name).map(Value::as_f64) {
        None => {
            issues.push(ErrorDetail::field(field, "required"));
            None
        }
        Some(None) => {
            issues.push(ErrorDetail::field(field, "expected a number"));
            None
        }
        Some(Some(n)) if !(0.0..=100.0).contains(&n) => {
            issues.push(ErrorDetail::field(field, "must be between 0 and 100"));
            None
        }
        Some(Some(n)) => Some(n),
    }
}

/// Validate the `typeFilters` parameter: one tag object or an array of them.
pub fn validate_type_filters(json: RawJson) -> ApiResult<Vec<FilterTag>> {
    let items = match json.into_value("typeFilters")? {
        Value::Array(items) => items,
        single => vec![single],
    };

    let mut issues = Vec::new();
    let mut tags = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(tag) = validate_tag(index, item, &mut issues) {
            tags.push(tag);
        }
    }

    if !issues.is_empty() {
        tracing::warn!(issues = ?issues, "type filter validation failed");
        return Err(ApiError::validation("invalid typeFilters parameter", issues));
    }

    tracing::debug!(count = tags.len(), "type filters validated");
    Ok(tags)
}

fn validate_tag(index: usize, item: &Value, issues: &mut Vec<ErrorDetail>) -> Option<FilterTag> {
    let Some(object) = item.as_object() else {
        issues.push(ErrorDetail::field(
            format!("typeFilters.{index}"),
            "expected an object with id, type and category",
        ));
        return None;
    };

    let mut text = |name: &str| match object.get(name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            issues.push(ErrorDetail::field(
                format!("typeFilters.{index}.{name}"),
                "expected a string",
            ));
            None
        }
        None => {
            issues.push(ErrorDetail::field(
                format!("typeFilters.{index}.{name}"),
                "required",
            ));
            None
        }
    };

    let (id, kind, category) = (text("id"), text("type"), text("category"));
    let tag = FilterTag {
        id: id?,
        kind: kind?,
        category: category?,
    };

    if tag.category_id().is_none() {
        issues.push(ErrorDetail::field(
            format!("typeFilters.{index}.id"),
            "id must have the form <prefix>-<categoryId>",
        ));
        return None;
    }

    Some(tag)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> RawQuery {
        pairs.iter().copied().collect()
    }

    fn fields(error: &ApiError) -> Vec<&str> {
        error
            .details()
            .iter()
            .filter_map(|d| d.field.as_deref())
            .collect()
    }

    #[test]
    fn defaults_for_empty_query() {
        let spec = validate_query_params(&RawQuery::default()).unwrap();
        assert_eq!(spec, FilterSpec::default());
        assert_eq!(spec.levels, vec![1, 2]);
        assert_eq!(spec.sort.column(), "id");
        assert_eq!(spec.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn empty_values_count_as_absent() {
        let spec = validate_query_params(&query(&[("name", ""), ("page", ""), ("shape", "")]))
            .unwrap();
        assert_eq!(spec.name, None);
        assert_eq!(spec.page, 1);
        assert_eq!(spec.shape, None);
    }

    #[test]
    fn scalar_fields_parsed() {
        let spec = validate_query_params(&query(&[
            ("name", "urea"),
            ("company", "Acme"),
            ("reg_no", "12"),
            ("reg_date_from", "2020-01-01"),
            ("reg_date_to", "2020-12-31"),
            ("level", "1, 3"),
            ("shape", "粒状"),
            ("effect", "fast"),
            ("page", "2"),
            ("perPage", "50"),
            ("sortBy", "reg_date"),
            ("sortOrder", "ASC"),
            ("showFormName", "true"),
        ]))
        .unwrap();

        assert_eq!(spec.name.as_deref(), Some("urea"));
        assert_eq!(spec.company.as_deref(), Some("Acme"));
        assert_eq!(spec.reg_no.as_deref(), Some("12"));
        assert_eq!(spec.reg_date_from, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(spec.reg_date_to, NaiveDate::from_ymd_opt(2020, 12, 31));
        assert_eq!(spec.levels, vec![1, 3]);
        assert_eq!(spec.shape.as_deref(), Some("粒状"));
        assert_eq!(spec.effect.as_deref(), Some("fast"));
        assert_eq!(spec.page, 2);
        assert_eq!(spec.per_page.get(), 50);
        assert_eq!(spec.sort.column(), "reg_date");
        assert_eq!(spec.sort.direction, SortDirection::Asc);
        assert!(spec.show_form_name);
    }

    #[test]
    fn show_form_name_only_for_literal_true() {
        let spec = validate_query_params(&query(&[("showFormName", "1")])).unwrap();
        assert!(!spec.show_form_name);
    }

    #[test]
    fn per_page_outside_allow_list_rejected() {
        for value in ["25", "0", "abc", "-10"] {
            let err = validate_query_params(&query(&[("perPage", value)])).unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
            assert_eq!(fields(&err), vec!["perPage"], "perPage={value}");
        }
    }

    #[test]
    fn non_positive_page_rejected() {
        for value in ["0", "-1", "x"] {
            let err = validate_query_params(&query(&[("page", value)])).unwrap_err();
            assert_eq!(fields(&err), vec!["page"], "page={value}");
        }
    }

    #[test]
    fn malformed_dates_rejected() {
        let err = validate_query_params(&query(&[
            ("reg_date_from", "2020/01/01"),
            ("reg_date_to", "2020-02-30"),
        ]))
        .unwrap_err();
        assert_eq!(fields(&err), vec!["reg_date_from", "reg_date_to"]);
    }

    #[test]
    fn inverted_date_range_rejected() {
        let err = validate_query_params(&query(&[
            ("reg_date_from", "2021-01-01"),
            ("reg_date_to", "2020-01-01"),
        ]))
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(fields(&err), vec!["reg_date_range"]);
    }

    #[test]
    fn equal_dates_accepted() {
        let spec = validate_query_params(&query(&[
            ("reg_date_from", "2021-01-01"),
            ("reg_date_to", "2021-01-01"),
        ]))
        .unwrap();
        assert_eq!(spec.reg_date_from, spec.reg_date_to);
    }

    #[test]
    fn non_integer_level_rejected() {
        let err = validate_query_params(&query(&[("level", "1,two")])).unwrap_err();
        assert_eq!(fields(&err), vec!["level"]);
    }

    #[test]
    fn unknown_sort_column_and_order_rejected() {
        let err = validate_query_params(&query(&[
            ("sortBy", "id; DROP TABLE t_fertilizers"),
            ("sortOrder", "sideways"),
        ]))
        .unwrap_err();
        assert_eq!(fields(&err), vec!["sortOrder", "sortBy"]);
    }

    #[test]
    fn every_bad_scalar_reported_once() {
        let err = validate_query_params(&query(&[
            ("page", "0"),
            ("perPage", "7"),
            ("level", "x"),
        ]))
        .unwrap_err();
        assert_eq!(err.details().len(), 3);
        assert_eq!(fields(&err), vec!["page", "perPage", "level"]);
    }

    #[test]
    fn components_parsed_and_aliases_normalized() {
        let spec = validate_query_params(&query(&[(
            "components",
            r#"{"nitrogen":{"min":5,"max":20,"includeEmpty":false},
                "phosphorus":{"min":0,"max":10.5,"includeEmpty":true}}"#,
        )]))
        .unwrap();

        assert_eq!(
            spec.components.get("nitrogen"),
            Some(&ComponentFilter {
                min: 5.0,
                max: 20.0,
                include_empty: false
            })
        );
        assert_eq!(spec.components.get("phos").map(|f| f.max), Some(10.5));
        assert!(!spec.components.contains_key("phosphorus"));
    }

    #[test]
    fn components_invalid_json_is_bad_request() {
        let err = validate_query_params(&query(&[("components", "{nitrogen:")])).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert_eq!(fields(&err), vec!["components"]);
    }

    #[test]
    fn components_inverted_range_rejected() {
        let err = validate_components(RawJson::Parsed(json!({
            "k": {"min": 30, "max": 10, "includeEmpty": true}
        })))
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(fields(&err), vec!["components.k.range"]);
    }

    #[test]
    fn components_shape_errors_reported_per_field() {
        let err = validate_components(RawJson::Parsed(json!({
            "nitrogen": {"min": -1, "max": "ten"},
            "ca": 5
        })))
        .unwrap_err();
        assert_eq!(
            fields(&err),
            vec![
                "components.ca",
                "components.nitrogen.min",
                "components.nitrogen.max",
                "components.nitrogen.includeEmpty",
            ]
        );
    }

    #[test]
    fn components_must_be_object() {
        let err = validate_components(RawJson::Text("[1,2]".into())).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(fields(&err), vec!["components"]);
    }

    #[test]
    fn unknown_component_keys_tolerated() {
        let filters = validate_components(RawJson::Parsed(json!({
            "mg": {"min": 1, "max": 2, "includeEmpty": true}
        })))
        .unwrap();
        assert!(filters.contains_key("mg"));
    }

    #[test]
    fn type_filters_single_object_and_array_accepted() {
        let tag = r#"{"id":"cat-7","type":"category","category":"Compound"}"#;

        let single = validate_type_filters(RawJson::Text(tag.to_string())).unwrap();
        let array = validate_type_filters(RawJson::Text(format!("[{tag}]"))).unwrap();
        assert_eq!(single, array);
        assert_eq!(single[0].category_id(), Some("7"));
    }

    #[test]
    fn type_filters_repeated_keys_merged() {
        let spec = validate_query_params(&query(&[
            ("typeFilters", r#"{"id":"cat-1","type":"t","category":"A"}"#),
            ("typeFilters", r#"[{"id":"cat-2","type":"t","category":"B"}]"#),
        ]))
        .unwrap();
        let CategorySelector::Tags(tags) = spec.category_selector else {
            panic!("expected tag selector");
        };
        let ids: Vec<_> = tags.iter().filter_map(FilterTag::category_id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn type_filters_invalid_json_is_bad_request() {
        let err = validate_type_filters(RawJson::Text("not json".into())).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert_eq!(fields(&err), vec!["typeFilters"]);
    }

    #[test]
    fn type_filters_shape_errors_indexed() {
        let err = validate_type_filters(RawJson::Parsed(json!([
            {"id": "cat-1", "type": "t", "category": "A"},
            {"id": 5, "type": "t"},
            {"id": "nohyphen", "type": "t", "category": "C"}
        ])))
        .unwrap_err();
        assert_eq!(
            fields(&err),
            vec!["typeFilters.1.id", "typeFilters.1.category", "typeFilters.2.id"]
        );
    }

    #[test]
    fn tags_win_over_type_id() {
        let spec = validate_query_params(&query(&[
            ("selectedTypeId", "3"),
            ("typeFilters", r#"{"id":"cat-9","type":"t","category":"A"}"#),
        ]))
        .unwrap();
        assert!(matches!(spec.category_selector, CategorySelector::Tags(_)));
    }

    #[test]
    fn null_type_id_ignored() {
        let spec = validate_query_params(&query(&[("selectedTypeId", "null")])).unwrap();
        assert_eq!(spec.category_selector, CategorySelector::All);

        let spec = validate_query_params(&query(&[("selectedTypeId", "3")])).unwrap();
        assert_eq!(spec.category_selector, CategorySelector::Type("3".into()));
    }

    #[test]
    fn empty_type_filter_array_falls_back_to_type_id() {
        let spec = validate_query_params(&query(&[
            ("typeFilters", "[]"),
            ("selectedTypeId", "4"),
        ]))
        .unwrap();
        assert_eq!(spec.category_selector, CategorySelector::Type("4".into()));
    }
}
