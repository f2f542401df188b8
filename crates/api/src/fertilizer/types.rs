//! Filter types produced by validation and consumed by the query builder.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fertilizer registry table.
pub const FERTILIZER_TABLE: &str = "t_fertilizers";

/// Every column of `t_fertilizers`; the sort allow-list.
pub const FERTILIZER_COLUMNS: &[&str] = &[
    "id",
    "level",
    "reg_no",
    "reg_date",
    "company",
    "prod_name",
    "form_name",
    "url",
    "region",
    "shape",
    "fertilization",
    "organic",
    "effect",
    "crop",
    "nitrogen",
    "phos",
    "k",
    "ca",
    "mg",
    "alk",
    "si",
    "mn",
    "b",
    "fe",
    "cu",
    "zn",
    "mo",
    "n_total",
    "n_nh4",
    "n_nh4_in",
    "n_no3",
    "n_no3_in",
    "n_no3_in1",
    "p_total",
    "p_cit",
    "p_cit_in",
    "p_sol",
    "p_sol_in",
    "p_wat",
    "p_wat_in",
    "k_total",
    "k_cit",
    "k_cit_in",
    "k_wat",
    "k_wat_in",
    "si_sol",
    "si_wat",
    "mg_sol",
    "mg_cit",
    "mg_cit_in",
    "mg_wat",
    "mg_wat_in",
    "mn_sol",
    "mn_cit",
    "mn_cit_in",
    "mn_wat",
    "mn_wat_in",
    "b_cit",
    "b_wat",
    "b_wat_in",
    "lime_total",
    "lime_sol",
    "lime_cit",
    "lime_wat",
    "s_total",
    "s_sol",
    "address",
    "category_id",
    "exp_type",
];

/// Components that turn into predicates, in predicate order.
pub const COMPONENT_COLUMNS: [&str; 3] = ["nitrogen", "phos", "k"];

/// Map a component key to its column name.
pub fn canonical_component(key: &str) -> &str {
    match key {
        "phosphorus" => "phos",
        "potassium" => "k",
        other => other,
    }
}

/// Range constraint on one composition column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFilter {
    pub min: f64,
    pub max: f64,
    pub include_empty: bool,
}

/// Component key -> range, keyed by canonical column name.
pub type ComponentFilters = BTreeMap<String, ComponentFilter>;

/// A selected category tag, `id` is `<prefix>-<categoryId>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTag {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
}

impl FilterTag {
    /// Category id encoded after the first hyphen of the tag id.
    pub fn category_id(&self) -> Option<&str> {
        self.id
            .split_once('-')
            .map(|(_, category)| category)
            .filter(|category| !category.is_empty())
    }
}

/// How the result set is narrowed by category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategorySelector {
    #[default]
    All,
    /// Explicit category tags.
    Tags(Vec<FilterTag>),
    /// Every category of a fertilizer type, resolved through the lookup cache.
    Type(String),
}

/// Page size; one of [`PerPage::ALLOWED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerPage(u32);

impl PerPage {
    pub const ALLOWED: [u32; 4] = [10, 20, 50, 100];

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PerPage {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for PerPage {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }
}

/// Result ordering; newest-first (`Desc`) unless asked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parse `asc` / `desc` in any letter case.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

/// Sort order over an allow-listed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    column: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Sort by `column` if it is a fertilizer column.
    pub fn new(column: &str, direction: SortDirection) -> Option<Self> {
        FERTILIZER_COLUMNS
            .iter()
            .find(|known| **known == column)
            .map(|known| Self {
                column: known,
                direction,
            })
    }

    pub fn column(&self) -> &'static str {
        self.column
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: "id",
            direction: SortDirection::Desc,
        }
    }
}

/// Validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub name: Option<String>,
    pub company: Option<String>,
    pub reg_no: Option<String>,
    pub reg_date_from: Option<NaiveDate>,
    pub reg_date_to: Option<NaiveDate>,
    pub components: ComponentFilters,
    pub levels: Vec<i64>,
    pub shape: Option<String>,
    pub effect: Option<String>,
    pub category_selector: CategorySelector,
    pub page: u32,
    pub per_page: PerPage,
    pub sort: SortSpec,
    pub show_form_name: bool,
}

impl FilterSpec {
    pub const DEFAULT_LEVELS: [i64; 2] = [1, 2];

    /// Rows skipped before the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page.get())
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            name: None,
            company: None,
            reg_no: None,
            reg_date_from: None,
            reg_date_to: None,
            components: ComponentFilters::new(),
            levels: Self::DEFAULT_LEVELS.to_vec(),
            shape: None,
            effect: None,
            category_selector: CategorySelector::All,
            page: 1,
            per_page: PerPage::default(),
            sort: SortSpec::default(),
            show_form_name: false,
        }
    }
}
