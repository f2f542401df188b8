//! Fertilizer search: validation, query building and execution.

pub mod query_builder;
pub mod service;
pub mod types;
pub mod validation;

pub use query_builder::{FilterQuery, Predicate};
pub use service::{FertilizerService, SearchResult};
pub use types::{
    CategorySelector, ComponentFilter, ComponentFilters, FilterSpec, FilterTag, PerPage,
    SortDirection, SortSpec,
};
pub use validation::{RawJson, RawQuery, validate_query_params};
