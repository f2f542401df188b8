//! Fertilizer registry API.
//!
//! Filtered, paginated search over registered fertilizer products plus the
//! type, category and company lookups that drive the search form. The
//! `fertilizer-api` binary serves the router built by [`routes::router`].

pub mod config;
pub mod db;
pub mod error;
pub mod fertilizer;
pub mod lookup;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
