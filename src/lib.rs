//! seismodash - client for an earthquake monitoring and prediction backend.
//!
//! Filter state, the filter/sort/paginate pipeline, map coloring, the
//! account flow and a blocking HTTP client, shared by the CLI and the local
//! web UI.

pub mod auth;
pub mod client;
pub mod colorize;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod filters;
pub mod models;
pub mod query;
pub mod server;
pub mod storage;
pub mod transform;

pub use client::ApiClient;
pub use config::Config;
pub use errors::SeismodashError;
