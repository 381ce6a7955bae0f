//! Caching configuration server for the analysis engine.
//!
//! Serves archetypes, rules, and exemptions from a file-backed store
//! through a TTL cache, accepts telemetry events, and exposes the cache
//! content to administrators.

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod store;
