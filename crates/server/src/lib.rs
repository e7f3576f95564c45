//! Tally server - account-scoped calculation records over HTTP.
//!
//! # Architecture
//!
//! - Axum web framework with a JSON API surface
//! - `SQLite` via sqlx for persistence, migrations embedded at build time
//! - bcrypt password digests and HS256 bearer tokens for authentication
//! - Every calculation record belongs to exactly one account; ownership is
//!   enforced as a query predicate, never as an afterthought

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
pub use state::AppState;
