//! Tally Core - Shared types library.
//!
//! This crate provides common types used across all Tally components:
//! - `server` - HTTP service for accounts and calculation records
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP handling. This keeps it lightweight and allows
//! it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and usernames,
//!   plus the [`types::Operation`] enum and its pure evaluator

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
