//! UB Carpool Core - Shared types library.
//!
//! This crate provides common types used across all carpool components:
//! - `server` - HTTP API for drivers and passengers
//! - `cli` - Command-line tools for migrations and demo data
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Everything that crosses the wire or lands in storage is a
//! closed type from here, so invalid roles or statuses are rejected at the
//! boundary.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, tugrik amounts, emails, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use rust_decimal::Decimal;
pub use types::*;
