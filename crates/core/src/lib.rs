//! Conduit Core - shared value types.
//!
//! Used by the API server, the CLI, and the integration tests:
//! - `api` - the REST server and its stores
//! - `cli` - migrations and operator commands
//!
//! # Architecture
//!
//! Only validated value types live here - no I/O, no database access, no HTTP.
//!
//! # Modules
//!
//! - [`types`] - typed ids, `Email`, `Username`, `Slug`, and `Page`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
