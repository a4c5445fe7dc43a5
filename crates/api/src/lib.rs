//! Conduit API library.
//!
//! A RealWorld-style blogging API: users, profiles, articles, comments,
//! favourites and follows over JSON, secured with signed bearer tokens.
//!
//! The crate is a library so the integration tests can drive the real
//! router; `main.rs` only wires configuration, logging and the database.
//!
//! # Modules
//!
//! - [`config`] - environment configuration
//! - [`db`] - store traits, `PostgreSQL` and in-memory implementations
//! - [`models`] - domain types
//! - [`services`] - tokens, authentication, identity, content
//! - [`middleware`] - authentication gate, request ID, security headers
//! - [`routes`] - HTTP handlers and the assembled [`routes::app`]
//! - [`error`] - `AppError` and its HTTP mapping
//! - [`state`] - `AppState`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
