//! # MarketDesk Shared Library
//!
//! Types and business logic shared by the MarketDesk API server and the
//! background worker.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, session tokens and the authentication service
//! - `pricing`: engagement pricing resolution
//! - `legacy`: repair of legacy JSON exports before import

pub mod auth;
pub mod db;
pub mod legacy;
pub mod models;
pub mod pricing;

/// Current version of the MarketDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
