//! # Tracker Shared Library
//!
//! Types, persistence and authorization logic shared by the tracker API
//! server and its tests.
//!
//! ## Module Organization
//!
//! - `auth`: authorization policy, identity loading, passwords and tokens
//! - `db`: connection pool and migrations
//! - `models`: users, groups, projects and issues

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the tracker shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
