//! # Tracker API Server Library
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `access`: Per-request authorization against the policy
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod access;
pub mod app;
pub mod config;
pub mod error;
pub mod routes;
