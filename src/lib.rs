//! authgate Backend Library
//!
//! Exposes the auth core, router, and configuration for the binary and tests.

pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;
