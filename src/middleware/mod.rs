//! Middleware components
//!
//! This module contains middleware for:
//! - Service-to-service authentication

pub mod auth;

pub use auth::service_auth_middleware;
