//! Integration tests for Guild Bridge
//!
//! These tests verify the behavior of the API endpoints and services with a
//! real (temporary) database and all middleware.

mod adapter_tests;
mod audit_tests;
