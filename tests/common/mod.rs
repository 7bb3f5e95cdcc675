//! Shared harness for the integration and cucumber suites
//!
//! - `fixtures`: the seeded guild directory and well-known ids
//! - `factories`: audit entries and invocation requests
//! - `mocks`: scripted actions and a recording native responder
//! - `test_app`: the router wired to a throwaway database

#![allow(dead_code)]

pub mod factories;
pub mod fixtures;
pub mod mocks;
pub mod test_app;

pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
