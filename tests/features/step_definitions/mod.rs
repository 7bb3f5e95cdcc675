//! Step definitions for Cucumber scenarios

pub mod bridge_steps;
pub mod command_steps;
pub mod common_steps;
