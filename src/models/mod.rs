//! Data models

mod audit;
mod bridge;
mod command;
mod history;
mod invocation;
mod platform;

pub use audit::*;
pub use bridge::*;
pub use command::*;
pub use history::*;
pub use invocation::*;
pub use platform::*;
