//! Shared utilities

pub mod error;
pub mod validation;

pub use error::{AppError, AppResult, ErrorResponse};

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
