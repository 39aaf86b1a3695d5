//! Download driver.
//!
//! - `models`   : batch outcome and URL classification types
//! - `batch`    : one session per URL-list line
//! - `progress` : byte progress bar

pub mod batch;
pub mod models;
pub mod progress;
