//! Shared utilities
//!
//! - [`app_data`] - Configuration file and app data directory
//! - [`progress`] - Load spinners (no-op without the `progress` feature)

pub mod app_data;
pub mod progress;

pub use app_data::*;
