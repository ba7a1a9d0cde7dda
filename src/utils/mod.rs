//! Utility functions.
//!
//! This module provides:
//! - Sanitization of client-supplied request paths
//! - Trailing-window and day-offset arithmetic

pub mod sanitize;
mod window;

pub use sanitize::sanitize_path;
pub use window::{days_before, describe_window, window_start};
