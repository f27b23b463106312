//! Utilities for schema_diff
//!
//! This module provides utility functions used across the library.

pub mod identifiers;
pub mod logging;

// Re-export key utility functions
pub use identifiers::{normalize_whitespace, quote_identifier, strip_quotes};
