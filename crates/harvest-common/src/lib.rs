//! Harvest Common Library
//!
//! Shared utilities for the harvest workspace.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Records**: helpers for the opaque JSON records returned by paginated APIs,
//!   most importantly flattening nested objects into dotted columns
//! - **Error Handling**: the common error and result types
//!
//! # Example
//!
//! ```
//! use harvest_common::record::{flatten, cell_text};
//! use serde_json::json;
//!
//! let flat = flatten(&json!({"_id": "a1", "customer": {"name": "Ravi"}}));
//! assert_eq!(cell_text(&flat["customer.name"]), "Ravi");
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod record;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use record::Record;
