//! Error handling for scan operations.
//!
//! This module provides:
//! - Application-specific error types for connections, cursors, queries and configuration
//! - Structured error information extracted from MongoDB driver errors
//! - Classification of the cursor-loss errors a scan recovers from
//!
//! # Example
//!
//! ```rust,no_run
//! use mongoscan::error::{Result, ScanError};
//! use mongoscan::error::mongo::extract_error_info;
//!
//! fn handle_error(err: &mongodb::error::Error) {
//!     let info = extract_error_info(err);
//!     println!("{}", info.to_json().unwrap());
//! }
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{ConfigError, ConnectionError, CursorError, QueryError, Result, ScanError};
pub use mongo::ErrorInfo;
