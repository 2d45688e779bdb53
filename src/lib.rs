//! Resilient MongoDB collection scans
//!
//! This library iterates over large query results without losing its place
//! when the server drops the cursor midway (idle reaping, failover, restart).
//! The scan counts the matching documents once, then rebuilds its cursor at
//! the right offset whenever the server reports `CursorNotFound`, delivering
//! every document exactly once.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `export`: JSON Lines output
//! - `scan`: The resilient cursor and its collaborators
//!
//! # Example
//!
//! ```no_run
//! use mongoscan::config::Config;
//! use mongoscan::connection::ConnectionManager;
//! use mongoscan::scan::{LogProgress, MongoCollection, ResilientCursor, ScanOptions, ScanSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(
//!         "mongodb://localhost:27017".to_string(),
//!         config.connection,
//!     );
//!     manager.connect().await?;
//!
//!     let source = MongoCollection::new(manager.get_collection("shop", "orders")?);
//!     let mut scan = ResilientCursor::open(
//!         source,
//!         ScanSpec::new().with_limit(1000),
//!         ScanOptions::default().with_progress_interval(100),
//!         Box::new(LogProgress),
//!     )
//!     .await?;
//!
//!     while let Some(doc) = scan.next_document().await? {
//!         println!("{doc}");
//!     }
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod scan;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{Result, ScanError};
pub use scan::{ResilientCursor, ScanOptions, ScanSpec};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
