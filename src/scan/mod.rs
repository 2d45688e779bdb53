//! Resilient collection scans
//!
//! This module provides the scan engine:
//! - `spec`: immutable query description (filter, sort, skip, limit)
//! - `source`: the collection seam and its MongoDB implementation
//! - `iterator`: the cursor that rebuilds itself when the server loses it
//! - `progress`: progress reporting (logs, terminal bar)

pub mod iterator;
pub mod progress;
pub mod source;
pub mod spec;

#[cfg(test)]
pub(crate) mod memory;

pub use iterator::{ResilientCursor, ScanOptions};
pub use progress::{BarProgress, LogProgress, NoProgress, ProgressReporter};
pub use source::{CollectionSource, CursorRequest, DocumentCursor, MongoCollection, MongoCursor};
pub use spec::{Limit, ScanSpec, SortDirection, SortOrder, UNBOUNDED_LIMIT};
