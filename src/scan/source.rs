//! Collection collaborator used by a scan.
//!
//! [`CollectionSource`] is the seam between the resilient cursor and the
//! database: it counts matching documents and opens cursors. The
//! [`MongoCollection`] implementation runs against a real server.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::Document;
use mongodb::{Collection, Cursor};
use tracing::debug;

use crate::error::{CursorError, Result, ScanError};

/// Parameters for opening one server-side cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRequest {
    /// Query filter, passed through unvalidated
    pub filter: Document,
    /// Sort document; `None` leaves ordering to the server
    pub sort: Option<Document>,
    /// Number of leading matches to discard
    pub skip: u64,
    /// Maximum number of documents; `None` means unbounded
    pub limit: Option<u64>,
    /// Ask the server not to reap the cursor when idle
    pub no_cursor_timeout: bool,
    /// Documents per getMore round trip
    pub batch_size: Option<u32>,
}

/// A cursor yielding documents one at a time.
#[async_trait]
pub trait DocumentCursor: Send {
    /// Pull the next document, or `None` when the cursor is exhausted.
    ///
    /// Fails with [`CursorError::NotFound`] when the server lost the cursor.
    async fn next_document(&mut self) -> Result<Option<Document>>;

    /// Release the server-side cursor.
    async fn close(&mut self) -> Result<()>;
}

/// Source of counts and cursors for a single collection.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    type Cursor: DocumentCursor;

    /// Count documents matching `filter` after `skip`, capped at `limit`.
    async fn count(&self, filter: &Document, skip: u64, limit: u64) -> Result<u64>;

    /// Open a cursor for `request`.
    async fn open(&self, request: CursorRequest) -> Result<Self::Cursor>;
}

/// [`CollectionSource`] backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    collection: Collection<Document>,
}

impl MongoCollection {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    /// Namespace (`db.collection`) for logging.
    pub fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }
}

#[async_trait]
impl CollectionSource for MongoCollection {
    type Cursor = MongoCursor;

    async fn count(&self, filter: &Document, skip: u64, limit: u64) -> Result<u64> {
        let mut count_opts = mongodb::options::CountOptions::default();
        if skip > 0 {
            count_opts.skip = Some(skip);
        }
        count_opts.limit = Some(limit);

        let count = self
            .collection
            .count_documents(filter.clone())
            .with_options(count_opts)
            .await?;
        Ok(count)
    }

    async fn open(&self, request: CursorRequest) -> Result<Self::Cursor> {
        debug!(
            "Opening cursor on '{}' (skip: {}, limit: {:?}, sort: {:?})",
            self.collection.name(),
            request.skip,
            request.limit,
            request.sort
        );

        let mut find_opts = mongodb::options::FindOptions::default();
        find_opts.no_cursor_timeout = Some(request.no_cursor_timeout);
        find_opts.sort = request.sort;
        if request.skip > 0 {
            find_opts.skip = Some(request.skip);
        }
        if let Some(limit) = request.limit {
            find_opts.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        find_opts.batch_size = request.batch_size;

        let cursor = self
            .collection
            .find(request.filter)
            .with_options(find_opts)
            .await?;

        Ok(MongoCursor {
            cursor: Some(cursor),
        })
    }
}

/// Driver cursor adapted to [`DocumentCursor`].
pub struct MongoCursor {
    cursor: Option<Cursor<Document>>,
}

#[async_trait]
impl DocumentCursor for MongoCursor {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        let cursor = self.cursor.as_mut().ok_or(CursorError::Closed)?;

        match cursor.try_next().await {
            Ok(doc) => Ok(doc),
            Err(e) => {
                let err = ScanError::from(e);
                if err.is_cursor_not_found() {
                    // The server already dropped it, nothing to kill
                    self.cursor = None;
                    Err(CursorError::NotFound(err.to_string()).into())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the driver cursor issues killCursors in the background
        if self.cursor.take().is_some() {
            debug!("Closed server-side cursor");
        }
        Ok(())
    }
}
