//! Resilient forward iteration over a query result set
//!
//! [`ResilientCursor`] counts the matching documents once, then pulls them
//! through a single server-side cursor. When the server loses that cursor
//! (idle reaping, failover, restart) it opens a replacement positioned after
//! the documents already delivered and carries on, so every document is
//! handed out exactly once.

use futures::Stream;
use mongodb::bson::Document;
use tracing::{debug, warn};

use crate::error::{Result, ScanError};

use super::progress::ProgressReporter;
use super::source::{CollectionSource, CursorRequest, DocumentCursor};
use super::spec::ScanSpec;

/// Behavior knobs for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Report progress every N documents (0 disables)
    pub progress_interval: u64,
    /// Reuse the scan's sort order on replacement cursors
    pub reapply_sort_on_resume: bool,
    /// Count the document recovered on resume towards progress reports
    pub progress_on_resume: bool,
    /// Documents per getMore round trip, passed to the driver
    pub batch_size: Option<u32>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            progress_interval: 0,
            reapply_sort_on_resume: true,
            progress_on_resume: true,
            batch_size: None,
        }
    }
}

impl ScanOptions {
    /// Resume the way older scanners did: replacement cursors fall back to
    /// natural order and the recovered document skips the progress check.
    pub fn legacy() -> Self {
        Self {
            reapply_sort_on_resume: false,
            progress_on_resume: false,
            ..Self::default()
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: Option<u32>) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Single-consumer iterator that survives server-side cursor loss.
///
/// Invariants:
/// - `len()` is fixed at construction and never recounted.
/// - `emitted() <= len()`, and the scan ends exactly when they are equal.
/// - At most one cursor is live at any time.
pub struct ResilientCursor<S: CollectionSource> {
    source: S,
    spec: ScanSpec,
    options: ScanOptions,
    progress: Box<dyn ProgressReporter>,
    total: u64,
    emitted: u64,
    resumes: u64,
    cursor: Option<S::Cursor>,
    finished: bool,
}

impl<S: CollectionSource> ResilientCursor<S> {
    /// Count the matching documents and open the first cursor.
    ///
    /// Errors from the count or the cursor open are returned unchanged.
    /// When nothing matches no cursor is opened at all.
    pub async fn open(
        source: S,
        spec: ScanSpec,
        options: ScanOptions,
        mut progress: Box<dyn ProgressReporter>,
    ) -> Result<Self> {
        let limit = spec.limit();
        let total = source.count(spec.filter(), spec.skip(), limit.get()).await?;

        let cursor = if total > 0 {
            let request = CursorRequest {
                filter: spec.filter().clone(),
                sort: Some(spec.sort().to_cursor_document()),
                skip: spec.skip(),
                limit: Some(limit.get()),
                no_cursor_timeout: true,
                batch_size: options.batch_size,
            };
            Some(source.open(request).await?)
        } else {
            None
        };

        progress.started(total);

        Ok(Self {
            source,
            spec,
            options,
            progress,
            total,
            emitted: 0,
            resumes: 0,
            cursor,
            finished: false,
        })
    }

    /// Number of documents this scan yields in total.
    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Documents delivered so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// How many replacement cursors were opened successfully.
    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    pub fn spec(&self) -> &ScanSpec {
        &self.spec
    }

    /// Whether end-of-sequence has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pull the next document.
    ///
    /// Returns `Ok(None)` once all counted documents were delivered. A lost
    /// cursor is rebuilt once per failure; any other error is returned as-is
    /// and the scan may be polled again.
    pub async fn next_document(&mut self) -> Result<Option<Document>> {
        if self.finished {
            return Ok(None);
        }
        if self.emitted >= self.total {
            self.finish().await;
            return Ok(None);
        }

        let pulled = match self.cursor.as_mut() {
            Some(cursor) => cursor.next_document().await,
            // Previous recovery attempt failed, start over from a fresh cursor
            None => return self.reinitialize().await,
        };

        match pulled {
            Ok(Some(doc)) => {
                self.record(true);
                Ok(Some(doc))
            }
            Ok(None) => {
                warn!(
                    "Cursor exhausted after {} of {} documents, collection shrank during scan",
                    self.emitted, self.total
                );
                self.finish().await;
                Ok(None)
            }
            Err(e) if e.is_cursor_not_found() => {
                // Dead on the server; dropped without a close
                self.cursor = None;
                self.reinitialize().await
            }
            Err(e) => Err(e),
        }
    }

    /// Close the active cursor before the scan is exhausted.
    pub async fn close(&mut self) -> Result<()> {
        self.finished = true;
        match self.cursor.take() {
            Some(mut cursor) => cursor.close().await,
            None => Ok(()),
        }
    }

    /// Turn the scan into a [`Stream`] of documents.
    pub fn into_stream(self) -> impl Stream<Item = Result<Document>> {
        futures::stream::try_unfold(self, |mut scan| async move {
            let next = scan.next_document().await?;
            Ok::<_, ScanError>(next.map(|doc| (doc, scan)))
        })
    }

    /// Open a replacement cursor after the `emitted` documents already
    /// delivered and pull exactly one document from it.
    async fn reinitialize(&mut self) -> Result<Option<Document>> {
        self.progress.resumed(self.emitted);

        let remaining = self.spec.limit().remaining_after(self.emitted);
        let sort = self
            .options
            .reapply_sort_on_resume
            .then(|| self.spec.sort().to_cursor_document());
        let request = CursorRequest {
            filter: self.spec.filter().clone(),
            sort,
            skip: self.spec.skip() + self.emitted,
            limit: Some(remaining),
            no_cursor_timeout: true,
            batch_size: self.options.batch_size,
        };

        debug!(
            "Reopening cursor at offset {} with limit {}",
            request.skip, remaining
        );

        let mut cursor = self.source.open(request).await?;
        self.resumes += 1;
        // Not retried: a second loss here fails this call
        let doc = cursor.next_document().await?;
        self.cursor = Some(cursor);

        match doc {
            Some(doc) => {
                self.record(self.options.progress_on_resume);
                Ok(Some(doc))
            }
            None => {
                warn!(
                    "Replacement cursor empty after {} of {} documents",
                    self.emitted, self.total
                );
                self.finish().await;
                Ok(None)
            }
        }
    }

    fn record(&mut self, report: bool) {
        self.emitted += 1;

        let interval = self.options.progress_interval;
        if report && interval > 0 && self.emitted % interval == 0 {
            self.progress.advanced(self.emitted, self.total);
        }
    }

    async fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close().await {
                debug!("Ignoring error while closing exhausted cursor: {}", e);
            }
        }
        self.progress.finished(self.emitted);
    }
}
