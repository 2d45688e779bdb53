//! In-memory collection with fault injection, for exercising scans without a server.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::{CursorError, Result, ScanError};

use super::source::{CollectionSource, CursorRequest, DocumentCursor};

/// Failure injected into a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// Server lost the cursor
    Invalidate,
    /// Any other failure (network reset)
    Fail,
}

#[derive(Default)]
struct Journal {
    requests: Vec<CursorRequest>,
    counts: Vec<(Document, u64, u64)>,
    faults: HashMap<usize, (usize, Fault)>,
    failing_opens: HashSet<usize>,
    failing_closes: HashSet<usize>,
    pulls: usize,
    closed: usize,
    visible_after_count: Option<usize>,
}

/// Collection held in memory, in insertion ("natural") order.
///
/// Clones share the same journal, so a test can keep a handle while the
/// scan owns another.
#[derive(Clone)]
pub(crate) struct MemoryCollection {
    docs: Arc<Vec<Document>>,
    journal: Arc<Mutex<Journal>>,
}

impl MemoryCollection {
    pub(crate) fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: Arc::new(docs),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Make the `cursor`-th opened cursor fail after `after` successful pulls.
    pub(crate) fn inject(&self, cursor: usize, after: usize, fault: Fault) {
        self.journal().faults.insert(cursor, (after, fault));
    }

    /// Make the `attempt`-th cursor open fail. Failed opens still take an index.
    pub(crate) fn fail_open(&self, attempt: usize) {
        self.journal().failing_opens.insert(attempt);
    }

    /// Make closing the `cursor`-th opened cursor fail.
    pub(crate) fn fail_close(&self, cursor: usize) {
        self.journal().failing_closes.insert(cursor);
    }

    /// Cursors opened after the count only see the first `n` matches.
    pub(crate) fn truncate_after_count(&self, n: usize) {
        self.journal().visible_after_count = Some(n);
    }

    pub(crate) fn requests(&self) -> Vec<CursorRequest> {
        self.journal().requests.clone()
    }

    pub(crate) fn counts(&self) -> Vec<(Document, u64, u64)> {
        self.journal().counts.clone()
    }

    pub(crate) fn pulls(&self) -> usize {
        self.journal().pulls
    }

    pub(crate) fn closed_cursors(&self) -> usize {
        self.journal().closed
    }

    fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn matching(&self, filter: &Document) -> Vec<Document> {
        self.docs
            .iter()
            .filter(|doc| filter.iter().all(|(k, v)| doc.get(k) == Some(v)))
            .cloned()
            .collect()
    }
}

fn compare_bson(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn as_f64(value: &Bson) -> Option<f64> {
        match value {
            Bson::Int32(v) => Some(f64::from(*v)),
            Bson::Int64(v) => Some(*v as f64),
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn apply_sort(docs: &mut [Document], sort: &Document) {
    if sort.keys().all(|k| k == "$natural") {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let ord = compare_bson(a.get(field), b.get(field));
            let ord = match direction {
                Bson::Int32(d) if *d < 0 => ord.reverse(),
                Bson::Int64(d) if *d < 0 => ord.reverse(),
                _ => ord,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl CollectionSource for MemoryCollection {
    type Cursor = MemoryCursor;

    async fn count(&self, filter: &Document, skip: u64, limit: u64) -> Result<u64> {
        self.journal().counts.push((filter.clone(), skip, limit));
        let matched = self.matching(filter).len() as u64;
        Ok(matched.saturating_sub(skip).min(limit))
    }

    async fn open(&self, request: CursorRequest) -> Result<Self::Cursor> {
        let mut docs = self.matching(&request.filter);

        let mut journal = self.journal();
        if let Some(n) = journal.visible_after_count {
            docs.truncate(n);
        }
        if let Some(ref sort) = request.sort {
            apply_sort(&mut docs, sort);
        }

        let skip = usize::try_from(request.skip).unwrap_or(usize::MAX);
        let limit = request
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        let docs: VecDeque<Document> = docs.into_iter().skip(skip).take(limit).collect();

        let index = journal.requests.len();
        journal.requests.push(request);
        if journal.failing_opens.remove(&index) {
            return Err(ScanError::Generic("server selection timed out".into()));
        }
        let fault = journal.faults.remove(&index);
        let fail_close = journal.failing_closes.remove(&index);

        Ok(MemoryCursor {
            id: index,
            docs,
            pulled: 0,
            fault,
            fail_close,
            closed: false,
            journal: Arc::clone(&self.journal),
        })
    }
}

/// Cursor over a snapshot of [`MemoryCollection`].
pub(crate) struct MemoryCursor {
    id: usize,
    docs: VecDeque<Document>,
    pulled: usize,
    fault: Option<(usize, Fault)>,
    fail_close: bool,
    closed: bool,
    journal: Arc<Mutex<Journal>>,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        if self.closed {
            return Err(CursorError::Closed.into());
        }

        if let Some((after, fault)) = self.fault {
            if self.pulled == after {
                self.fault = None;
                return Err(match fault {
                    Fault::Invalidate => {
                        CursorError::NotFound(format!("cursor id {} not found", self.id)).into()
                    }
                    Fault::Fail => ScanError::Generic("connection reset by peer".into()),
                });
            }
        }

        let doc = self.docs.pop_front();
        if doc.is_some() {
            self.pulled += 1;
            self.journal
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .pulls += 1;
        }
        Ok(doc)
    }

    async fn close(&mut self) -> Result<()> {
        if self.fail_close {
            self.fail_close = false;
            self.closed = true;
            return Err(ScanError::Generic(format!("killCursors failed for cursor {}", self.id)));
        }
        if !self.closed {
            self.closed = true;
            self.journal
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .closed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn test_count_honors_skip_and_limit() {
        let source = MemoryCollection::new((0..10).map(|n| doc! { "n": n }).collect());
        assert_eq!(source.count(&doc! {}, 0, 100).await.unwrap(), 10);
        assert_eq!(source.count(&doc! {}, 4, 100).await.unwrap(), 6);
        assert_eq!(source.count(&doc! {}, 4, 3).await.unwrap(), 3);
        assert_eq!(source.count(&doc! {}, 20, 3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once() {
        let source = MemoryCollection::new(vec![doc! { "n": 0 }, doc! { "n": 1 }]);
        source.inject(0, 1, Fault::Invalidate);
        let mut cursor = source
            .open(CursorRequest {
                filter: doc! {},
                sort: None,
                skip: 0,
                limit: None,
                no_cursor_timeout: true,
                batch_size: None,
            })
            .await
            .unwrap();

        assert!(cursor.next_document().await.unwrap().is_some());
        assert!(cursor.next_document().await.unwrap_err().is_cursor_not_found());
        assert!(cursor.next_document().await.unwrap().is_some());
        assert!(cursor.next_document().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_open_and_close_failures() {
        let source = MemoryCollection::new(vec![doc! { "n": 0 }]);
        source.fail_open(0);
        source.fail_close(1);
        let request = CursorRequest {
            filter: doc! {},
            sort: None,
            skip: 0,
            limit: None,
            no_cursor_timeout: true,
            batch_size: None,
        };

        assert!(source.open(request.clone()).await.is_err());
        let mut cursor = source.open(request).await.unwrap();
        assert!(cursor.close().await.is_err());
        assert_eq!(source.requests().len(), 2);
        assert_eq!(source.closed_cursors(), 0);
    }
}
