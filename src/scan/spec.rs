//! Query specification for a scan: filter, sort order, skip and limit.

use mongodb::bson::{Bson, Document};

use crate::error::{QueryError, Result};

/// Bound used in place of "no limit".
///
/// Kept inside the signed 32-bit range so the remaining-count arithmetic on
/// resume never has to special-case an unbounded scan.
pub const UNBOUNDED_LIMIT: u64 = i32::MAX as u64;

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Value used in a MongoDB sort document.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Ordered list of `(field, direction)` pairs.
///
/// The default is natural order, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder(Vec<(String, SortDirection)>);

impl SortOrder {
    /// Natural (storage) order.
    pub fn natural() -> Self {
        Self(vec![("$natural".to_string(), SortDirection::Ascending)])
    }

    /// Build a sort order from explicit pairs.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, SortDirection)>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(|(f, d)| (f.into(), d)).collect())
    }

    /// Parse a sort document such as `{ "age": -1, "name": 1 }`.
    ///
    /// Directions must be `1` or `-1` (any numeric BSON type).
    pub fn from_document(doc: &Document) -> Result<Self> {
        if doc.is_empty() {
            return Ok(Self::natural());
        }

        let mut fields = Vec::with_capacity(doc.len());
        for (field, value) in doc {
            let direction = match value {
                Bson::Int32(1) | Bson::Int64(1) => SortDirection::Ascending,
                Bson::Int32(-1) | Bson::Int64(-1) => SortDirection::Descending,
                Bson::Double(d) if *d == 1.0 => SortDirection::Ascending,
                Bson::Double(d) if *d == -1.0 => SortDirection::Descending,
                other => {
                    return Err(QueryError::InvalidSort(format!(
                        "direction for '{field}' must be 1 or -1, got {other}"
                    ))
                    .into());
                }
            };
            fields.push((field.clone(), direction));
        }

        Ok(Self(fields))
    }

    /// Fields and directions in order.
    pub fn fields(&self) -> &[(String, SortDirection)] {
        &self.0
    }

    /// Whether this is plain natural order.
    pub fn is_natural(&self) -> bool {
        self.0.iter().all(|(field, _)| field == "$natural")
    }

    /// Render as a MongoDB sort document.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (field, direction) in &self.0 {
            doc.insert(field.clone(), direction.as_i32());
        }
        doc
    }

    /// Sort document sent to the server when opening a cursor.
    ///
    /// A field sort without `_id` gets `_id: 1` appended so documents with
    /// equal keys come back in the same order from every cursor. Natural
    /// order is left as-is.
    pub fn to_cursor_document(&self) -> Document {
        let mut doc = self.to_document();
        if !self.is_natural() && !doc.contains_key("_id") {
            doc.insert("_id", SortDirection::Ascending.as_i32());
        }
        doc
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::natural()
    }
}

/// Maximum number of documents a scan yields.
///
/// Zero means unbounded and is normalized to [`UNBOUNDED_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(u64);

impl Limit {
    /// Normalize a raw limit where `0` means "no limit".
    pub fn new(raw: u64) -> Self {
        if raw == 0 {
            Self(UNBOUNDED_LIMIT)
        } else {
            Self(raw)
        }
    }

    /// Unbounded scan.
    pub fn unbounded() -> Self {
        Self(UNBOUNDED_LIMIT)
    }

    /// Normalized value, never zero.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Whether the caller asked for no limit.
    pub fn is_unbounded(self) -> bool {
        self.0 == UNBOUNDED_LIMIT
    }

    /// Limit for a replacement cursor once `emitted` documents were delivered.
    pub fn remaining_after(self, emitted: u64) -> u64 {
        self.0.saturating_sub(emitted)
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Immutable description of one logical scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanSpec {
    filter: Document,
    sort: SortOrder,
    skip: u64,
    limit: Limit,
}

impl ScanSpec {
    /// Match-all scan in natural order with no skip and no limit.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Set the limit; `0` means unbounded.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Limit::new(limit);
        self
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }

    pub fn sort(&self) -> &SortOrder {
        &self.sort
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_zero_limit_is_normalized() {
        let limit = Limit::new(0);
        assert!(limit.is_unbounded());
        assert_eq!(limit.get(), 2_147_483_647);
        assert_eq!(Limit::new(25).get(), 25);
    }

    #[test]
    fn test_remaining_after() {
        assert_eq!(Limit::new(100).remaining_after(40), 60);
        assert_eq!(Limit::new(10).remaining_after(15), 0);
        assert_eq!(Limit::new(0).remaining_after(2499), UNBOUNDED_LIMIT - 2499);
    }

    #[test]
    fn test_default_spec() {
        let spec = ScanSpec::new();
        assert!(spec.filter().is_empty());
        assert!(spec.sort().is_natural());
        assert_eq!(spec.sort().to_document(), doc! { "$natural": 1 });
        assert_eq!(spec.skip(), 0);
        assert!(spec.limit().is_unbounded());
    }

    #[test]
    fn test_default_specs_are_independent() {
        let a = ScanSpec::new().with_filter(doc! { "status": "active" });
        let b = ScanSpec::new();
        assert!(b.filter().is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_sort_from_document_keeps_order() {
        let sort = SortOrder::from_document(&doc! { "age": -1, "name": 1 }).unwrap();
        assert_eq!(
            sort.fields(),
            &[
                ("age".to_string(), SortDirection::Descending),
                ("name".to_string(), SortDirection::Ascending),
            ]
        );
        assert!(!sort.is_natural());
        assert_eq!(sort.to_document(), doc! { "age": -1, "name": 1 });
    }

    #[test]
    fn test_cursor_sort_breaks_ties_on_id() {
        let sort = SortOrder::new([("status", SortDirection::Ascending)]);
        assert_eq!(sort.to_cursor_document(), doc! { "status": 1, "_id": 1 });

        let with_id = SortOrder::new([
            ("_id", SortDirection::Descending),
            ("status", SortDirection::Ascending),
        ]);
        assert_eq!(with_id.to_cursor_document(), doc! { "_id": -1, "status": 1 });

        assert_eq!(SortOrder::natural().to_cursor_document(), doc! { "$natural": 1 });
    }

    #[test]
    fn test_sort_from_empty_document_is_natural() {
        let sort = SortOrder::from_document(&doc! {}).unwrap();
        assert_eq!(sort, SortOrder::natural());
    }

    #[test]
    fn test_sort_rejects_bad_direction() {
        let err = SortOrder::from_document(&doc! { "age": "desc" }).unwrap_err();
        assert!(err.to_string().starts_with("Invalid sort"));
    }
}
