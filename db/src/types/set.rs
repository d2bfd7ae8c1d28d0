use std::collections::HashMap;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use super::dataset::{Dataset, ExportFormat};
use super::row::Row;
use crate::backend::Cursor;
use crate::error::DbError;
use crate::value::Value;

/// Rows pulled from a one-shot cursor.
///
/// Rows are cached as they are pulled and never fetched twice. Index and slice
/// access pull only as many rows as they need. Once the cursor reports the end of
/// data it is dropped and the set is no longer pending.
pub struct Set<'c> {
    attributes: Arc<[String]>,
    cache: Vec<Row>,
    cursor: Option<Box<dyn Cursor + 'c>>,
}

impl<'c> Set<'c> {
    pub fn new(cursor: Box<dyn Cursor + 'c>) -> Self {
        let attributes: Arc<[String]> = cursor.columns().to_vec().into();
        Self {
            attributes,
            cache: Vec::new(),
            cursor: Some(cursor),
        }
    }

    /// True while the cursor may still yield rows.
    pub fn is_pending(&self) -> bool {
        self.cursor.is_some()
    }

    /// Pulls one row from the cursor into the cache. Returns false at end of data.
    fn pull(&mut self) -> Result<bool, DbError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };
        match cursor.fetch()? {
            Some(values) => {
                let row = Row::new(Arc::clone(&self.attributes), values)?;
                self.cache.push(row);
                Ok(true)
            }
            None => {
                self.cursor = None;
                Ok(false)
            }
        }
    }

    /// Pulls until at least `count` rows are cached or the cursor is exhausted.
    fn pull_until(&mut self, count: usize) -> Result<(), DbError> {
        while self.cache.len() < count && self.pull()? {}
        Ok(())
    }

    fn drain(&mut self) -> Result<(), DbError> {
        while self.pull()? {}
        Ok(())
    }

    /// Pulls the next row from the cursor; `Ok(None)` once there are no more rows.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<&Row>, DbError> {
        if self.pull()? {
            Ok(self.cache.last())
        } else {
            Ok(None)
        }
    }

    pub fn get(&mut self, index: usize) -> Result<Option<&Row>, DbError> {
        self.pull_until(index.saturating_add(1))?;
        Ok(self.cache.get(index))
    }

    /// Returns the rows in `range` as a new, fully materialized set.
    pub fn slice<R: RangeBounds<usize>>(&mut self, range: R) -> Result<Set<'static>, DbError> {
        let end = match range.end_bound() {
            Bound::Included(end) => Some(end.saturating_add(1)),
            Bound::Excluded(end) => Some(*end),
            Bound::Unbounded => None,
        };
        match end {
            Some(end) => self.pull_until(end)?,
            None => self.drain()?,
        }

        let len = self.cache.len();
        let start = match range.start_bound() {
            Bound::Included(start) => *start,
            Bound::Excluded(start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = end.unwrap_or(len).clamp(start, len);

        Ok(Set::from_rows(
            Arc::clone(&self.attributes),
            self.cache[start..end].to_vec(),
        ))
    }

    /// Drains the cursor and returns every row.
    pub fn all(&mut self) -> Result<&[Row], DbError> {
        self.drain()?;
        Ok(&self.cache)
    }

    /// Rows pulled so far.
    pub fn cached(&self) -> &[Row] {
        &self.cache
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.cache.iter()
    }

    /// Number of rows pulled so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Drains the cursor and releases the borrow on the connection.
    pub fn detach(mut self) -> Result<Set<'static>, DbError> {
        self.drain()?;
        Ok(Set::from_rows(self.attributes, self.cache))
    }

    pub fn into_rows(mut self) -> Result<Vec<Row>, DbError> {
        self.drain()?;
        Ok(self.cache)
    }

    pub fn as_dict(&mut self) -> Result<Vec<HashMap<String, Value>>, DbError> {
        Ok(self.all()?.iter().map(Row::as_dict).collect())
    }

    pub fn as_ordered_dict(&mut self) -> Result<Vec<Vec<(String, Value)>>, DbError> {
        Ok(self.all()?.iter().map(Row::as_ordered_dict).collect())
    }

    pub fn as_dataset(&mut self) -> Result<Dataset, DbError> {
        self.drain()?;
        let mut dataset = Dataset::new(self.attributes.to_vec());
        for row in &self.cache {
            dataset.push(row.values())?;
        }
        Ok(dataset)
    }

    pub fn export(&mut self, format: ExportFormat) -> Result<String, DbError> {
        self.as_dataset()?.export(format)
    }
}

impl Set<'static> {
    /// Builds an already materialized set.
    pub fn from_rows(attributes: impl Into<Arc<[String]>>, rows: Vec<Row>) -> Self {
        let attributes = attributes.into();
        Self {
            attributes,
            cache: rows,
            cursor: None,
        }
    }
}

impl<'a, 'c> IntoIterator for &'a Set<'c> {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.cache.iter()
    }
}

impl fmt::Debug for Set<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("attributes", &self.attributes)
            .field("rows", &self.cache)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl fmt::Display for Set<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Set {}>", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BufferedCursor;
    use rstest::{fixture, rstest};

    /// Counts fetches so tests can tell cached rows from re-fetched ones.
    struct CountingCursor {
        inner: BufferedCursor,
        fetches: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Cursor for CountingCursor {
        fn columns(&self) -> &[String] {
            self.inner.columns()
        }

        fn fetch(&mut self) -> Result<Option<Vec<Value>>, DbError> {
            self.fetches
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.fetch()
        }
    }

    fn page_rows(n: i64) -> Vec<Vec<Value>> {
        (1..=n)
            .map(|i| vec![Value::Integer(i), Value::Text(format!("Page {}", i))])
            .collect()
    }

    #[fixture]
    fn fetches() -> Arc<std::sync::atomic::AtomicUsize> {
        Arc::new(std::sync::atomic::AtomicUsize::new(0))
    }

    fn counting_set(n: i64, fetches: &Arc<std::sync::atomic::AtomicUsize>) -> Set<'static> {
        Set::new(Box::new(CountingCursor {
            inner: BufferedCursor::new(vec!["id".into(), "title".into()], page_rows(n)),
            fetches: Arc::clone(fetches),
        }))
    }

    fn fetched(fetches: &Arc<std::sync::atomic::AtomicUsize>) -> usize {
        fetches.load(std::sync::atomic::Ordering::SeqCst)
    }

    #[rstest]
    fn test_next_pulls_one_row_at_a_time(fetches: Arc<std::sync::atomic::AtomicUsize>) {
        let mut set = counting_set(2, &fetches);
        assert!(set.is_pending());
        assert_eq!(set.next().unwrap().and_then(|r| r.get_i64("id")), Some(1));
        assert_eq!(set.len(), 1);
        assert_eq!(fetched(&fetches), 1);

        assert!(set.next().unwrap().is_some());
        assert!(set.next().unwrap().is_none());
        assert!(!set.is_pending());
        assert!(set.next().unwrap().is_none());
        assert_eq!(set.len(), 2);
    }

    #[rstest]
    fn test_get_pulls_only_what_it_needs(fetches: Arc<std::sync::atomic::AtomicUsize>) {
        let mut set = counting_set(5, &fetches);
        let row = set.get(1).unwrap().cloned().unwrap();
        assert_eq!(row.get_str("title"), Some("Page 2"));
        assert_eq!(set.len(), 2);
        assert_eq!(fetched(&fetches), 2);

        set.get(0).unwrap();
        assert_eq!(fetched(&fetches), 2);
        assert!(set.get(10).unwrap().is_none());
        assert!(!set.is_pending());
    }

    #[rstest]
    fn test_all_twice_does_not_refetch(fetches: Arc<std::sync::atomic::AtomicUsize>) {
        let mut set = counting_set(3, &fetches);
        let first: Vec<Row> = set.all().unwrap().to_vec();
        let after_first = fetched(&fetches);
        let second: Vec<Row> = set.all().unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(fetched(&fetches), after_first);
    }

    #[rstest]
    #[case(1..3, vec![2, 3])]
    #[case(..2, vec![1, 2])]
    #[case(3.., vec![4, 5])]
    #[case(4..10, vec![5])]
    #[case(7..9, vec![])]
    fn test_slice<R: RangeBounds<usize>>(#[case] range: R, #[case] expected: Vec<i64>) {
        let fetches = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut set = counting_set(5, &fetches);
        let slice = set.slice(range).unwrap();
        assert!(!slice.is_pending());
        let ids: Vec<i64> = slice.iter().filter_map(|r| r.get_i64("id")).collect();
        assert_eq!(ids, expected);
    }

    #[rstest]
    fn test_slice_pulls_to_range_end(fetches: Arc<std::sync::atomic::AtomicUsize>) {
        let mut set = counting_set(5, &fetches);
        set.slice(0..2).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.is_pending());
    }

    #[rstest]
    fn test_empty_set_keeps_headers() {
        let mut set = Set::new(Box::new(BufferedCursor::new(
            vec!["id".into()],
            Vec::<Vec<Value>>::new(),
        )));
        assert!(set.all().unwrap().is_empty());
        assert_eq!(set.export(ExportFormat::Csv).unwrap(), "id\n");
        assert_eq!(set.export(ExportFormat::Json).unwrap(), "[]");
    }

    #[rstest]
    fn test_exports_drain_the_cursor(fetches: Arc<std::sync::atomic::AtomicUsize>) {
        let mut set = counting_set(2, &fetches);
        assert_eq!(
            set.export(ExportFormat::Csv).unwrap(),
            "id,title\n1,Page 1\n2,Page 2\n"
        );
        assert_eq!(set.as_dict().unwrap().len(), 2);
        assert_eq!(set.as_ordered_dict().unwrap()[0][0].0, "id");
    }

    #[rstest]
    fn test_detach_and_display(fetches: Arc<std::sync::atomic::AtomicUsize>) {
        let set = counting_set(3, &fetches);
        assert_eq!(set.to_string(), "<Set 0>");
        let detached = set.detach().unwrap();
        assert_eq!(detached.to_string(), "<Set 3>");
        assert!(!detached.is_pending());
    }

    #[rstest]
    fn test_fetch_error_surfaces() {
        struct Failing;
        impl Cursor for Failing {
            fn columns(&self) -> &[String] {
                &[]
            }
            fn fetch(&mut self) -> Result<Option<Vec<Value>>, DbError> {
                Err(DbError::operational("connection reset"))
            }
        }

        let mut set = Set::new(Box::new(Failing));
        assert!(matches!(set.next(), Err(DbError::Operational { .. })));
        assert!(set.all().is_err());
    }
}
