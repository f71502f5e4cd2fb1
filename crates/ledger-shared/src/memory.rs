//! In-process [`Store`] backed by ordered maps.
//!
//! Mirrors the behaviour the ledger runtime gives chaincode: ordered keys per
//! partition, composite keys hidden from simple range scans, equality
//! selectors over JSON documents, key-ordered pagination and per-key history
//! for public writes.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::Utc;
use serde_json::Value;

use crate::error::{HealthError, HealthResult};
use crate::index::{is_composite_key, prefix_range};
use crate::store::{
    Cursor, HistoryCursor, HistoryEntry, KeyValue, Partition, ResponseMetadata, Selector, Store,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: BTreeMap<Partition, BTreeMap<String, Vec<u8>>>,
    history: BTreeMap<String, Vec<HistoryEntry>>,
    next_tx: u64,
    failing_partition: Option<Partition>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `partition` fail with a store error.
    pub fn fail_writes_to(&mut self, partition: Partition) {
        self.failing_partition = Some(partition);
    }

    pub fn clear_failures(&mut self) {
        self.failing_partition = None;
    }

    /// Number of keys held in `partition`, index entries included.
    pub fn len(&self, partition: Partition) -> usize {
        self.partitions.get(&partition).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.values().all(BTreeMap::is_empty)
    }

    fn public(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.partitions
            .get(&Partition::Public)
            .into_iter()
            .flat_map(|map| map.iter())
    }

    fn public_range(&self, start: Bound<&str>, end: Bound<&str>) -> Vec<KeyValue> {
        let Some(map) = self.partitions.get(&Partition::Public) else {
            return Vec::new();
        };
        if let (Bound::Included(s) | Bound::Excluded(s), Bound::Excluded(e)) = (start, end) {
            if s >= e {
                return Vec::new();
            }
        }
        map.range::<str, _>((start, end))
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    fn simple_range(&self, start: &str, end: &str) -> Vec<KeyValue> {
        let start = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start)
        };
        let end = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        self.public_range(start, end)
            .into_iter()
            .filter(|kv| !is_composite_key(&kv.key))
            .collect()
    }

    fn query_matches(&self, selector: &Selector) -> Vec<KeyValue> {
        self.public()
            .filter(|(key, _)| !is_composite_key(key))
            .filter_map(|(key, value)| {
                let document: Value = serde_json::from_slice(value).ok()?;
                selector.matches(key, &document).then(|| KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }

    fn check_writable(&self, partition: Partition, key: &str) -> HealthResult<()> {
        if self.failing_partition == Some(partition) {
            return Err(HealthError::Store(format!(
                "write to {} rejected for key {}",
                partition, key
            )));
        }
        Ok(())
    }

    fn record_history(&mut self, key: &str, value: Vec<u8>, is_delete: bool) {
        self.next_tx += 1;
        let entry = HistoryEntry {
            tx_id: format!("tx{:08}", self.next_tx),
            value,
            timestamp: Utc::now(),
            is_delete,
        };
        self.history.entry(key.to_string()).or_default().push(entry);
    }
}

/// Cut one page out of key-ordered `entries`, resuming after `bookmark`.
fn paginate(
    entries: Vec<KeyValue>,
    page_size: usize,
    bookmark: &str,
) -> HealthResult<(Vec<KeyValue>, ResponseMetadata)> {
    if page_size == 0 {
        return Err(HealthError::Validation("Page size must be greater than 0".to_string()));
    }
    let mut remaining = entries
        .into_iter()
        .filter(|kv| bookmark.is_empty() || kv.key.as_str() > bookmark)
        .peekable();

    let page: Vec<KeyValue> = remaining.by_ref().take(page_size).collect();
    let has_more = remaining.peek().is_some();
    let bookmark = match (has_more, page.last()) {
        (true, Some(last)) => last.key.clone(),
        _ => String::new(),
    };
    let metadata = ResponseMetadata {
        fetched_records_count: page.len(),
        bookmark,
    };
    Ok((page, metadata))
}

fn into_cursor<'a>(entries: Vec<KeyValue>) -> Cursor<'a> {
    Box::new(entries.into_iter().map(Ok))
}

impl Store for MemoryStore {
    fn get(&self, partition: Partition, key: &str) -> HealthResult<Option<Vec<u8>>> {
        Ok(self
            .partitions
            .get(&partition)
            .and_then(|map| map.get(key))
            .cloned())
    }

    fn put(&mut self, partition: Partition, key: &str, value: Vec<u8>) -> HealthResult<()> {
        self.check_writable(partition, key)?;
        if partition == Partition::Public {
            self.record_history(key, value.clone(), false);
        }
        self.partitions
            .entry(partition)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, partition: Partition, key: &str) -> HealthResult<()> {
        self.check_writable(partition, key)?;
        let removed = self
            .partitions
            .get_mut(&partition)
            .and_then(|map| map.remove(key));
        if partition == Partition::Public && removed.is_some() {
            self.record_history(key, Vec::new(), true);
        }
        Ok(())
    }

    fn range_scan(&self, start: &str, end: &str) -> HealthResult<Cursor<'_>> {
        Ok(into_cursor(self.simple_range(start, end)))
    }

    fn range_scan_paged(
        &self,
        start: &str,
        end: &str,
        page_size: usize,
        bookmark: &str,
    ) -> HealthResult<(Cursor<'_>, ResponseMetadata)> {
        let (page, metadata) = paginate(self.simple_range(start, end), page_size, bookmark)?;
        Ok((into_cursor(page), metadata))
    }

    fn prefix_scan(&self, index_name: &str, prefix: &[&str]) -> HealthResult<Cursor<'_>> {
        let (start, end) = prefix_range(index_name, prefix)?;
        let entries =
            self.public_range(Bound::Included(start.as_str()), Bound::Excluded(end.as_str()));
        Ok(into_cursor(entries))
    }

    fn rich_query(&self, selector: &Selector) -> HealthResult<Cursor<'_>> {
        Ok(into_cursor(self.query_matches(selector)))
    }

    fn rich_query_paged(
        &self,
        selector: &Selector,
        page_size: usize,
        bookmark: &str,
    ) -> HealthResult<(Cursor<'_>, ResponseMetadata)> {
        let (page, metadata) = paginate(self.query_matches(selector), page_size, bookmark)?;
        Ok((into_cursor(page), metadata))
    }

    fn history_of(&self, key: &str) -> HealthResult<HistoryCursor<'_>> {
        let entries = self.history.get(key).cloned().unwrap_or_default();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}
