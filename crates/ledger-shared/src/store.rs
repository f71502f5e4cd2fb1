//! Record store adapter.
//!
//! The ledger runtime owns storage; this crate only sees it through the
//! [`Store`] trait. Three partitions exist: public world state and two
//! private-data collections. Typed JSON access is layered on top by
//! [`StoreExt`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HealthError, HealthResult};

/// Isolated storage namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Partition {
    /// Global world state, visible to every member
    Public,
    /// Private collection held by the patient's own organization
    SingleOrg,
    /// Private collection shared between the patient and provider organizations
    DualOrg,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Public => "public",
            Partition::SingleOrg => "private/single-org",
            Partition::DualOrg => "private/dual-org",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(key, value)` pair yielded by a scan or query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One historic write to a public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub tx_id: String,
    /// Empty for deletions
    pub value: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub is_delete: bool,
}

/// Pagination bookkeeping returned alongside a page of results
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ResponseMetadata {
    pub fetched_records_count: usize,
    /// Opaque continuation token; empty when there are no more pages
    pub bookmark: String,
}

/// Lazily evaluated sequence of store results. Any element may fail.
pub type Cursor<'a> = Box<dyn Iterator<Item = HealthResult<KeyValue>> + 'a>;

/// Lazily evaluated sequence of history entries.
pub type HistoryCursor<'a> = Box<dyn Iterator<Item = HealthResult<HistoryEntry>> + 'a>;

/// Equality selector for the document-query engine.
///
/// Rendered as `{"selector":{...}}`. The field `_id` matches the record key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    fields: Map<String, Value>,
}

impl Selector {
    pub const ID_FIELD: &'static str = "_id";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Parse a caller-supplied `{"selector":{...}}` expression.
    pub fn from_query_string(query: &str, max_fragment: usize) -> HealthResult<Self> {
        let parsed: Value = serde_json::from_str(query).map_err(|e| {
            HealthError::codec(
                format!("Error in unmarshal query selector: {}", e),
                query.as_bytes(),
                max_fragment,
            )
        })?;
        match parsed.get("selector") {
            Some(Value::Object(fields)) => Ok(Self {
                fields: fields.clone(),
            }),
            _ => Err(HealthError::codec(
                "Query must be an object with a \"selector\" object",
                query.as_bytes(),
                max_fragment,
            )),
        }
    }

    /// Whether the document stored under `key` satisfies every field.
    pub fn matches(&self, key: &str, document: &Value) -> bool {
        self.fields.iter().all(|(field, expected)| {
            if field == Self::ID_FIELD {
                expected.as_str() == Some(key)
            } else {
                document.get(field) == Some(expected)
            }
        })
    }
}

/// Partitioned key-value store supplied by the ledger runtime.
///
/// Scans and queries operate on the public partition only.
pub trait Store {
    fn get(&self, partition: Partition, key: &str) -> HealthResult<Option<Vec<u8>>>;

    fn put(&mut self, partition: Partition, key: &str, value: Vec<u8>) -> HealthResult<()>;

    fn delete(&mut self, partition: Partition, key: &str) -> HealthResult<()>;

    /// Half-open `[start, end)` scan over simple keys. An empty bound is
    /// unbounded. Composite index keys are never returned.
    fn range_scan(&self, start: &str, end: &str) -> HealthResult<Cursor<'_>>;

    /// Paginated variant of [`Store::range_scan`].
    fn range_scan_paged(
        &self,
        start: &str,
        end: &str,
        page_size: usize,
        bookmark: &str,
    ) -> HealthResult<(Cursor<'_>, ResponseMetadata)>;

    /// All composite keys under `index_name` whose leading fields equal
    /// `prefix`, in key order.
    fn prefix_scan(&self, index_name: &str, prefix: &[&str]) -> HealthResult<Cursor<'_>>;

    fn rich_query(&self, selector: &Selector) -> HealthResult<Cursor<'_>>;

    fn rich_query_paged(
        &self,
        selector: &Selector,
        page_size: usize,
        bookmark: &str,
    ) -> HealthResult<(Cursor<'_>, ResponseMetadata)>;

    fn history_of(&self, key: &str) -> HealthResult<HistoryCursor<'_>>;
}

/// Typed JSON helpers over any [`Store`].
pub trait StoreExt: Store {
    /// Read and decode a JSON document. `Ok(None)` when the key is absent.
    fn get_json<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
        max_fragment: usize,
    ) -> HealthResult<Option<T>> {
        match self.get(partition, key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                HealthError::codec(
                    format!("Fails to unmarshal {} in {}: {}", key, partition, e),
                    &bytes,
                    max_fragment,
                )
            }),
        }
    }

    /// Like [`StoreExt::get_json`] but a missing key is a `NotFound` error.
    fn require_json<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
        max_fragment: usize,
    ) -> HealthResult<T> {
        self.get_json(partition, key, max_fragment)?
            .ok_or_else(|| HealthError::not_found(partition, key))
    }

    fn put_json<T: Serialize>(
        &mut self,
        partition: Partition,
        key: &str,
        value: &T,
    ) -> HealthResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| HealthError::Codec {
            context: format!("Fails to marshal {} for {}: {}", key, partition, e),
            fragment: String::new(),
        })?;
        tracing::debug!(partition = %partition, key, bytes = bytes.len(), "put");
        self.put(partition, key, bytes)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
