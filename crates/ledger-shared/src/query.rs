//! Query result assembly.
//!
//! Turns store cursors into ordered JSON result lists:
//! `[{"Key": ..., "Record": ...}, ...]`. Paginated results carry a leading
//! `{"ResponseMetadata": {...}}` entry; history results render deletions as
//! an explicit `null` value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HealthError, HealthResult};
use crate::store::{Cursor, HistoryCursor, ResponseMetadata};

/// One `{Key, Record}` entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord<T = Value> {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMetadata {
    #[serde(rename = "RecordsCount")]
    pub records_count: usize,
    #[serde(rename = "Bookmark")]
    pub bookmark: String,
}

impl From<ResponseMetadata> for PaginationMetadata {
    fn from(meta: ResponseMetadata) -> Self {
        Self {
            records_count: meta.fetched_records_count,
            bookmark: meta.bookmark,
        }
    }
}

/// Element of a paginated result list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryEntry {
    Metadata {
        #[serde(rename = "ResponseMetadata")]
        metadata: PaginationMetadata,
    },
    Record(QueryRecord),
}

/// One historic value of a key
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "TxId")]
    pub tx_id: String,
    /// `None` renders as `null` for deletions
    #[serde(rename = "Value")]
    pub value: Option<Value>,
    /// RFC 3339
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "IsDelete")]
    pub is_delete: bool,
}

/// Drain a cursor into `{Key, Record}` entries, decoding each value as JSON.
pub fn collect_records(cursor: Cursor<'_>, max_fragment: usize) -> HealthResult<Vec<QueryRecord>> {
    cursor
        .map(|item| {
            let kv = item?;
            let record = serde_json::from_slice(&kv.value).map_err(|e| {
                HealthError::codec(
                    format!("Record {} is not a JSON document: {}", kv.key, e),
                    &kv.value,
                    max_fragment,
                )
            })?;
            Ok(QueryRecord { key: kv.key, record })
        })
        .collect()
}

/// Drain a history cursor. Deleted entries carry no value.
pub fn collect_history(
    cursor: HistoryCursor<'_>,
    max_fragment: usize,
) -> HealthResult<Vec<HistoryRecord>> {
    cursor
        .map(|item| {
            let entry = item?;
            let value = if entry.is_delete {
                None
            } else {
                Some(serde_json::from_slice(&entry.value).map_err(|e| {
                    HealthError::codec(
                        format!("History value in {} is not JSON: {}", entry.tx_id, e),
                        &entry.value,
                        max_fragment,
                    )
                })?)
            };
            Ok(HistoryRecord {
                tx_id: entry.tx_id,
                value,
                timestamp: entry.timestamp.to_rfc3339(),
                is_delete: entry.is_delete,
            })
        })
        .collect()
}

/// Prepend pagination metadata to a page of records.
pub fn paged_entries(records: Vec<QueryRecord>, metadata: ResponseMetadata) -> Vec<QueryEntry> {
    let mut entries = Vec::with_capacity(records.len() + 1);
    entries.push(QueryEntry::Metadata {
        metadata: metadata.into(),
    });
    entries.extend(records.into_iter().map(QueryEntry::Record));
    entries
}

/// Serialize any result list to the JSON payload returned to callers.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> HealthResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| HealthError::Codec {
        context: format!("Fails to marshal query result: {}", e),
        fragment: String::new(),
    })
}
