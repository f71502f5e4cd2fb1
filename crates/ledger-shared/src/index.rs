//! Composite keys for secondary indexes.
//!
//! A composite key is `U+0000 name U+0000 field1 U+0000 ... fieldN U+0000`.
//! Because every segment is terminated, all keys that share an index name
//! and a leading run of fields also share a byte prefix, so a prefix scan
//! returns exactly those entries in key order. Index entries carry only
//! [`INDEX_MARKER`]; the indexed record is fetched by its own key.

use crate::error::{HealthError, HealthResult};

/// Leading and separating character of every composite key
pub const COMPOSITE_KEY_NAMESPACE: char = '\u{0000}';

/// Largest code point; reserved as the open end of prefix ranges
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Value stored under an index key. A nil value would read as a delete.
pub const INDEX_MARKER: [u8; 1] = [0x00];

fn validate_segment(segment: &str, label: &str) -> HealthResult<()> {
    if segment.contains(COMPOSITE_KEY_NAMESPACE) || segment.contains(MAX_UNICODE_RUNE) {
        return Err(HealthError::Validation(format!(
            "{} contains a reserved character: {:?}",
            label, segment
        )));
    }
    Ok(())
}

/// Build the full composite key for `index_name` over `fields`.
pub fn build_composite_key<S: AsRef<str>>(index_name: &str, fields: &[S]) -> HealthResult<String> {
    if index_name.is_empty() {
        return Err(HealthError::Validation(
            "Composite key index name must be non-empty".to_string(),
        ));
    }
    validate_segment(index_name, "index name")?;

    let mut key = String::with_capacity(
        2 + index_name.len() + fields.iter().map(|f| f.as_ref().len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(index_name);
    key.push(COMPOSITE_KEY_NAMESPACE);
    for field in fields {
        let field = field.as_ref();
        validate_segment(field, "composite key field")?;
        key.push_str(field);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    Ok(key)
}

/// Split a composite key back into `(index_name, fields)`.
pub fn split_composite_key(key: &str) -> HealthResult<(String, Vec<String>)> {
    let malformed = || HealthError::Validation(format!("Malformed composite key: {:?}", key));

    let body = key
        .strip_prefix(COMPOSITE_KEY_NAMESPACE)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_NAMESPACE))
        .ok_or_else(malformed)?;

    let mut segments = body.split(COMPOSITE_KEY_NAMESPACE);
    let index_name = segments
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(malformed)?;
    let fields = segments.map(str::to_string).collect();

    Ok((index_name.to_string(), fields))
}

/// Whether `key` lives in the composite-key namespace.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_NAMESPACE)
}

/// Half-open key range covering every composite key that starts with the
/// given index name and leading fields.
pub fn prefix_range<S: AsRef<str>>(
    index_name: &str,
    prefix: &[S],
) -> HealthResult<(String, String)> {
    let start = build_composite_key(index_name, prefix)?;
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    Ok((start, end))
}
