//! Consent-filtered projection.
//!
//! Given a stored detail bundle, the requesting provider and a date, each of
//! the five categories is evaluated independently: it survives untouched
//! (full grant history included) when at least one of its grants names the
//! provider and covers the date, and is replaced by its zero value
//! otherwise. Nothing here touches the store.

use chrono::NaiveDate;
use records_integrity::{CategoryKind, PatientDetails, RecordCategory};
use tracing::debug;

/// Whether any grant in `category` lets `provider_id` see it on `as_of`.
pub fn category_visible(category: &RecordCategory, provider_id: &str, as_of: NaiveDate) -> bool {
    category
        .provider_consent
        .iter()
        .any(|grant| grant.permits(provider_id, as_of))
}

/// The view of `details` that `provider_id` is entitled to on `as_of`.
pub fn project(details: &PatientDetails, provider_id: &str, as_of: NaiveDate) -> PatientDetails {
    let mut view = details.clone();
    for kind in CategoryKind::ALL {
        let visible = category_visible(details.category(kind), provider_id, as_of);
        debug!(category = %kind, provider = provider_id, visible, "projection");
        if !visible {
            *view.category_mut(kind) = RecordCategory::default();
        }
    }
    view
}
