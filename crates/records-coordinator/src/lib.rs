//! Patient Records Coordinator
//!
//! Operations over the consent ledger: patient and provider registration,
//! consent grant submission, consent-filtered reads and the supporting
//! queries. Each operation runs against a [`LedgerContext`] holding the
//! injected store, the caller's identity and the date used for consent
//! evaluation, and is reachable by name through [`dispatch::Ledger`].
//!
//! ## Partitions
//!
//! Patient masters, provider masters and name-index entries live in public
//! state. Each patient's detail bundle is kept twice: the single-org copy
//! written at registration and never re-filtered, and the dual-org copy that
//! accumulates grants and is projected for providers.

use chrono::{NaiveDate, Utc};
use mycelix_ledger_shared::config::LedgerConfig;
use mycelix_ledger_shared::error::HealthResult;
use mycelix_ledger_shared::identity::{Identity, ATTR_ID};
use mycelix_ledger_shared::store::Store;

pub mod consent;
pub mod dispatch;
pub mod projection;
pub mod queries;
pub mod registration;
pub mod requests;

#[cfg(test)]
mod test_support;

pub use dispatch::{Ledger, OperationRegistry, Response, EXPOSED_OPERATIONS};
pub use projection::project;

/// Everything one operation may touch
pub struct LedgerContext<'a> {
    pub store: &'a mut dyn Store,
    pub identity: &'a dyn Identity,
    pub config: &'a LedgerConfig,
    /// Date consent windows are evaluated against
    pub today: NaiveDate,
}

impl<'a> LedgerContext<'a> {
    pub fn new(
        store: &'a mut dyn Store,
        identity: &'a dyn Identity,
        config: &'a LedgerConfig,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            identity,
            config,
            today,
        }
    }

    /// The caller's `id` attribute, lower-cased to match stored keys.
    pub fn caller_id(&self) -> HealthResult<String> {
        Ok(self.identity.attribute(ATTR_ID)?.to_lowercase())
    }

    pub fn max_fragment(&self) -> usize {
        self.config.max_error_fragment
    }
}

/// Current UTC calendar date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
