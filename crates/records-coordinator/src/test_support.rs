//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use mycelix_ledger_shared::config::LedgerConfig;
use mycelix_ledger_shared::identity::{CallerAttributes, Identity};
use mycelix_ledger_shared::memory::MemoryStore;
use records_integrity::{Patient, Provider};

use crate::registration::{register_patient, register_provider};
use crate::requests::{RegisterPatientRequest, RegisterProviderRequest};
use crate::LedgerContext;

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub struct Fixture {
    pub store: MemoryStore,
    pub config: LedgerConfig,
    pub today: NaiveDate,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            config: LedgerConfig::default(),
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    pub fn ctx<'a>(&'a mut self, identity: &'a dyn Identity) -> LedgerContext<'a> {
        LedgerContext::new(&mut self.store, identity, &self.config, self.today)
    }

    pub fn add_provider(&mut self, id: &str, first: &str, last: &str) -> Provider {
        let admin = CallerAttributes::admin("root");
        let fields = args(&[id, "epic", "https://ehr", first, last, "dx"]);
        let request = RegisterProviderRequest::from_args(&fields).unwrap();
        register_provider(&mut self.ctx(&admin), request).unwrap()
    }

    /// Register `ada lovelace` under `id`, seeded with a grant to `provider_id`.
    pub fn add_patient(&mut self, id: &str, ssn: &str, provider_id: &str) -> Patient {
        let caller = CallerAttributes::provider(provider_id);
        let request = RegisterPatientRequest::from_args(&args(&[
            id,
            ssn,
            "https://records",
            "ada",
            "lovelace",
            "12-10-1815",
        ]))
        .unwrap();
        register_patient(&mut self.ctx(&caller), request).unwrap()
    }
}
