//! Ledger harness driving operations by name, the way a host would.

use chrono::{Days, NaiveDate};
use mycelix_ledger_shared::config::LedgerConfig;
use mycelix_ledger_shared::identity::{CallerAttributes, Identity};
use mycelix_ledger_shared::memory::MemoryStore;
use mycelix_ledger_shared::query::QueryRecord;
use mycelix_ledger_shared::ErrorKind;
use records_coordinator::{Ledger, Response};
use records_integrity::{calendar_date, PatientDetails};
use serde_json::{json, Value};

pub struct Harness {
    pub ledger: Ledger<MemoryStore>,
    pub today: NaiveDate,
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Update document carrying the same grant for all five categories.
pub fn grant_payload(provider_id: &str, start: NaiveDate, end: NaiveDate) -> String {
    let grant = json!({"providerconsent": [{
        "provider": {"providerId": provider_id},
        "starttime": calendar_date::format(&start),
        "endtime": calendar_date::format(&end),
    }]});
    json!({
        "medications": grant,
        "allergies": grant,
        "immunization": grant,
        "pastMedicalHx": grant,
        "familyHx": grant,
    })
    .to_string()
}

impl Harness {
    pub fn new(today: NaiveDate) -> Self {
        Self::with_config(today, LedgerConfig::default())
    }

    pub fn with_config(today: NaiveDate, config: LedgerConfig) -> Self {
        let ledger = match Ledger::new(MemoryStore::new(), config) {
            Ok(ledger) => ledger,
            Err(err) => panic!("ledger construction failed: {err}"),
        };
        Self { ledger, today }
    }

    pub fn call(&mut self, caller: &dyn Identity, operation: &str, args: &[String]) -> Response {
        self.ledger.invoke_at(caller, self.today, operation, args)
    }

    pub fn day(&self, offset: u64) -> NaiveDate {
        self.today + Days::new(offset)
    }

    pub fn register_provider(&mut self, id: &str, first: &str, last: &str) -> Response {
        let admin = CallerAttributes::admin("admin");
        self.call(
            &admin,
            "RegisterProvider",
            &args(&[id, "epic", "https://ehr.example", first, last, "internal medicine"]),
        )
    }

    pub fn register_patient(&mut self, provider_id: &str, id: &str, ssn: &str) -> Response {
        let provider = CallerAttributes::provider(provider_id);
        self.call(
            &provider,
            "RegisterPatient",
            &args(&[id, ssn, "https://records.example", "ada", "lovelace", "12-10-1815"]),
        )
    }

    pub fn grant(
        &mut self,
        patient_id: &str,
        provider_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Response {
        let patient = CallerAttributes::patient(patient_id);
        self.call(
            &patient,
            "UpdateProviderAccess",
            &[grant_payload(provider_id, start, end)],
        )
    }

    /// `GetPatientBySSN` decoded, panicking on an error response.
    pub fn read_by_ssn(
        &mut self,
        caller: &dyn Identity,
        ssn: &str,
    ) -> Vec<QueryRecord<PatientDetails>> {
        let response = self.call(caller, "GetPatientBySSN", &args(&[ssn]));
        decode(&response)
    }

    pub fn query(&mut self, operation: &str, values: &[&str]) -> Value {
        let anyone = CallerAttributes::new();
        let response = self.call(&anyone, operation, &args(values));
        decode(&response)
    }
}

pub fn decode<T: serde::de::DeserializeOwned>(response: &Response) -> T {
    match response {
        Response::Success { payload } => match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(err) => panic!("payload is not valid JSON: {err}"),
        },
        Response::Error { kind, message } => panic!("{kind:?}: {message}"),
    }
}

pub fn expect_error(response: &Response) -> ErrorKind {
    match response.error_kind() {
        Some(kind) => kind,
        None => panic!("expected an error, got {response:?}"),
    }
}
