//! Operation registry and the ledger entry point.
//!
//! Operations are invoked by name with positional string arguments. The
//! registry maps each name to a typed handler and is checked against
//! [`EXPOSED_OPERATIONS`] when a [`Ledger`] is built.

use chrono::NaiveDate;
use mycelix_ledger_shared::config::LedgerConfig;
use mycelix_ledger_shared::error::{ErrorKind, HealthError, HealthResult};
use mycelix_ledger_shared::identity::Identity;
use mycelix_ledger_shared::query::to_payload;
use mycelix_ledger_shared::store::Store;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::requests::*;
use crate::{consent, queries, registration, today, LedgerContext};

/// Operations every deployment must expose
pub const EXPOSED_OPERATIONS: [&str; 6] = [
    "RegisterPatient",
    "RegisterProvider",
    "GetPatientBySSN",
    "GetPatientByInformation",
    "GetProviderById",
    "UpdateProviderAccess",
];

pub type Handler = fn(&mut LedgerContext<'_>, &[String]) -> HealthResult<Vec<u8>>;

/// Name to handler table
#[derive(Clone, Default)]
pub struct OperationRegistry {
    entries: Vec<(&'static str, Handler)>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &'static str, handler: Handler) -> Self {
        self.entries.push((name, handler));
        self
    }

    /// Every operation this crate implements.
    pub fn standard() -> Self {
        Self::new()
            .register("RegisterPatient", register_patient)
            .register("RegisterProvider", register_provider)
            .register("GetPatientBySSN", get_patient_by_ssn)
            .register("GetPatientByInformation", get_patient_by_information)
            .register("GetProviderById", get_provider_by_id)
            .register("UpdateProviderAccess", update_provider_access)
            .register("GetPatientsByName", get_patients_by_name)
            .register("GetProvidersByName", get_providers_by_name)
            .register("GetRecordsByRange", get_records_by_range)
            .register("GetRecordsByRangeWithPagination", get_records_by_range_paged)
            .register("QueryRecords", query_records)
            .register("QueryRecordsWithPagination", query_records_paged)
            .register("GetHistoryForRecord", get_history_for_record)
            .register("DeleteProvider", delete_provider)
    }

    /// Names must be unique and cover [`EXPOSED_OPERATIONS`].
    pub fn validate(&self) -> HealthResult<()> {
        for (i, (name, _)) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|(seen, _)| seen == name) {
                return Err(HealthError::Validation(format!(
                    "Operation {} is registered more than once",
                    name
                )));
            }
        }
        let missing: Vec<&str> = EXPOSED_OPERATIONS
            .iter()
            .copied()
            .filter(|exposed| !self.names().any(|name| name == *exposed))
            .collect();
        if !missing.is_empty() {
            return Err(HealthError::Validation(format!(
                "Missing handlers for exposed operations: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.entries
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, handler)| *handler)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}

/// Tagged result of one invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success { payload: Vec<u8> },
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Response::Success { payload } => Some(payload),
            Response::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Response::Success { .. } => None,
            Response::Error { kind, .. } => Some(*kind),
        }
    }
}

impl From<HealthResult<Vec<u8>>> for Response {
    fn from(result: HealthResult<Vec<u8>>) -> Self {
        match result {
            Ok(payload) => Response::Success { payload },
            Err(err) => Response::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

/// A store plus the operations that may run against it
pub struct Ledger<S: Store> {
    store: S,
    config: LedgerConfig,
    registry: OperationRegistry,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: S, config: LedgerConfig) -> HealthResult<Self> {
        Self::with_registry(store, config, OperationRegistry::standard())
    }

    pub fn with_registry(
        store: S,
        config: LedgerConfig,
        registry: OperationRegistry,
    ) -> HealthResult<Self> {
        config.validate()?;
        registry.validate()?;
        Ok(Self {
            store,
            config,
            registry,
        })
    }

    /// Run `operation` for `identity`, evaluating consent as of today.
    pub fn invoke(
        &mut self,
        identity: &dyn Identity,
        operation: &str,
        args: &[String],
    ) -> Response {
        self.invoke_at(identity, today(), operation, args)
    }

    pub fn invoke_at(
        &mut self,
        identity: &dyn Identity,
        as_of: NaiveDate,
        operation: &str,
        args: &[String],
    ) -> Response {
        let Some(handler) = self.registry.get(operation) else {
            warn!(operation, "unknown operation");
            let err = HealthError::Validation(format!("Unknown operation: {}", operation));
            return Response::Error {
                kind: err.kind(),
                message: err.to_string(),
            };
        };

        info!(operation, args = args.len(), "invoke");
        let mut ctx = LedgerContext::new(&mut self.store, identity, &self.config, as_of);
        let result = handler(&mut ctx, args);
        if let Err(err) = &result {
            warn!(operation, kind = ?err.kind(), error = %err, "operation failed");
        }
        result.into()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

}

// ==================== Handlers ====================

fn register_patient(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    registration::register_patient(ctx, RegisterPatientRequest::from_args(args)?)?;
    Ok(Vec::new())
}

fn register_provider(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    registration::register_provider(ctx, RegisterProviderRequest::from_args(args)?)?;
    Ok(Vec::new())
}

fn delete_provider(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    registration::delete_provider(ctx, IdRequest::from_args(args)?)?;
    Ok(Vec::new())
}

fn update_provider_access(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    consent::update_provider_access(ctx, UpdateProviderAccessRequest::from_args(args)?)?;
    Ok(b"Success".to_vec())
}

fn get_patient_by_ssn(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_patient_by_ssn(ctx, PatientBySsnRequest::from_args(args)?)?)
}

fn get_patient_by_information(
    ctx: &mut LedgerContext<'_>,
    args: &[String],
) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_patient_by_information(
        ctx,
        PatientInformationRequest::from_args(args)?,
    )?)
}

fn get_provider_by_id(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_provider_by_id(ctx, IdRequest::from_args(args)?)?)
}

fn get_patients_by_name(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_patients_by_name(ctx, NameLookupRequest::from_args(args)?)?)
}

fn get_providers_by_name(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_providers_by_name(ctx, NameLookupRequest::from_args(args)?)?)
}

fn get_records_by_range(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_records_by_range(ctx, RangeRequest::from_args(args)?)?)
}

fn get_records_by_range_paged(
    ctx: &mut LedgerContext<'_>,
    args: &[String],
) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_records_by_range_paged(ctx, PagedRangeRequest::from_args(args)?)?)
}

fn query_records(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::query_records(ctx, QueryRequest::from_args(args)?)?)
}

fn query_records_paged(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::query_records_paged(ctx, PagedQueryRequest::from_args(args)?)?)
}

fn get_history_for_record(ctx: &mut LedgerContext<'_>, args: &[String]) -> HealthResult<Vec<u8>> {
    to_payload(&queries::get_history(ctx, HistoryRequest::from_args(args)?)?)
}
