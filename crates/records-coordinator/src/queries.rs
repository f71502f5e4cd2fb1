//! Read operations.
//!
//! `GetPatientBySSN` is the only read that returns private data; everything
//! else reads public state.

use mycelix_ledger_shared::error::{HealthError, HealthResult};
use mycelix_ledger_shared::identity::ATTR_ROLE;
use mycelix_ledger_shared::index::split_composite_key;
use mycelix_ledger_shared::query::{
    collect_history, collect_records, paged_entries, HistoryRecord, QueryEntry, QueryRecord,
};
use mycelix_ledger_shared::store::{Partition, Selector, StoreExt};
use records_integrity::{Patient, PatientDetails, Provider};
use serde_json::Value;
use tracing::{debug, warn};

use crate::projection::project;
use crate::requests::{
    HistoryRequest, IdRequest, NameLookupRequest, PagedQueryRequest, PagedRangeRequest,
    PatientBySsnRequest, PatientInformationRequest, QueryRequest, RangeRequest,
};
use crate::LedgerContext;

/// Application role carried in the caller's `role` attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallerRole {
    Patient,
    Provider,
}

impl CallerRole {
    /// Roles are matched by prefix (`Patient`, `PatientPortal`, ...).
    pub fn from_attribute(role: &str) -> HealthResult<Self> {
        if role.starts_with("Patient") {
            Ok(CallerRole::Patient)
        } else if role.starts_with("Provider") {
            Ok(CallerRole::Provider)
        } else {
            Err(HealthError::Unauthorized(format!(
                "Only patients and providers can access medical details, got role {}",
                role
            )))
        }
    }
}

fn matching_keys(ctx: &LedgerContext<'_>, selector: &Selector) -> HealthResult<Vec<String>> {
    ctx.store
        .rich_query(selector)?
        .map(|item| item.map(|kv| kv.key))
        .collect()
}

/// `GetPatientBySSN`: patients get their own single-org bundle unfiltered,
/// providers get the dual-org bundle projected for themselves as of today.
pub fn get_patient_by_ssn(
    ctx: &LedgerContext<'_>,
    request: PatientBySsnRequest,
) -> HealthResult<Vec<QueryRecord<PatientDetails>>> {
    let role = CallerRole::from_attribute(&ctx.identity.attribute(ATTR_ROLE)?)?;
    let caller = ctx.caller_id()?;

    let selector = Selector::new()
        .eq("docType", Patient::DOC_TYPE)
        .eq("patientssn", request.ssn.as_str());
    let keys = matching_keys(ctx, &selector)?;
    debug!(matches = keys.len(), ?role, "patient lookup by ssn");

    let max_fragment = ctx.max_fragment();
    match role {
        CallerRole::Patient => {
            // SSNs are not unique; other patients' matches are dropped silently.
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            if !keys.contains(&caller) {
                return Err(HealthError::Unauthorized(format!(
                    "caller {} may only read its own records",
                    caller
                )));
            }
            let record: PatientDetails =
                ctx.store.require_json(Partition::SingleOrg, &caller, max_fragment)?;
            Ok(vec![QueryRecord { key: caller, record }])
        }
        CallerRole::Provider => keys
            .into_iter()
            .map(|key| {
                let details: PatientDetails =
                    ctx.store.require_json(Partition::DualOrg, &key, max_fragment)?;
                let record = project(&details, &caller, ctx.today);
                Ok(QueryRecord { key, record })
            })
            .collect(),
    }
}

/// `GetPatientByInformation`: patient masters matching name and birth date.
pub fn get_patient_by_information(
    ctx: &LedgerContext<'_>,
    request: PatientInformationRequest,
) -> HealthResult<Vec<QueryRecord>> {
    let selector = Selector::new()
        .eq("docType", Patient::DOC_TYPE)
        .eq("firstname", request.first_name)
        .eq("lastname", request.last_name)
        .eq("dob", request.dob);
    collect_records(ctx.store.rich_query(&selector)?, ctx.max_fragment())
}

/// `GetProviderById`: zero or one provider master.
pub fn get_provider_by_id(
    ctx: &LedgerContext<'_>,
    request: IdRequest,
) -> HealthResult<Vec<QueryRecord>> {
    let selector = Selector::new()
        .eq(Selector::ID_FIELD, request.id)
        .eq("docType", Provider::DOC_TYPE);
    collect_records(ctx.store.rich_query(&selector)?, ctx.max_fragment())
}

/// Resolve name-index entries to the records they point at. Entries whose
/// record is gone are skipped.
fn resolve_index(
    ctx: &LedgerContext<'_>,
    index_name: &str,
    request: &NameLookupRequest,
) -> HealthResult<Vec<QueryRecord>> {
    let prefix = request.prefix();
    let mut records = Vec::new();
    for item in ctx.store.prefix_scan(index_name, &prefix)? {
        let entry = item?;
        let (_, fields) = split_composite_key(&entry.key)?;
        let Some(id) = fields.last() else {
            warn!(index = index_name, "index entry without fields");
            continue;
        };
        match ctx.store.get_json::<Value>(Partition::Public, id, ctx.max_fragment())? {
            Some(record) => records.push(QueryRecord {
                key: id.clone(),
                record,
            }),
            None => warn!(index = index_name, key = %id, "stale index entry"),
        }
    }
    Ok(records)
}

/// `GetPatientsByName`: prefix lookup on the patient name index.
pub fn get_patients_by_name(
    ctx: &LedgerContext<'_>,
    request: NameLookupRequest,
) -> HealthResult<Vec<QueryRecord>> {
    resolve_index(ctx, &ctx.config.patient_name_index, &request)
}

/// `GetProvidersByName`: prefix lookup on the provider name index.
pub fn get_providers_by_name(
    ctx: &LedgerContext<'_>,
    request: NameLookupRequest,
) -> HealthResult<Vec<QueryRecord>> {
    resolve_index(ctx, &ctx.config.provider_name_index, &request)
}

pub fn get_records_by_range(
    ctx: &LedgerContext<'_>,
    request: RangeRequest,
) -> HealthResult<Vec<QueryRecord>> {
    let cursor = ctx.store.range_scan(&request.start_key, &request.end_key)?;
    collect_records(cursor, ctx.max_fragment())
}

pub fn get_records_by_range_paged(
    ctx: &LedgerContext<'_>,
    request: PagedRangeRequest,
) -> HealthResult<Vec<QueryEntry>> {
    ctx.config.check_page_size(request.page_size)?;
    let (cursor, metadata) = ctx.store.range_scan_paged(
        &request.start_key,
        &request.end_key,
        request.page_size,
        &request.bookmark,
    )?;
    let records = collect_records(cursor, ctx.max_fragment())?;
    Ok(paged_entries(records, metadata))
}

/// `QueryRecords`: ad hoc equality selector over public state.
pub fn query_records(
    ctx: &LedgerContext<'_>,
    request: QueryRequest,
) -> HealthResult<Vec<QueryRecord>> {
    let selector = Selector::from_query_string(&request.query, ctx.max_fragment())?;
    collect_records(ctx.store.rich_query(&selector)?, ctx.max_fragment())
}

pub fn query_records_paged(
    ctx: &LedgerContext<'_>,
    request: PagedQueryRequest,
) -> HealthResult<Vec<QueryEntry>> {
    ctx.config.check_page_size(request.page_size)?;
    let selector = Selector::from_query_string(&request.query, ctx.max_fragment())?;
    let (cursor, metadata) =
        ctx.store
            .rich_query_paged(&selector, request.page_size, &request.bookmark)?;
    let records = collect_records(cursor, ctx.max_fragment())?;
    Ok(paged_entries(records, metadata))
}

/// `GetHistoryForRecord`: every committed value of a public key, oldest first.
pub fn get_history(
    ctx: &LedgerContext<'_>,
    request: HistoryRequest,
) -> HealthResult<Vec<HistoryRecord>> {
    collect_history(ctx.store.history_of(&request.key)?, ctx.max_fragment())
}
