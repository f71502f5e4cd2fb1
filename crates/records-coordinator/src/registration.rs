//! Patient and provider registration.
//!
//! Registration writes are independent: a failure part-way through is
//! reported but earlier writes stay. Re-registering the same id with the
//! same arguments rewrites the same keys.

use chrono::{Months, NaiveDate};
use mycelix_ledger_shared::error::{HealthError, HealthResult};
use mycelix_ledger_shared::identity::{ATTR_MSP_ROLE, MSP_ROLE_ADMIN, MSP_ROLE_CLIENT};
use mycelix_ledger_shared::index::{build_composite_key, INDEX_MARKER};
use mycelix_ledger_shared::store::{Partition, Store, StoreExt};
use records_integrity::{
    validate_patient, validate_provider, Consent, Patient, PatientDetails, Provider,
};
use tracing::info;

use crate::requests::{IdRequest, RegisterPatientRequest, RegisterProviderRequest};
use crate::LedgerContext;

/// Load a registered provider master from public state.
pub fn load_provider(
    store: &dyn Store,
    provider_id: &str,
    max_fragment: usize,
) -> HealthResult<Provider> {
    let provider: Provider = store.require_json(Partition::Public, provider_id, max_fragment)?;
    if provider.doc_type != Provider::DOC_TYPE {
        return Err(HealthError::not_found(Partition::Public, provider_id));
    }
    Ok(provider)
}

fn require_msp_role(ctx: &LedgerContext<'_>, allowed: &[&str], action: &str) -> HealthResult<()> {
    let msp_role = ctx.identity.attribute(ATTR_MSP_ROLE)?;
    if allowed.contains(&msp_role.as_str()) {
        Ok(())
    } else {
        Err(HealthError::Unauthorized(format!(
            "mspRole {} may not {}",
            msp_role, action
        )))
    }
}

/// Grant seeded into every category of a newly registered patient.
pub fn default_grant(provider: Provider, today: NaiveDate, months: u32) -> HealthResult<Consent> {
    let end = today.checked_add_months(Months::new(months)).ok_or_else(|| {
        HealthError::Validation(format!(
            "Default consent of {} months from {} is out of range",
            months, today
        ))
    })?;
    Ok(Consent::new(provider, today, end))
}

fn put_index_entry(
    store: &mut dyn Store,
    index_name: &str,
    first_name: &str,
    last_name: &str,
    id: &str,
) -> HealthResult<()> {
    let key = build_composite_key(index_name, &[first_name, last_name, id])?;
    store.put(Partition::Public, &key, INDEX_MARKER.to_vec())
}

/// `RegisterPatient`: caller must be a client or admin whose `id` names a
/// registered provider.
pub fn register_patient(
    ctx: &mut LedgerContext<'_>,
    request: RegisterPatientRequest,
) -> HealthResult<Patient> {
    require_msp_role(ctx, &[MSP_ROLE_CLIENT, MSP_ROLE_ADMIN], "register patients")?;

    let patient = request.into_patient();
    validate_patient(&patient).into_result()?;

    let provider_id = ctx.caller_id()?;
    let provider = load_provider(&*ctx.store, &provider_id, ctx.max_fragment())?;
    let grant = default_grant(provider, ctx.today, ctx.config.default_consent_months)?;
    let details = PatientDetails::seeded(&patient, grant);

    let id = patient.patient_id.as_str();
    ctx.store.put_json(Partition::SingleOrg, id, &details)?;
    ctx.store.put_json(Partition::Public, id, &patient)?;
    put_index_entry(
        ctx.store,
        &ctx.config.patient_name_index,
        &patient.first_name,
        &patient.last_name,
        id,
    )?;

    info!(patient = id, provider = %provider_id, "patient registered");
    Ok(patient)
}

/// `RegisterProvider`: admin only. No private data is written.
pub fn register_provider(
    ctx: &mut LedgerContext<'_>,
    request: RegisterProviderRequest,
) -> HealthResult<Provider> {
    require_msp_role(ctx, &[MSP_ROLE_ADMIN], "register providers")?;

    let provider = request.into_provider();
    validate_provider(&provider).into_result()?;

    let id = provider.provider_id.as_str();
    ctx.store.put_json(Partition::Public, id, &provider)?;
    put_index_entry(
        ctx.store,
        &ctx.config.provider_name_index,
        &provider.first_name,
        &provider.last_name,
        id,
    )?;

    info!(provider = id, "provider registered");
    Ok(provider)
}

/// `DeleteProvider`: admin only. Removes the master and its index entry.
/// Grants already naming the provider are left as recorded.
pub fn delete_provider(ctx: &mut LedgerContext<'_>, request: IdRequest) -> HealthResult<Provider> {
    require_msp_role(ctx, &[MSP_ROLE_ADMIN], "delete providers")?;

    let provider = load_provider(&*ctx.store, &request.id, ctx.max_fragment())?;
    ctx.store.delete(Partition::Public, &request.id)?;

    let index_key = build_composite_key(
        &ctx.config.provider_name_index,
        &[
            provider.first_name.as_str(),
            provider.last_name.as_str(),
            request.id.as_str(),
        ],
    )?;
    ctx.store.delete(Partition::Public, &index_key)?;

    info!(provider = %request.id, "provider deleted");
    Ok(provider)
}
