//! Consent grant submission.
//!
//! A patient submits one new grant for each of the five categories. Grants
//! are only ever appended to the dual-org copy of the bundle; nothing already
//! recorded is modified.

use mycelix_ledger_shared::error::{HealthError, HealthResult};
use mycelix_ledger_shared::store::{Partition, StoreExt};
use mycelix_ledger_shared::validation::{ValidationErrorCode, ValidationResult};
use records_integrity::{validate_consent, CategoryKind, Consent, PatientDetails};
use tracing::{info, warn};

use crate::registration::load_provider;
use crate::requests::UpdateProviderAccessRequest;
use crate::LedgerContext;

/// One new grant per category, checked but not yet resolved against the
/// provider registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantSubmission {
    grants: Vec<(CategoryKind, Consent)>,
}

impl GrantSubmission {
    /// Parse and check a submitted update document.
    pub fn parse(payload: &str, max_fragment: usize) -> HealthResult<Self> {
        let submitted: PatientDetails = serde_json::from_str(payload).map_err(|e| {
            warn!(error = %e, "rejected consent update payload");
            HealthError::codec(
                format!("Error in unmarshal input json: {}", e),
                payload.as_bytes(),
                max_fragment,
            )
        })?;

        let mut result = ValidationResult::new();
        let mut grants = Vec::with_capacity(CategoryKind::ALL.len());
        for kind in CategoryKind::ALL {
            let field = format!("{}.providerconsent", kind);
            match submitted.category(kind).provider_consent.as_slice() {
                [grant] => {
                    let mut grant = grant.clone();
                    grant.provider.provider_id =
                        grant.provider.provider_id.as_str().to_lowercase().into();
                    result.merge(validate_consent(kind, &grant));
                    grants.push((kind, grant));
                }
                [] => {
                    result.add_error(&field, "a grant is required", ValidationErrorCode::Required)
                }
                _ => result.add_error(
                    &field,
                    "exactly one grant per category is accepted",
                    ValidationErrorCode::OutOfRange,
                ),
            }
        }
        result.into_result()?;

        Ok(Self { grants })
    }

    pub fn grants(&self) -> &[(CategoryKind, Consent)] {
        &self.grants
    }
}

/// Current grant-carrying bundle for `patient_id`: the dual-org copy, or the
/// single-org copy when no grant has been published yet.
fn load_for_update(ctx: &LedgerContext<'_>, patient_id: &str) -> HealthResult<PatientDetails> {
    let max_fragment = ctx.max_fragment();
    if let Some(details) = ctx.store.get_json(Partition::DualOrg, patient_id, max_fragment)? {
        return Ok(details);
    }
    ctx.store
        .get_json(Partition::SingleOrg, patient_id, max_fragment)?
        .ok_or_else(|| HealthError::not_found(Partition::DualOrg, patient_id))
}

/// `UpdateProviderAccess`: append the submitted grants to the caller's
/// bundle and republish it to the dual-org partition.
pub fn update_provider_access(
    ctx: &mut LedgerContext<'_>,
    request: UpdateProviderAccessRequest,
) -> HealthResult<PatientDetails> {
    let submission = GrantSubmission::parse(&request.payload, ctx.max_fragment())?;
    let patient_id = ctx.caller_id()?;

    // Grants carry the registered provider record, not the submitted copy.
    let mut resolved = Vec::with_capacity(submission.grants().len());
    for (kind, grant) in submission.grants() {
        let provider = load_provider(
            &*ctx.store,
            grant.provider.provider_id.as_str(),
            ctx.max_fragment(),
        )?;
        resolved.push((*kind, Consent::new(provider, grant.start, grant.end)));
    }

    let mut details = load_for_update(ctx, &patient_id)?;
    for (kind, grant) in resolved {
        details.category_mut(kind).append_grant(grant);
    }
    ctx.store.put_json(Partition::DualOrg, &patient_id, &details)?;

    info!(
        patient = %patient_id,
        grants = details.grant_count(CategoryKind::Medications),
        "consent grants appended"
    );
    Ok(details)
}
