//! Consent Ledger Records Integrity
//!
//! Canonical definitions of every ledger-facing document: patient and
//! provider masters, consent grants, record categories and the per-patient
//! detail bundle, plus the entry validation run before anything is written.
//! Wire field names match the documents already held by the ledger so
//! existing rich-query selectors keep working.

use std::fmt;

use chrono::NaiveDate;
use mycelix_ledger_shared::error::{HealthError, HealthResult};
use mycelix_ledger_shared::index::{COMPOSITE_KEY_NAMESPACE, MAX_UNICODE_RUNE};
use mycelix_ledger_shared::validation::{ValidationErrorCode, ValidationResult};
use serde::{Deserialize, Serialize};

/// `MM-DD-YYYY` calendar dates, as stored in consent grants.
pub mod calendar_date {
    use super::*;
    use serde::{de, Deserializer, Serializer};

    pub const FORMAT: &str = "%m-%d-%Y";

    pub fn format(date: &NaiveDate) -> String {
        date.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> HealthResult<NaiveDate> {
        NaiveDate::parse_from_str(raw, FORMAT).map_err(|e| {
            HealthError::Validation(format!("Invalid date {:?}, expected MM-DD-YYYY: {}", raw, e))
        })
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT)
            .map_err(|e| de::Error::custom(format!("invalid date {:?}: {}", raw, e)))
    }
}

/// Ledger key of a patient master
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::AsRef,
)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ledger key of a provider master
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::AsRef,
)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Patient master, stored in the public partition under its id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    #[serde(rename = "docType")]
    pub doc_type: String,
    #[serde(rename = "patientId")]
    pub patient_id: PatientId,
    #[serde(rename = "patientssn")]
    pub ssn: String,
    #[serde(rename = "patienturl")]
    pub url: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    /// Free-form, as registered
    pub dob: String,
}

impl Patient {
    pub const DOC_TYPE: &'static str = "Patient";
}

/// Provider master, stored in the public partition under its id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
    #[serde(rename = "docType")]
    pub doc_type: String,
    #[serde(rename = "providerId")]
    pub provider_id: ProviderId,
    /// EHR system identifier
    #[serde(rename = "providerehr")]
    pub ehr: String,
    #[serde(rename = "providerehrurl")]
    pub ehr_url: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    pub speciality: String,
}

impl Provider {
    pub const DOC_TYPE: &'static str = "Provider";
}

/// Time-bounded permission for one provider to view one record category.
///
/// The embedded provider is the registered master at grant time. Both ends
/// of the window are inclusive. Both dates are required on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    #[serde(default)]
    pub provider: Provider,
    #[serde(rename = "starttime", with = "calendar_date")]
    pub start: NaiveDate,
    #[serde(rename = "endtime", with = "calendar_date")]
    pub end: NaiveDate,
}

impl Consent {
    pub fn new(provider: Provider, start: NaiveDate, end: NaiveDate) -> Self {
        Self { provider, start, end }
    }

    pub fn names_provider(&self, provider_id: &str) -> bool {
        self.provider.provider_id.as_str() == provider_id
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether this grant lets `provider_id` see its category on `date`.
    pub fn permits(&self, provider_id: &str, date: NaiveDate) -> bool {
        self.names_provider(provider_id) && self.is_active_on(date)
    }
}

/// The five record categories of a detail bundle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryKind {
    Medications,
    Allergies,
    Immunization,
    PastMedicalHx,
    FamilyHx,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 5] = [
        CategoryKind::Medications,
        CategoryKind::Allergies,
        CategoryKind::Immunization,
        CategoryKind::PastMedicalHx,
        CategoryKind::FamilyHx,
    ];

    /// Tag stored in the category's `docType`
    pub fn doc_type(&self) -> &'static str {
        match self {
            CategoryKind::Medications => "Medications",
            CategoryKind::Allergies => "Allergies",
            CategoryKind::Immunization => "Immunizations",
            CategoryKind::PastMedicalHx => "PastMedicalHx",
            CategoryKind::FamilyHx => "FamilyHx",
        }
    }

    /// Key of the category inside a serialized bundle
    pub fn field_name(&self) -> &'static str {
        match self {
            CategoryKind::Medications => "medications",
            CategoryKind::Allergies => "allergies",
            CategoryKind::Immunization => "immunization",
            CategoryKind::PastMedicalHx => "pastMedicalHx",
            CategoryKind::FamilyHx => "familyHx",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// One category of a patient's records with its grant history.
///
/// `RecordCategory::default()` is the zero value a caller sees when it holds
/// no active grant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordCategory {
    #[serde(rename = "docType")]
    pub doc_type: String,
    pub patient: Patient,
    /// Append-only, oldest first
    #[serde(rename = "providerconsent")]
    pub provider_consent: Vec<Consent>,
}

impl RecordCategory {
    pub fn seeded(kind: CategoryKind, patient: &Patient, grant: Consent) -> Self {
        Self {
            doc_type: kind.doc_type().to_string(),
            patient: patient.clone(),
            provider_consent: vec![grant],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.doc_type.is_empty()
            && self.patient == Patient::default()
            && self.provider_consent.is_empty()
    }

    pub fn append_grant(&mut self, grant: Consent) {
        self.provider_consent.push(grant);
    }
}

/// All five categories for one patient
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientDetails {
    pub medications: RecordCategory,
    pub allergies: RecordCategory,
    pub immunization: RecordCategory,
    #[serde(rename = "pastMedicalHx")]
    pub past_medical_hx: RecordCategory,
    #[serde(rename = "familyHx")]
    pub family_hx: RecordCategory,
}

impl PatientDetails {
    /// Bundle with every category holding the single `grant`.
    pub fn seeded(patient: &Patient, grant: Consent) -> Self {
        let mut details = Self::default();
        for kind in CategoryKind::ALL {
            *details.category_mut(kind) = RecordCategory::seeded(kind, patient, grant.clone());
        }
        details
    }

    pub fn category(&self, kind: CategoryKind) -> &RecordCategory {
        match kind {
            CategoryKind::Medications => &self.medications,
            CategoryKind::Allergies => &self.allergies,
            CategoryKind::Immunization => &self.immunization,
            CategoryKind::PastMedicalHx => &self.past_medical_hx,
            CategoryKind::FamilyHx => &self.family_hx,
        }
    }

    pub fn category_mut(&mut self, kind: CategoryKind) -> &mut RecordCategory {
        match kind {
            CategoryKind::Medications => &mut self.medications,
            CategoryKind::Allergies => &mut self.allergies,
            CategoryKind::Immunization => &mut self.immunization,
            CategoryKind::PastMedicalHx => &mut self.past_medical_hx,
            CategoryKind::FamilyHx => &mut self.family_hx,
        }
    }

    pub fn grant_count(&self, kind: CategoryKind) -> usize {
        self.category(kind).provider_consent.len()
    }
}

// ==================== Validation ====================

fn check_key_segment(result: &mut ValidationResult, field: &str, value: &str) {
    if value.contains(COMPOSITE_KEY_NAMESPACE) || value.contains(MAX_UNICODE_RUNE) {
        result.add_error(
            field,
            "contains a reserved character",
            ValidationErrorCode::InvalidCharacters,
        );
    }
}

fn check_lowercase(result: &mut ValidationResult, field: &str, value: &str) {
    if value.chars().any(char::is_uppercase) {
        result.add_error(field, "must be lower case", ValidationErrorCode::InvalidFormat);
    }
}

pub fn validate_patient(patient: &Patient) -> ValidationResult {
    let mut result = ValidationResult::new();

    if patient.doc_type != Patient::DOC_TYPE {
        result.add_error("docType", "must be Patient", ValidationErrorCode::InvalidFormat);
    }
    result.require_non_empty("patientId", patient.patient_id.as_str());
    result.require_non_empty("patientssn", &patient.ssn);
    result.require_non_empty("patienturl", &patient.url);
    result.require_non_empty("firstname", &patient.first_name);
    result.require_non_empty("lastname", &patient.last_name);
    result.require_non_empty("dob", &patient.dob);

    for (field, value) in [
        ("patientId", patient.patient_id.as_str()),
        ("firstname", patient.first_name.as_str()),
        ("lastname", patient.last_name.as_str()),
    ] {
        check_lowercase(&mut result, field, value);
        check_key_segment(&mut result, field, value);
    }

    result
}

pub fn validate_provider(provider: &Provider) -> ValidationResult {
    let mut result = ValidationResult::new();

    if provider.doc_type != Provider::DOC_TYPE {
        result.add_error("docType", "must be Provider", ValidationErrorCode::InvalidFormat);
    }
    result.require_non_empty("providerId", provider.provider_id.as_str());
    result.require_non_empty("providerehr", &provider.ehr);
    result.require_non_empty("providerehrurl", &provider.ehr_url);
    result.require_non_empty("firstname", &provider.first_name);
    result.require_non_empty("lastname", &provider.last_name);
    result.require_non_empty("speciality", &provider.speciality);

    for (field, value) in [
        ("providerId", provider.provider_id.as_str()),
        ("firstname", provider.first_name.as_str()),
        ("lastname", provider.last_name.as_str()),
    ] {
        check_lowercase(&mut result, field, value);
        check_key_segment(&mut result, field, value);
    }

    result
}

/// Validate a grant submitted for `category`.
pub fn validate_consent(category: CategoryKind, consent: &Consent) -> ValidationResult {
    let mut result = ValidationResult::new();
    let field = format!("{}.providerconsent", category);

    if consent.provider.provider_id.as_str().is_empty() {
        result.add_error(&field, "provider id is required", ValidationErrorCode::Required);
    }
    if consent.end < consent.start {
        result.add_error(
            &field,
            "endtime must not precede starttime",
            ValidationErrorCode::OutOfRange,
        );
    }

    result
}
