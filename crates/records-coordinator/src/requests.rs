//! Typed requests built from positional string arguments.
//!
//! Every exposed operation receives `&[String]`; the request types below
//! check the argument count, reject empty required fields by name and apply
//! the lower-case normalization ledger keys rely on.

use mycelix_ledger_shared::error::{HealthError, HealthResult};
use mycelix_ledger_shared::validation::{expect_arg_count, ValidationResult};
use records_integrity::{Patient, PatientId, Provider, ProviderId};

/// Collect the named arguments, failing on the first count mismatch and
/// reporting every empty one together.
fn named_args<'a, const N: usize>(
    args: &'a [String],
    names: [&str; N],
) -> HealthResult<[&'a str; N]> {
    expect_arg_count(args, N)?;
    let mut result = ValidationResult::new();
    for (name, value) in names.iter().zip(args) {
        result.require_non_empty(name, value);
    }
    result.into_result()?;

    let mut out = [""; N];
    for (slot, value) in out.iter_mut().zip(args) {
        *slot = value.as_str();
    }
    Ok(out)
}

fn lower(value: &str) -> String {
    value.to_lowercase()
}

fn parse_page_size(raw: &str) -> HealthResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(HealthError::Validation(format!(
            "pageSize must be a positive integer, got {:?}",
            raw
        ))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterPatientRequest {
    pub patient_id: String,
    pub ssn: String,
    pub url: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
}

impl RegisterPatientRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [id, ssn, url, first, last, dob] = named_args(
            args,
            ["patientId", "patientssn", "patienturl", "firstname", "lastname", "dob"],
        )?;
        Ok(Self {
            patient_id: lower(id),
            ssn: lower(ssn),
            url: lower(url),
            first_name: lower(first),
            last_name: lower(last),
            dob: lower(dob),
        })
    }

    pub fn into_patient(self) -> Patient {
        Patient {
            doc_type: Patient::DOC_TYPE.to_string(),
            patient_id: PatientId::new(self.patient_id),
            ssn: self.ssn,
            url: self.url,
            first_name: self.first_name,
            last_name: self.last_name,
            dob: self.dob,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterProviderRequest {
    pub provider_id: String,
    pub ehr: String,
    pub ehr_url: String,
    pub first_name: String,
    pub last_name: String,
    pub speciality: String,
}

impl RegisterProviderRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [id, ehr, ehr_url, first, last, speciality] = named_args(
            args,
            ["providerId", "providerehr", "providerehrurl", "firstname", "lastname", "speciality"],
        )?;
        Ok(Self {
            provider_id: lower(id),
            ehr: lower(ehr),
            ehr_url: lower(ehr_url),
            first_name: lower(first),
            last_name: lower(last),
            speciality: lower(speciality),
        })
    }

    pub fn into_provider(self) -> Provider {
        Provider {
            doc_type: Provider::DOC_TYPE.to_string(),
            provider_id: ProviderId::new(self.provider_id),
            ehr: self.ehr,
            ehr_url: self.ehr_url,
            first_name: self.first_name,
            last_name: self.last_name,
            speciality: self.speciality,
        }
    }
}

/// Raw consent-update document submitted by a patient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateProviderAccessRequest {
    pub payload: String,
}

impl UpdateProviderAccessRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [payload] = named_args(args, ["payload"])?;
        Ok(Self {
            payload: payload.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientBySsnRequest {
    pub ssn: String,
}

impl PatientBySsnRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [ssn] = named_args(args, ["patientssn"])?;
        Ok(Self { ssn: lower(ssn) })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientInformationRequest {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
}

impl PatientInformationRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [first, last, dob] = named_args(args, ["firstname", "lastname", "dob"])?;
        Ok(Self {
            first_name: lower(first),
            last_name: lower(last),
            dob: lower(dob),
        })
    }
}

/// A single lower-cased key argument
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdRequest {
    pub id: String,
}

impl IdRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [id] = named_args(args, ["id"])?;
        Ok(Self { id: lower(id) })
    }
}

/// Name-index lookup: first name, optionally narrowed by last name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameLookupRequest {
    pub first_name: String,
    pub last_name: Option<String>,
}

impl NameLookupRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        match args.len() {
            1 => {
                let [first] = named_args(args, ["firstname"])?;
                Ok(Self {
                    first_name: lower(first),
                    last_name: None,
                })
            }
            _ => {
                let [first, last] = named_args(args, ["firstname", "lastname"])?;
                Ok(Self {
                    first_name: lower(first),
                    last_name: Some(lower(last)),
                })
            }
        }
    }

    pub fn prefix(&self) -> Vec<&str> {
        let mut prefix = vec![self.first_name.as_str()];
        if let Some(last) = &self.last_name {
            prefix.push(last);
        }
        prefix
    }
}

/// Range bounds are taken verbatim; empty means unbounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeRequest {
    pub start_key: String,
    pub end_key: String,
}

impl RangeRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        expect_arg_count(args, 2)?;
        Ok(Self {
            start_key: args[0].clone(),
            end_key: args[1].clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagedRangeRequest {
    pub start_key: String,
    pub end_key: String,
    pub page_size: usize,
    pub bookmark: String,
}

impl PagedRangeRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        expect_arg_count(args, 4)?;
        Ok(Self {
            start_key: args[0].clone(),
            end_key: args[1].clone(),
            page_size: parse_page_size(&args[2])?,
            bookmark: args[3].clone(),
        })
    }
}

/// Ad hoc `{"selector":{...}}` query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
}

impl QueryRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [query] = named_args(args, ["query"])?;
        Ok(Self {
            query: query.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagedQueryRequest {
    pub query: String,
    pub page_size: usize,
    pub bookmark: String,
}

impl PagedQueryRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        expect_arg_count(args, 3)?;
        let mut result = ValidationResult::new();
        result.require_non_empty("query", &args[0]);
        result.into_result()?;
        Ok(Self {
            query: args[0].clone(),
            page_size: parse_page_size(&args[1])?,
            bookmark: args[2].clone(),
        })
    }
}

/// History lookups take the key verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRequest {
    pub key: String,
}

impl HistoryRequest {
    pub fn from_args(args: &[String]) -> HealthResult<Self> {
        let [key] = named_args(args, ["key"])?;
        Ok(Self {
            key: key.to_string(),
        })
    }
}
