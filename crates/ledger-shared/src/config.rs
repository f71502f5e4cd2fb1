//! Ledger configuration.

use serde::{Deserialize, Serialize};

use crate::error::{HealthError, HealthResult};
use crate::validation::{ValidationErrorCode, ValidationResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Composite index over patient (first name, last name, id)
    pub patient_name_index: String,
    /// Composite index over provider (first name, last name, id)
    pub provider_name_index: String,
    /// Length of the grant seeded at patient registration
    pub default_consent_months: u32,
    pub max_page_size: usize,
    /// Characters of an offending payload echoed back in codec errors
    pub max_error_fragment: usize,
}

impl LedgerConfig {
    pub const DEFAULT_PAGE_SIZE_LIMIT: usize = 100;

    pub fn from_json(json: &str) -> HealthResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            HealthError::codec(format!("Invalid ledger config: {}", e), json.as_bytes(), 256)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HealthResult<()> {
        let mut result = ValidationResult::new();
        result.require_non_empty("patient_name_index", &self.patient_name_index);
        result.require_non_empty("provider_name_index", &self.provider_name_index);
        if self.patient_name_index == self.provider_name_index {
            result.add_error(
                "provider_name_index",
                "must differ from patient_name_index",
                ValidationErrorCode::InvalidFormat,
            );
        }
        if self.default_consent_months == 0 {
            result.add_error(
                "default_consent_months",
                "must be greater than 0",
                ValidationErrorCode::OutOfRange,
            );
        }
        if self.max_page_size == 0 {
            result.add_error(
                "max_page_size",
                "must be greater than 0",
                ValidationErrorCode::OutOfRange,
            );
        }
        result.into_result()
    }

    /// Check a caller-requested page size against the configured bounds.
    pub fn check_page_size(&self, page_size: usize) -> HealthResult<()> {
        if page_size == 0 {
            return Err(HealthError::Validation("Page size must be greater than 0".to_string()));
        }
        if page_size > self.max_page_size {
            return Err(HealthError::Validation(format!(
                "Page size cannot exceed {}",
                self.max_page_size
            )));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            patient_name_index: "patient~fname~lname".to_string(),
            provider_name_index: "provider~fname~lname".to_string(),
            default_consent_months: 12,
            max_page_size: Self::DEFAULT_PAGE_SIZE_LIMIT,
            max_error_fragment: 256,
        }
    }
}
