//! Caller identity attributes.
//!
//! The attribute provider is external; operations only ask it for named
//! claims bound to the current request.

use std::collections::BTreeMap;

use crate::error::{HealthError, HealthResult};

/// Attribute carrying the caller's ledger identifier
pub const ATTR_ID: &str = "id";
/// Attribute carrying the caller's application role (`Patient...`, `Provider...`)
pub const ATTR_ROLE: &str = "role";
/// Attribute carrying the caller's membership role (`client`, `admin`, ...)
pub const ATTR_MSP_ROLE: &str = "mspRole";

pub const MSP_ROLE_ADMIN: &str = "admin";
pub const MSP_ROLE_CLIENT: &str = "client";

/// Source of caller attributes for the current request
pub trait Identity {
    /// Fails with `Unauthorized` if the attribute is absent or the identity
    /// context is invalid.
    fn attribute(&self, name: &str) -> HealthResult<String>;
}

/// Map-backed identity used by hosts that resolve claims up front.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerAttributes {
    attributes: BTreeMap<String, String>,
}

impl CallerAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Administrator identity: `mspRole = admin`.
    pub fn admin(id: &str) -> Self {
        Self::new().with(ATTR_ID, id).with(ATTR_MSP_ROLE, MSP_ROLE_ADMIN)
    }

    /// Provider identity: `role = Provider`, `mspRole = client`.
    pub fn provider(id: &str) -> Self {
        Self::new()
            .with(ATTR_ID, id)
            .with(ATTR_ROLE, "Provider")
            .with(ATTR_MSP_ROLE, MSP_ROLE_CLIENT)
    }

    /// Patient identity: `role = Patient`, `mspRole = client`.
    pub fn patient(id: &str) -> Self {
        Self::new()
            .with(ATTR_ID, id)
            .with(ATTR_ROLE, "Patient")
            .with(ATTR_MSP_ROLE, MSP_ROLE_CLIENT)
    }
}

impl Identity for CallerAttributes {
    fn attribute(&self, name: &str) -> HealthResult<String> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| HealthError::Unauthorized(format!("{} attribute is missing", name)))
    }
}

impl<I: Identity + ?Sized> Identity for &I {
    fn attribute(&self, name: &str) -> HealthResult<String> {
        (**self).attribute(name)
    }
}
