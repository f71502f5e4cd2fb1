//! Mycelix Consent Ledger Shared Utilities
//!
//! Common functionality for the records crates:
//! - Partitioned store adapter and an in-process store
//! - Composite keys for secondary indexes
//! - Caller identity attributes
//! - Error types and argument validation
//! - Query result rendering
//! - Ledger configuration

pub mod config;
pub mod error;
pub mod identity;
pub mod index;
pub mod memory;
pub mod query;
pub mod store;
pub mod validation;

// Re-export commonly used items
pub use config::LedgerConfig;
pub use error::{ErrorKind, HealthError, HealthResult};
pub use identity::{CallerAttributes, Identity};
pub use memory::MemoryStore;
pub use store::{Partition, Selector, Store, StoreExt};
pub use validation::{ValidationErrorCode, ValidationResult};
