//! Mycelix Consent Ledger Test Suite
//!
//! Tests that drive the ledger through its named operations against the
//! in-memory store:
//! - End-to-end consent scenarios (registration, grants, filtered reads)
//! - Query and pagination rendering
//! - Property-based tests for grant accumulation and projection

pub mod harness;
pub mod property_tests;
pub mod scenarios;
