//! Application layer containing the core business logic orchestration.
//!
//! [`engine::LedgerEngine`] is the entry point. Every balance mutation goes through an
//! [`unit::AtomicUnit`]: profile rows are locked, checks are re-run against the
//! locked state, and the staged writes are committed as one all-or-nothing batch.

pub mod deposit;
pub mod engine;
pub mod identity;
pub mod payment;
pub mod queries;
pub mod transfer;
pub mod unit;
