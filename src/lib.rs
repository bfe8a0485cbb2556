//! Balance-transfer core of a contractor marketplace.
//!
//! Clients pay contractors for jobs exactly once, and may top up their own balance
//! up to a quarter of what they still owe. Both operations run concurrently and
//! commit atomically against an injected [`domain::ports::LedgerStore`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
