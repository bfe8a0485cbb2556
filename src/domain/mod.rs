//! Domain model of the ledger: profiles with balances, the contracts that bind
//! a client to a contractor, and the priced jobs performed under a contract.

pub mod contract;
pub mod ports;
pub mod profile;

pub type ProfileId = u32;
pub type ContractId = u32;
pub type JobId = u32;

pub use contract::{Contract, ContractStatus, Job};
pub use profile::{Amount, Balance, Profile, ProfileType};
