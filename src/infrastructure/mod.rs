//! Storage adapters implementing [`LedgerStore`](crate::domain::ports::LedgerStore).

pub mod in_memory;
pub mod locks;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
