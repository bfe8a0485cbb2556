use crate::domain::ports::{LedgerStore, WriteSet};
use crate::domain::{Contract, ContractId, Job, JobId, Profile, ProfileId};
use crate::error::{LedgerError, Result};
use crate::infrastructure::locks::RowLocks;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing profiles and their balances.
pub const CF_PROFILES: &str = "profiles";
/// Column Family for storing contracts.
pub const CF_CONTRACTS: &str = "contracts";
/// Column Family for storing jobs.
pub const CF_JOBS: &str = "jobs";

/// A persistent ledger implementation using RocksDB.
///
/// Profiles, contracts and jobs live in separate Column Families keyed by their
/// big-endian id. A commit is written as one `WriteBatch`, which RocksDB applies
/// atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBLedger {
    db: Arc<DB>,
    commit: Arc<Mutex<()>>,
    locks: RowLocks,
}

impl RocksDBLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_PROFILES, CF_CONTRACTS, CF_JOBS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit: Arc::new(Mutex::new(())),
            locks: RowLocks::new(),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::internal(format!("{} column family not found", name)))
    }

    fn put<T: Serialize>(&self, name: &str, id: u32, row: &T) -> Result<()> {
        let cf = self.cf(name)?;
        self.db.put_cf(cf, id.to_be_bytes(), encode(row)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, name: &str, id: u32) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let cf = self.cf(name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(decode(&value)?);
        }
        Ok(rows)
    }
}

fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(row)
        .map_err(|e| LedgerError::internal(format!("Serialization error: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::internal(format!("Deserialization error: {}", e)))
}

#[async_trait]
impl LedgerStore for RocksDBLedger {
    async fn insert_profile(&self, profile: Profile) -> Result<()> {
        self.put(CF_PROFILES, profile.id, &profile)
    }

    async fn insert_contract(&self, contract: Contract) -> Result<()> {
        self.put(CF_CONTRACTS, contract.id, &contract)
    }

    async fn insert_job(&self, job: Job) -> Result<()> {
        self.put(CF_JOBS, job.id, &job)
    }

    async fn profile(&self, id: ProfileId) -> Result<Option<Profile>> {
        self.get(CF_PROFILES, id)
    }

    async fn profiles(&self) -> Result<Vec<Profile>> {
        self.scan(CF_PROFILES)
    }

    async fn contract(&self, id: ContractId) -> Result<Option<Contract>> {
        self.get(CF_CONTRACTS, id)
    }

    async fn contracts(&self) -> Result<Vec<Contract>> {
        self.scan(CF_CONTRACTS)
    }

    async fn job(&self, id: JobId) -> Result<Option<Job>> {
        self.get(CF_JOBS, id)
    }

    async fn jobs(&self) -> Result<Vec<Job>> {
        self.scan(CF_JOBS)
    }

    async fn apply(&self, writes: WriteSet) -> Result<()> {
        let _commit = self.commit.lock().await;

        let mut profiles = HashMap::new();
        for id in writes.profile_ids() {
            let profile = self
                .get::<Profile>(CF_PROFILES, id)?
                .ok_or(LedgerError::UnknownAccount(id))?;
            profiles.insert(id, profile);
        }
        let mut jobs = HashMap::new();
        for id in writes.job_ids() {
            let job = self
                .get::<Job>(CF_JOBS, id)?
                .ok_or(LedgerError::JobNotFound(id))?;
            jobs.insert(id, job);
        }

        let (profiles, jobs) = writes.resolve(profiles, jobs)?;

        let mut batch = WriteBatch::default();
        let cf_profiles = self.cf(CF_PROFILES)?;
        for profile in &profiles {
            batch.put_cf(cf_profiles, profile.id.to_be_bytes(), encode(profile)?);
        }
        let cf_jobs = self.cf(CF_JOBS)?;
        for job in &jobs {
            batch.put_cf(cf_jobs, job.id.to_be_bytes(), encode(job)?);
        }
        self.db.write(batch)?;

        Ok(())
    }

    fn row_locks(&self) -> &RowLocks {
        &self.locks
    }
}
