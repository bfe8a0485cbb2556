use super::profile::checked_sum;
use super::{Amount, Contract, ContractId, Job, JobId, Profile, ProfileId};
use crate::error::{LedgerError, Result};
use crate::infrastructure::locks::RowLocks;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

/// Persistence port for the ledger.
///
/// Reads always observe committed state. The only mutation path after seeding is
/// [`LedgerStore::apply`], which must commit a [`WriteSet`] all-or-nothing.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_profile(&self, profile: Profile) -> Result<()>;
    async fn insert_contract(&self, contract: Contract) -> Result<()>;
    async fn insert_job(&self, job: Job) -> Result<()>;

    async fn profile(&self, id: ProfileId) -> Result<Option<Profile>>;
    async fn profiles(&self) -> Result<Vec<Profile>>;
    async fn contract(&self, id: ContractId) -> Result<Option<Contract>>;
    async fn contracts(&self) -> Result<Vec<Contract>>;
    async fn job(&self, id: JobId) -> Result<Option<Job>>;
    async fn jobs(&self) -> Result<Vec<Job>>;

    /// Sum of the prices of every unpaid job whose contract names `client_id` as client.
    async fn unpaid_total(&self, client_id: ProfileId) -> Result<Decimal> {
        let contracts: BTreeSet<ContractId> = self
            .contracts()
            .await?
            .into_iter()
            .filter(|c| c.client_id == client_id)
            .map(|c| c.id)
            .collect();
        checked_sum(
            self.jobs()
                .await?
                .iter()
                .filter(|job| !job.is_paid() && contracts.contains(&job.contract_id))
                .map(|job| job.price.value()),
        )
    }

    /// Commits a write set atomically: either every change lands or none does.
    async fn apply(&self, writes: WriteSet) -> Result<()>;

    /// Per-profile exclusivity shared by every unit running against this store.
    fn row_locks(&self) -> &RowLocks;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceChange {
    Debit(ProfileId, Amount),
    Credit(ProfileId, Amount),
}

impl BalanceChange {
    pub fn profile_id(&self) -> ProfileId {
        match self {
            BalanceChange::Debit(id, _) | BalanceChange::Credit(id, _) => *id,
        }
    }
}

/// Changes staged by an atomic unit, waiting to be committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    pub balance_changes: Vec<BalanceChange>,
    pub paid_jobs: Vec<(JobId, DateTime<Utc>)>,
}

impl WriteSet {
    pub fn is_empty(&self) -> bool {
        self.balance_changes.is_empty() && self.paid_jobs.is_empty()
    }

    pub fn profile_ids(&self) -> BTreeSet<ProfileId> {
        self.balance_changes
            .iter()
            .map(BalanceChange::profile_id)
            .collect()
    }

    pub fn job_ids(&self) -> BTreeSet<JobId> {
        self.paid_jobs.iter().map(|(id, _)| *id).collect()
    }

    /// Net effect of the staged changes on one profile's balance.
    pub fn net_change(&self, profile_id: ProfileId) -> Result<Decimal> {
        checked_sum(self.balance_changes.iter().map(|change| match change {
            BalanceChange::Debit(id, amount) if *id == profile_id => -amount.value(),
            BalanceChange::Credit(id, amount) if *id == profile_id => amount.value(),
            _ => Decimal::ZERO,
        }))
    }

    /// Replays the write set against copies of the committed rows it touches.
    ///
    /// `profiles` and `jobs` hold the current committed state for
    /// [`profile_ids`](Self::profile_ids) and [`job_ids`](Self::job_ids). On success the
    /// updated rows are returned for the backend to persist; on failure nothing
    /// should be written.
    pub fn resolve(
        &self,
        mut profiles: HashMap<ProfileId, Profile>,
        mut jobs: HashMap<JobId, Job>,
    ) -> Result<(Vec<Profile>, Vec<Job>)> {
        for (job_id, at) in &self.paid_jobs {
            let job = jobs
                .get_mut(job_id)
                .ok_or(LedgerError::JobNotFound(*job_id))?;
            if job.is_paid() {
                return Err(LedgerError::AlreadyPaid(*job_id));
            }
            job.mark_paid(*at);
        }

        for change in &self.balance_changes {
            let id = change.profile_id();
            let profile = profiles
                .get_mut(&id)
                .ok_or(LedgerError::UnknownAccount(id))?;
            match change {
                BalanceChange::Debit(_, amount) => profile.debit(*amount)?,
                BalanceChange::Credit(_, amount) => profile.credit(*amount)?,
            }
        }

        Ok((profiles.into_values().collect(), jobs.into_values().collect()))
    }
}
