use crate::domain::ports::{BalanceChange, LedgerStore, WriteSet};
use crate::domain::profile::out_of_range;
use crate::domain::{Amount, Balance, Job, JobId, Profile, ProfileId};
use crate::error::{LedgerError, Result};
use crate::infrastructure::locks::RowGuard;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::debug;

/// A unit of work against the ledger.
///
/// Profile rows are locked with [`lock_profiles`](Self::lock_profiles) and held until
/// the unit ends. Mutations are staged and only reach the store on
/// [`commit`](Self::commit). Reads made through the unit see committed state plus the
/// unit's own staged writes.
///
/// Dropping a unit without committing (including when the enclosing future is
/// cancelled) discards every staged write and releases the rows.
pub struct AtomicUnit<'a> {
    store: &'a dyn LedgerStore,
    lock_timeout: Duration,
    guards: BTreeMap<ProfileId, RowGuard>,
    writes: WriteSet,
}

impl<'a> AtomicUnit<'a> {
    pub fn begin(store: &'a dyn LedgerStore, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
            guards: BTreeMap::new(),
            writes: WriteSet::default(),
        }
    }

    /// Takes exclusive access to the given profiles and reads them.
    ///
    /// Rows are acquired in ascending id order. A unit may call this more than
    /// once, but rows it does not hold yet must sort after every row it holds.
    /// Returns the profiles in the order requested.
    pub async fn lock_profiles(&mut self, ids: &[ProfileId]) -> Result<Vec<Profile>> {
        let wanted: BTreeSet<ProfileId> = ids
            .iter()
            .copied()
            .filter(|id| !self.guards.contains_key(id))
            .collect();

        if let (Some(first), Some(last_held)) = (wanted.first(), self.guards.keys().next_back())
            && first < last_held
        {
            return Err(LedgerError::internal(format!(
                "profile {} requested out of order",
                first
            )));
        }

        for id in wanted {
            // Profiles are never removed, so only rows that exist get a lock slot.
            if self.store.profile(id).await?.is_none() {
                return Err(LedgerError::UnknownAccount(id));
            }
            let guard = tokio::time::timeout(self.lock_timeout, self.store.row_locks().acquire(id))
                .await
                .map_err(|_| LedgerError::LockTimeout(id))?;
            self.guards.insert(id, guard);
        }

        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            profiles.push(self.profile(*id).await?);
        }
        Ok(profiles)
    }

    pub async fn lock_profile(&mut self, id: ProfileId) -> Result<Profile> {
        let mut profiles = self.lock_profiles(&[id]).await?;
        profiles
            .pop()
            .ok_or_else(|| LedgerError::internal("locked profile missing"))
    }

    /// Current view of a profile: committed balance plus this unit's staged changes.
    pub async fn profile(&self, id: ProfileId) -> Result<Profile> {
        let mut profile = self
            .store
            .profile(id)
            .await?
            .ok_or(LedgerError::UnknownAccount(id))?;
        profile.balance = profile
            .balance
            .checked_add(Balance::new(self.writes.net_change(id)?))?;
        Ok(profile)
    }

    pub async fn job(&self, id: JobId) -> Result<Option<Job>> {
        let job = self.store.job(id).await?;
        Ok(job.map(|mut job| {
            if let Some((_, at)) = self.writes.paid_jobs.iter().find(|(j, _)| *j == id) {
                job.mark_paid(*at);
            }
            job
        }))
    }

    /// Sum of the client's unpaid job prices, excluding jobs this unit has marked paid.
    pub async fn unpaid_total(&self, client_id: ProfileId) -> Result<Decimal> {
        let mut total = self.store.unpaid_total(client_id).await?;
        for job_id in self.writes.job_ids() {
            let Some(job) = self.store.job(job_id).await? else {
                continue;
            };
            if job.is_paid() {
                continue;
            }
            let owned = self
                .store
                .contract(job.contract_id)
                .await?
                .is_some_and(|c| c.client_id == client_id);
            if owned {
                total = total
                    .checked_sub(job.price.value())
                    .ok_or_else(out_of_range)?;
            }
        }
        Ok(total)
    }

    fn ensure_locked(&self, id: ProfileId) -> Result<()> {
        if self.guards.contains_key(&id) {
            Ok(())
        } else {
            Err(LedgerError::internal(format!(
                "profile {} mutated without exclusive access",
                id
            )))
        }
    }

    /// Stages a debit, checked against the locked balance. Returns the new balance.
    pub async fn debit(&mut self, id: ProfileId, amount: Amount) -> Result<Balance> {
        self.ensure_locked(id)?;
        let profile = self.profile(id).await?;
        if !profile.balance.covers(amount) {
            return Err(LedgerError::InsufficientFunds);
        }
        let balance = profile.balance.checked_sub(amount.into())?;
        self.writes
            .balance_changes
            .push(BalanceChange::Debit(id, amount));
        Ok(balance)
    }

    /// Stages a credit. Returns the new balance.
    pub async fn credit(&mut self, id: ProfileId, amount: Amount) -> Result<Balance> {
        self.ensure_locked(id)?;
        let profile = self.profile(id).await?;
        let balance = profile.balance.checked_add(amount.into())?;
        self.writes
            .balance_changes
            .push(BalanceChange::Credit(id, amount));
        Ok(balance)
    }

    pub fn mark_paid(&mut self, job_id: JobId, at: DateTime<Utc>) {
        self.writes.paid_jobs.push((job_id, at));
    }

    /// Commits every staged write as one batch, then releases the rows.
    pub async fn commit(self) -> Result<()> {
        let AtomicUnit {
            store,
            guards,
            writes,
            ..
        } = self;
        let result = if writes.is_empty() {
            Ok(())
        } else {
            store.apply(writes).await
        };
        drop(guards);
        result
    }

    /// Discards staged writes and releases the rows.
    pub fn rollback(self) {
        debug!(
            rows = self.guards.len(),
            staged = self.writes.balance_changes.len() + self.writes.paid_jobs.len(),
            "rolling back unit"
        );
    }
}
