use crate::domain::ports::{LedgerStore, WriteSet};
use crate::domain::profile::checked_sum;
use crate::domain::{Contract, ContractId, Job, JobId, Profile, ProfileId};
use crate::error::{LedgerError, Result};
use crate::infrastructure::locks::RowLocks;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    profiles: HashMap<ProfileId, Profile>,
    contracts: HashMap<ContractId, Contract>,
    jobs: HashMap<JobId, Job>,
}

/// A thread-safe in-memory ledger.
///
/// All three tables live behind one `Arc<RwLock<..>>`, so a commit is a single
/// write-guarded section and readers never see half of a write set.
/// Ideal for testing or small datasets where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    tables: Arc<RwLock<Tables>>,
    locks: RowLocks,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted<T: Clone>(rows: &HashMap<u32, T>) -> Vec<T> {
    let mut ids: Vec<_> = rows.keys().copied().collect();
    ids.sort_unstable();
    ids.iter().filter_map(|id| rows.get(id).cloned()).collect()
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn insert_profile(&self, profile: Profile) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn insert_contract(&self, contract: Contract) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.contracts.insert(contract.id, contract);
        Ok(())
    }

    async fn insert_job(&self, job: Job) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.jobs.insert(job.id, job);
        Ok(())
    }

    async fn profile(&self, id: ProfileId) -> Result<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&id).cloned())
    }

    async fn profiles(&self) -> Result<Vec<Profile>> {
        let tables = self.tables.read().await;
        Ok(sorted(&tables.profiles))
    }

    async fn contract(&self, id: ContractId) -> Result<Option<Contract>> {
        let tables = self.tables.read().await;
        Ok(tables.contracts.get(&id).cloned())
    }

    async fn contracts(&self) -> Result<Vec<Contract>> {
        let tables = self.tables.read().await;
        Ok(sorted(&tables.contracts))
    }

    async fn job(&self, id: JobId) -> Result<Option<Job>> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.get(&id).cloned())
    }

    async fn jobs(&self) -> Result<Vec<Job>> {
        let tables = self.tables.read().await;
        Ok(sorted(&tables.jobs))
    }

    async fn unpaid_total(&self, client_id: ProfileId) -> Result<Decimal> {
        let tables = self.tables.read().await;
        checked_sum(
            tables
                .jobs
                .values()
                .filter(|job| !job.is_paid())
                .filter(|job| {
                    tables
                        .contracts
                        .get(&job.contract_id)
                        .is_some_and(|c| c.client_id == client_id)
                })
                .map(|job| job.price.value()),
        )
    }

    async fn apply(&self, writes: WriteSet) -> Result<()> {
        let mut tables = self.tables.write().await;

        let profiles = writes
            .profile_ids()
            .into_iter()
            .map(|id| {
                tables
                    .profiles
                    .get(&id)
                    .cloned()
                    .map(|p| (id, p))
                    .ok_or(LedgerError::UnknownAccount(id))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        let jobs = writes
            .job_ids()
            .into_iter()
            .map(|id| {
                tables
                    .jobs
                    .get(&id)
                    .cloned()
                    .map(|j| (id, j))
                    .ok_or(LedgerError::JobNotFound(id))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let (profiles, jobs) = writes.resolve(profiles, jobs)?;

        for profile in profiles {
            tables.profiles.insert(profile.id, profile);
        }
        for job in jobs {
            tables.jobs.insert(job.id, job);
        }
        Ok(())
    }

    fn row_locks(&self) -> &RowLocks {
        &self.locks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::BalanceChange;
    use crate::domain::{Amount, Balance, ContractStatus, ProfileType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn seeded() -> InMemoryLedger {
        let store = InMemoryLedger::new();
        store
            .insert_profile(Profile::new(1, ProfileType::Client, Balance::new(dec!(100))))
            .await
            .unwrap();
        store
            .insert_profile(Profile::new(5, ProfileType::Contractor, Balance::ZERO))
            .await
            .unwrap();
        store
            .insert_contract(Contract {
                id: 1,
                terms: String::new(),
                status: ContractStatus::InProgress,
                client_id: 1,
                contractor_id: 5,
            })
            .await
            .unwrap();
        store
            .insert_job(Job::new(1, 1, Amount::new(dec!(100)).unwrap()))
            .await
            .unwrap();
        store
            .insert_job(Job::new(2, 1, Amount::new(dec!(50)).unwrap()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_in_memory_profile_lookup() {
        let store = seeded().await;
        let retrieved = store.profile(1).await.unwrap().unwrap();
        assert_eq!(retrieved.balance, Balance::new(dec!(100)));
        assert!(store.profile(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_listings_are_sorted() {
        let store = seeded().await;
        let ids: Vec<_> = store.profiles().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 5]);
        let ids: Vec<_> = store.jobs().await.unwrap().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_in_memory_unpaid_total() {
        let store = seeded().await;
        assert_eq!(store.unpaid_total(1).await.unwrap(), dec!(150));
        assert_eq!(store.unpaid_total(5).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_in_memory_apply_is_all_or_nothing() {
        let store = seeded().await;
        let writes = WriteSet {
            balance_changes: vec![
                BalanceChange::Credit(5, Amount::new(dec!(500)).unwrap()),
                BalanceChange::Debit(1, Amount::new(dec!(500)).unwrap()),
            ],
            paid_jobs: vec![(1, Utc::now())],
        };

        let result = store.apply(writes).await;
        assert!(matches!(result, Err(LedgerError::InsufficientFunds)));

        assert_eq!(store.profile(1).await.unwrap().unwrap().balance, Balance::new(dec!(100)));
        assert_eq!(store.profile(5).await.unwrap().unwrap().balance, Balance::ZERO);
        assert!(!store.job(1).await.unwrap().unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_in_memory_apply_commits() {
        let store = seeded().await;
        let writes = WriteSet {
            balance_changes: vec![
                BalanceChange::Debit(1, Amount::new(dec!(100)).unwrap()),
                BalanceChange::Credit(5, Amount::new(dec!(100)).unwrap()),
            ],
            paid_jobs: vec![(1, Utc::now())],
        };

        store.apply(writes).await.unwrap();

        assert_eq!(store.profile(1).await.unwrap().unwrap().balance, Balance::ZERO);
        assert_eq!(store.profile(5).await.unwrap().unwrap().balance, Balance::new(dec!(100)));
        assert!(store.job(1).await.unwrap().unwrap().is_paid());
        assert_eq!(store.unpaid_total(1).await.unwrap(), dec!(50));
    }
}
