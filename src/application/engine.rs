use crate::application::deposit::{self, DepositOrchestrator, DepositReceipt};
use crate::application::identity;
use crate::application::payment::{PaymentOrchestrator, PaymentReceipt};
use crate::application::queries::{self, ClientPayments, ProfessionEarnings};
use crate::application::transfer::{self, Transfer};
use crate::config::LedgerConfig;
use crate::domain::ports::{LedgerStore, LedgerStoreBox};
use crate::domain::{Amount, Contract, ContractId, Job, JobId, Profile, ProfileId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The main entry point of the ledger core.
///
/// `LedgerEngine` owns the injected storage backend and hands it to the
/// orchestrators. It is cheap to clone, and clones share the same store and row
/// locks, so any number of operations may run concurrently from separate tasks.
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - The ledger storage backend.
    /// * `config` - Runtime settings such as the lock timeout.
    pub fn new(store: LedgerStoreBox, config: LedgerConfig) -> Self {
        Self {
            store: Arc::from(store),
            config,
        }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Resolves a caller credential to the acting profile.
    pub async fn authenticate(&self, credential: &str) -> Result<Profile> {
        identity::authenticate(self.store(), credential).await
    }

    /// Pays for a job on behalf of its client, exactly once.
    pub async fn pay_job(&self, job_id: JobId, acting: &Profile) -> Result<PaymentReceipt> {
        PaymentOrchestrator::new(self.store(), self.config.lock_timeout)
            .pay_job(job_id, acting.id)
            .await
    }

    /// Credits the acting client's own balance, within its deposit cap.
    pub async fn deposit(
        &self,
        target_profile_id: ProfileId,
        acting: &Profile,
        amount: Decimal,
    ) -> Result<DepositReceipt> {
        DepositOrchestrator::new(self.store(), self.config.lock_timeout)
            .deposit(target_profile_id, acting, amount)
            .await
    }

    /// Current deposit ceiling of a client.
    pub async fn max_deposit(&self, client_id: ProfileId) -> Result<Decimal> {
        deposit::max_deposit(self.store(), client_id).await
    }

    /// Moves `amount` between two profiles, provided the payer covers it.
    pub async fn transfer(
        &self,
        payer: ProfileId,
        payee: ProfileId,
        amount: Amount,
    ) -> Result<Transfer> {
        transfer::transfer(
            self.store(),
            self.config.lock_timeout,
            payer,
            payee,
            amount,
            transfer::sufficient_funds(amount),
        )
        .await
    }

    pub async fn get_contract(&self, id: ContractId, acting: &Profile) -> Result<Contract> {
        queries::get_contract(self.store(), id, acting.id).await
    }

    pub async fn list_contracts(&self, acting: &Profile) -> Result<Vec<Contract>> {
        queries::list_contracts(self.store(), acting.id).await
    }

    pub async fn list_unpaid_jobs(&self, acting: &Profile) -> Result<Vec<Job>> {
        queries::list_unpaid_jobs(self.store(), acting.id).await
    }

    pub async fn best_profession(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<ProfessionEarnings>> {
        queries::best_profession(self.store(), start, end).await
    }

    pub async fn best_clients(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<ClientPayments>> {
        queries::best_clients(self.store(), start, end, limit).await
    }

    /// Final state of every profile, ordered by id.
    pub async fn profiles(&self) -> Result<Vec<Profile>> {
        self.store.profiles().await
    }
}
