use crate::application::transfer::{sufficient_funds, transfer_within};
use crate::application::unit::AtomicUnit;
use crate::domain::ports::LedgerStore;
use crate::domain::{Amount, Balance, Contract, Job, JobId, ProfileId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, instrument};

/// Acknowledgement of a paid job.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub job_id: JobId,
    pub payer: ProfileId,
    pub payee: ProfileId,
    pub amount: Amount,
    pub payer_balance: Balance,
    pub paid_at: DateTime<Utc>,
}

/// Pays for jobs exactly once.
///
/// The payer is always the acting client; the payee is the contractor named on the
/// job's contract. The paid-flag check, the debit, the credit and the paid-flag write
/// share one atomic unit, so two concurrent payments of the same job can never both
/// succeed.
pub struct PaymentOrchestrator<'a> {
    store: &'a dyn LedgerStore,
    lock_timeout: Duration,
}

impl<'a> PaymentOrchestrator<'a> {
    pub fn new(store: &'a dyn LedgerStore, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn pay_job(&self, job_id: JobId, acting_profile_id: ProfileId) -> Result<PaymentReceipt> {
        let (job, contract) = self.owned_job(job_id, acting_profile_id).await?;
        // Cheap pre-check; re-checked under the payer's lock below.
        if job.is_paid() {
            return Err(LedgerError::AlreadyPaid(job_id));
        }

        let mut unit = AtomicUnit::begin(self.store, self.lock_timeout);
        match settle(&mut unit, &job, contract.client_id, contract.contractor_id).await {
            Ok(receipt) => {
                unit.commit().await?;
                info!(
                    job_id,
                    payer = receipt.payer,
                    payee = receipt.payee,
                    amount = %receipt.amount,
                    "job paid"
                );
                Ok(receipt)
            }
            Err(e) => {
                unit.rollback();
                Err(e)
            }
        }
    }

    /// Resolves the job with its contract, hiding jobs the caller does not own.
    async fn owned_job(&self, job_id: JobId, client_id: ProfileId) -> Result<(Job, Contract)> {
        let job = self
            .store
            .job(job_id)
            .await?
            .ok_or(LedgerError::JobNotFound(job_id))?;
        let contract = self
            .store
            .contract(job.contract_id)
            .await?
            .filter(|c| c.client_id == client_id)
            .ok_or(LedgerError::JobNotFound(job_id))?;
        Ok((job, contract))
    }
}

async fn settle(
    unit: &mut AtomicUnit<'_>,
    job: &Job,
    payer: ProfileId,
    payee: ProfileId,
) -> Result<PaymentReceipt> {
    unit.lock_profiles(&[payer, payee]).await?;

    let current = unit
        .job(job.id)
        .await?
        .ok_or(LedgerError::JobNotFound(job.id))?;
    if current.is_paid() {
        return Err(LedgerError::AlreadyPaid(job.id));
    }

    let amount = current.price;
    let transfer = transfer_within(unit, payer, payee, amount, sufficient_funds(amount)).await?;

    let paid_at = Utc::now();
    unit.mark_paid(job.id, paid_at);

    Ok(PaymentReceipt {
        job_id: job.id,
        payer,
        payee,
        amount,
        payer_balance: transfer.payer_balance,
        paid_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractStatus, Profile, ProfileType};
    use crate::infrastructure::in_memory::InMemoryLedger;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const TIMEOUT: Duration = Duration::from_millis(500);

    async fn ledger(client_balance: Balance) -> InMemoryLedger {
        let store = InMemoryLedger::new();
        store
            .insert_profile(Profile::new(1, ProfileType::Client, client_balance))
            .await
            .unwrap();
        store
            .insert_profile(Profile::new(2, ProfileType::Client, Balance::new(dec!(1000))))
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
            .insert_job(Job::new(1, 1, Amount::new(dec!(60)).unwrap()))
            .await
            .unwrap();
        store
    }

    async fn balance(store: &InMemoryLedger, id: ProfileId) -> Balance {
        store.profile(id).await.unwrap().unwrap().balance
    }

    #[tokio::test]
    async fn test_pay_job_success() {
        let store = ledger(Balance::new(dec!(100))).await;
        let payments = PaymentOrchestrator::new(&store, TIMEOUT);

        let receipt = payments.pay_job(1, 1).await.unwrap();

        assert_eq!(receipt.payee, 5);
        assert_eq!(receipt.payer_balance, Balance::new(dec!(40)));
        assert_eq!(balance(&store, 1).await, Balance::new(dec!(40)));
        assert_eq!(balance(&store, 5).await, Balance::new(dec!(60)));
        let job = store.job(1).await.unwrap().unwrap();
        assert!(job.is_paid());
        assert_eq!(job.payment_date, Some(receipt.paid_at));
    }

    #[tokio::test]
    async fn test_pay_job_twice() {
        let store = ledger(Balance::new(dec!(200))).await;
        let payments = PaymentOrchestrator::new(&store, TIMEOUT);

        payments.pay_job(1, 1).await.unwrap();
        let second = payments.pay_job(1, 1).await;

        assert!(matches!(second, Err(LedgerError::AlreadyPaid(1))));
        assert_eq!(balance(&store, 1).await, Balance::new(dec!(140)));
        assert_eq!(balance(&store, 5).await, Balance::new(dec!(60)));
    }

    #[tokio::test]
    async fn test_pay_job_not_owned_is_not_found() {
        let store = ledger(Balance::new(dec!(100))).await;
        let payments = PaymentOrchestrator::new(&store, TIMEOUT);

        assert!(matches!(
            payments.pay_job(1, 2).await,
            Err(LedgerError::JobNotFound(1))
        ));
        // The contractor cannot pay its own job either.
        assert!(matches!(
            payments.pay_job(1, 5).await,
            Err(LedgerError::JobNotFound(1))
        ));
        assert!(matches!(
            payments.pay_job(99, 1).await,
            Err(LedgerError::JobNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_pay_job_insufficient_funds() {
        let store = ledger(Balance::new(dec!(10))).await;
        let payments = PaymentOrchestrator::new(&store, TIMEOUT);

        let result = payments.pay_job(1, 1).await;

        assert!(matches!(result, Err(LedgerError::InsufficientFunds)));
        assert_eq!(balance(&store, 1).await, Balance::new(dec!(10)));
        assert_eq!(balance(&store, 5).await, Balance::ZERO);
        assert!(!store.job(1).await.unwrap().unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_pay_job_waits_for_busy_payer() {
        let store = ledger(Balance::new(dec!(100))).await;
        let _held = store.row_locks().acquire(1).await;

        let payments = PaymentOrchestrator::new(&store, Duration::from_millis(20));
        let result = payments.pay_job(1, 1).await;

        assert!(matches!(result, Err(LedgerError::LockTimeout(1))));
        assert_eq!(balance(&store, 1).await, Balance::new(dec!(100)));
        assert!(!store.job(1).await.unwrap().unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_pay_job_rejects_unrepresentable_payee_balance() {
        let store = ledger(Balance::new(dec!(100))).await;
        store
            .insert_profile(Profile::new(5, ProfileType::Contractor, Balance::new(Decimal::MAX)))
            .await
            .unwrap();
        let payments = PaymentOrchestrator::new(&store, TIMEOUT);

        let result = payments.pay_job(1, 1).await;

        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
        assert_eq!(balance(&store, 1).await, Balance::new(dec!(100)));
        assert_eq!(balance(&store, 5).await, Balance::new(Decimal::MAX));
        assert!(!store.job(1).await.unwrap().unwrap().is_paid());
    }
}
