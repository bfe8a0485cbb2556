use crate::application::unit::AtomicUnit;
use crate::domain::ports::LedgerStore;
use crate::domain::profile::out_of_range;
use crate::domain::{Amount, Balance, Profile, ProfileId};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tracing::{info, instrument};

/// Share of a client's outstanding job total it may deposit in one operation.
pub const DEPOSIT_CAP_RATIO: Decimal = dec!(0.25);

/// Deposit ceiling for a given total of unpaid job prices.
pub fn deposit_cap(unpaid_total: Decimal) -> Result<Decimal> {
    unpaid_total
        .checked_mul(DEPOSIT_CAP_RATIO)
        .ok_or_else(out_of_range)
}

/// Maximum deposit for `client_id` as currently committed. Lock-free; use
/// [`max_deposit_within`] when the value must not move before a credit.
pub async fn max_deposit(store: &dyn LedgerStore, client_id: ProfileId) -> Result<Decimal> {
    deposit_cap(store.unpaid_total(client_id).await?)
}

/// Maximum deposit for `client_id` as seen by `unit`.
pub async fn max_deposit_within(unit: &AtomicUnit<'_>, client_id: ProfileId) -> Result<Decimal> {
    deposit_cap(unit.unpaid_total(client_id).await?)
}

/// Acknowledgement of a deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositReceipt {
    pub profile_id: ProfileId,
    pub amount: Amount,
    pub cap: Decimal,
    pub balance: Balance,
}

/// Credits a client's own balance, capped by its outstanding obligations.
pub struct DepositOrchestrator<'a> {
    store: &'a dyn LedgerStore,
    lock_timeout: Duration,
}

impl<'a> DepositOrchestrator<'a> {
    pub fn new(store: &'a dyn LedgerStore, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    #[instrument(skip(self, acting), fields(acting = acting.id))]
    pub async fn deposit(
        &self,
        target_profile_id: ProfileId,
        acting: &Profile,
        amount: Decimal,
    ) -> Result<DepositReceipt> {
        if target_profile_id != acting.id {
            return Err(LedgerError::Forbidden(
                "profile id does not match the authenticated profile".to_string(),
            ));
        }
        if !acting.is_client() {
            return Err(LedgerError::Forbidden(
                "only clients may deposit money".to_string(),
            ));
        }

        let mut unit = AtomicUnit::begin(self.store, self.lock_timeout);
        match credit_within_cap(&mut unit, target_profile_id, amount).await {
            Ok(receipt) => {
                unit.commit().await?;
                info!(
                    profile_id = target_profile_id,
                    amount = %receipt.amount,
                    "deposit committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                unit.rollback();
                Err(e)
            }
        }
    }
}

async fn credit_within_cap(
    unit: &mut AtomicUnit<'_>,
    profile_id: ProfileId,
    amount: Decimal,
) -> Result<DepositReceipt> {
    unit.lock_profile(profile_id).await?;

    let cap = max_deposit_within(unit, profile_id).await?;
    if cap.is_zero() {
        return Err(LedgerError::NoUnpaidJobs);
    }
    // Checked under the row lock, after the cap, so a client with nothing owed
    // gets NoUnpaidJobs whatever the amount. Invalid amounts still pay for the lock.
    let amount = Amount::new(amount)?;
    if amount.value() > cap {
        return Err(LedgerError::DepositExceedsCap {
            amount: amount.value(),
            cap,
        });
    }

    let balance = unit.credit(profile_id, amount).await?;
    Ok(DepositReceipt {
        profile_id,
        amount,
        cap,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contract, ContractStatus, Job, ProfileType};
    use crate::infrastructure::in_memory::InMemoryLedger;
    use chrono::Utc;

    const TIMEOUT: Duration = Duration::from_millis(500);

    async fn ledger(job_prices: &[Decimal]) -> InMemoryLedger {
        let store = InMemoryLedger::new();
        store
            .insert_profile(Profile::new(1, ProfileType::Client, Balance::new(dec!(10))))
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
        for (i, price) in job_prices.iter().enumerate() {
            store
                .insert_job(Job::new(i as u32 + 1, 1, Amount::new(*price).unwrap()))
                .await
                .unwrap();
        }
        store
    }

    async fn client(store: &InMemoryLedger) -> Profile {
        store.profile(1).await.unwrap().unwrap()
    }

    #[test]
    fn test_deposit_cap_is_a_quarter() {
        assert_eq!(deposit_cap(dec!(150)).unwrap(), dec!(37.5));
        assert_eq!(deposit_cap(Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_max_deposit_ignores_paid_jobs() {
        let store = ledger(&[dec!(100), dec!(50)]).await;
        let mut job = store.job(2).await.unwrap().unwrap();
        job.mark_paid(Utc::now());
        store.insert_job(job).await.unwrap();

        assert_eq!(max_deposit(&store, 1).await.unwrap(), dec!(25));
        assert_eq!(max_deposit(&store, 5).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_deposit_up_to_cap() {
        let store = ledger(&[dec!(100), dec!(50)]).await;
        let deposits = DepositOrchestrator::new(&store, TIMEOUT);
        let acting = client(&store).await;

        let over = deposits.deposit(1, &acting, dec!(40)).await;
        assert!(matches!(over, Err(LedgerError::DepositExceedsCap { .. })));
        assert_eq!(client(&store).await.balance, Balance::new(dec!(10)));

        let receipt = deposits.deposit(1, &acting, dec!(37.5)).await.unwrap();
        assert_eq!(receipt.cap, dec!(37.5));
        assert_eq!(client(&store).await.balance, Balance::new(dec!(47.5)));
    }

    #[tokio::test]
    async fn test_deposit_without_unpaid_jobs() {
        let store = ledger(&[]).await;
        let deposits = DepositOrchestrator::new(&store, TIMEOUT);
        let acting = client(&store).await;

        assert!(matches!(
            deposits.deposit(1, &acting, dec!(1)).await,
            Err(LedgerError::NoUnpaidJobs)
        ));
        assert!(matches!(
            deposits.deposit(1, &acting, dec!(-1)).await,
            Err(LedgerError::NoUnpaidJobs)
        ));
    }

    #[tokio::test]
    async fn test_deposit_rejects_non_positive_amount() {
        let store = ledger(&[dec!(100)]).await;
        let deposits = DepositOrchestrator::new(&store, TIMEOUT);
        let acting = client(&store).await;

        assert!(matches!(
            deposits.deposit(1, &acting, Decimal::ZERO).await,
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_deposit_forbidden_for_other_profile_or_contractor() {
        let store = ledger(&[dec!(100)]).await;
        let deposits = DepositOrchestrator::new(&store, TIMEOUT);
        let acting = client(&store).await;
        let contractor = store.profile(5).await.unwrap().unwrap();

        assert!(matches!(
            deposits.deposit(5, &acting, dec!(1)).await,
            Err(LedgerError::Forbidden(_))
        ));
        assert!(matches!(
            deposits.deposit(5, &contractor, dec!(1)).await,
            Err(LedgerError::Forbidden(_))
        ));
        assert_eq!(store.profile(5).await.unwrap().unwrap().balance, Balance::ZERO);
    }

    #[tokio::test]
    async fn test_deposit_rejects_unrepresentable_balance() {
        let store = ledger(&[dec!(100)]).await;
        store
            .insert_profile(Profile::new(1, ProfileType::Client, Balance::new(Decimal::MAX)))
            .await
            .unwrap();
        let deposits = DepositOrchestrator::new(&store, TIMEOUT);
        let acting = client(&store).await;

        assert!(matches!(
            deposits.deposit(1, &acting, dec!(25)).await,
            Err(LedgerError::ValidationError(_))
        ));
        assert_eq!(client(&store).await.balance, Balance::new(Decimal::MAX));
    }
}
