use crate::application::unit::AtomicUnit;
use crate::domain::ports::LedgerStore;
use crate::domain::{Amount, Balance, Profile, ProfileId};
use crate::error::{LedgerError, Result};
use std::time::Duration;
use tracing::{info, instrument};

/// Outcome of a committed or staged transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub payer: ProfileId,
    pub payee: ProfileId,
    pub amount: Amount,
    pub payer_balance: Balance,
    pub payee_balance: Balance,
}

/// Precondition requiring the payer to cover `amount` from its current balance.
pub fn sufficient_funds(amount: Amount) -> impl FnOnce(&Profile) -> bool {
    move |payer| payer.balance.covers(amount)
}

/// Stages a debit of `payer` and a matching credit of `payee` inside `unit`.
///
/// Both rows are locked first; `precondition` is then evaluated against the
/// payer as currently committed (plus anything the unit already staged). A
/// failing precondition yields [`LedgerError::InsufficientFunds`] and stages nothing.
pub async fn transfer_within<P>(
    unit: &mut AtomicUnit<'_>,
    payer: ProfileId,
    payee: ProfileId,
    amount: Amount,
    precondition: P,
) -> Result<Transfer>
where
    P: FnOnce(&Profile) -> bool,
{
    if payer == payee {
        return Err(LedgerError::ValidationError(
            "Payer and payee must differ".to_string(),
        ));
    }

    let locked = unit.lock_profiles(&[payer, payee]).await?;
    if !precondition(&locked[0]) {
        return Err(LedgerError::InsufficientFunds);
    }

    let payer_balance = unit.debit(payer, amount).await?;
    let payee_balance = unit.credit(payee, amount).await?;

    Ok(Transfer {
        payer,
        payee,
        amount,
        payer_balance,
        payee_balance,
    })
}

/// Runs a transfer as its own atomic unit and commits it.
///
/// On any failure the unit is rolled back and the ledger is left untouched.
#[instrument(skip(store, lock_timeout, precondition))]
pub async fn transfer<P>(
    store: &dyn LedgerStore,
    lock_timeout: Duration,
    payer: ProfileId,
    payee: ProfileId,
    amount: Amount,
    precondition: P,
) -> Result<Transfer>
where
    P: FnOnce(&Profile) -> bool,
{
    let mut unit = AtomicUnit::begin(store, lock_timeout);
    match transfer_within(&mut unit, payer, payee, amount, precondition).await {
        Ok(transfer) => {
            unit.commit().await?;
            info!(payer, payee, "transfer committed");
            Ok(transfer)
        }
        Err(e) => {
            unit.rollback();
            Err(e)
        }
    }
}
