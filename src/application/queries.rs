//! Read-only lookups. None of these take row locks; they see committed state.

use crate::domain::ports::LedgerStore;
use crate::domain::profile::checked_sum;
use crate::domain::{Contract, ContractId, ContractStatus, Job, ProfileId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Default number of entries returned by [`best_clients`].
pub const DEFAULT_BEST_CLIENTS_LIMIT: usize = 2;

/// Returns the contract if the acting profile is one of its parties.
pub async fn get_contract(
    store: &dyn LedgerStore,
    id: ContractId,
    acting_profile_id: ProfileId,
) -> Result<Contract> {
    store
        .contract(id)
        .await?
        .filter(|c| c.involves(acting_profile_id))
        .ok_or(LedgerError::ContractNotFound(id))
}

/// Non-terminated contracts the acting profile is party to.
pub async fn list_contracts(
    store: &dyn LedgerStore,
    acting_profile_id: ProfileId,
) -> Result<Vec<Contract>> {
    Ok(store
        .contracts()
        .await?
        .into_iter()
        .filter(|c| c.involves(acting_profile_id) && c.status != ContractStatus::Terminated)
        .collect())
}

/// Unpaid jobs of in-progress contracts the acting profile is party to.
pub async fn list_unpaid_jobs(
    store: &dyn LedgerStore,
    acting_profile_id: ProfileId,
) -> Result<Vec<Job>> {
    let active: HashMap<ContractId, Contract> = store
        .contracts()
        .await?
        .into_iter()
        .filter(|c| c.status == ContractStatus::InProgress && c.involves(acting_profile_id))
        .map(|c| (c.id, c))
        .collect();

    Ok(store
        .jobs()
        .await?
        .into_iter()
        .filter(|job| !job.is_paid() && active.contains_key(&job.contract_id))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionEarnings {
    pub profession: String,
    pub total_earnings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayments {
    pub id: ProfileId,
    pub full_name: String,
    pub paid: Decimal,
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start > end {
        return Err(LedgerError::ValidationError(
            "start must not be after end".to_string(),
        ));
    }
    Ok(())
}

/// Sums prices of jobs paid within the window, keyed by the chosen contract party.
async fn paid_in_window_by(
    store: &dyn LedgerStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    party: fn(&Contract) -> ProfileId,
) -> Result<BTreeMap<ProfileId, Decimal>> {
    let contracts: HashMap<ContractId, Contract> = store
        .contracts()
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut totals = BTreeMap::new();
    for job in store.jobs().await? {
        if !job.paid_between(start, end) {
            continue;
        }
        if let Some(contract) = contracts.get(&job.contract_id) {
            let total = totals.entry(party(contract)).or_insert(Decimal::ZERO);
            *total = checked_sum([*total, job.price.value()])?;
        }
    }
    Ok(totals)
}

/// The profession that earned the most from jobs paid within `[start, end]`.
pub async fn best_profession(
    store: &dyn LedgerStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<ProfessionEarnings>> {
    check_window(start, end)?;
    let earnings = paid_in_window_by(store, start, end, |c| c.contractor_id).await?;

    let mut by_profession: BTreeMap<String, Decimal> = BTreeMap::new();
    for (contractor_id, total) in earnings {
        if let Some(contractor) = store.profile(contractor_id).await? {
            let earned = by_profession
                .entry(contractor.profession)
                .or_insert(Decimal::ZERO);
            *earned = checked_sum([*earned, total])?;
        }
    }

    // Ties resolve to the alphabetically first profession.
    Ok(by_profession
        .into_iter()
        .fold(None, |best: Option<ProfessionEarnings>, (profession, total)| match best {
            Some(b) if b.total_earnings >= total => Some(b),
            _ => Some(ProfessionEarnings {
                profession,
                total_earnings: total,
            }),
        }))
}

/// The clients that paid the most for jobs paid within `[start, end]`, best first.
pub async fn best_clients(
    store: &dyn LedgerStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: Option<usize>,
) -> Result<Vec<ClientPayments>> {
    check_window(start, end)?;
    let limit = limit.unwrap_or(DEFAULT_BEST_CLIENTS_LIMIT);
    let payments = paid_in_window_by(store, start, end, |c| c.client_id).await?;

    let mut ranked: Vec<(ProfileId, Decimal)> = payments.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut clients = Vec::with_capacity(limit.min(ranked.len()));
    for (id, paid) in ranked.into_iter().take(limit) {
        let full_name = store
            .profile(id)
            .await?
            .map(|p| p.full_name())
            .unwrap_or_default();
        clients.push(ClientPayments {
            id,
            full_name,
            paid,
        });
    }
    Ok(clients)
}
