#![allow(dead_code)]

use jobpay::application::engine::LedgerEngine;
use jobpay::config::LedgerConfig;
use jobpay::domain::ports::LedgerStore;
use jobpay::domain::{Amount, Balance, Contract, ContractStatus, Job, Profile, ProfileType};
use jobpay::infrastructure::in_memory::InMemoryLedger;
use rust_decimal::Decimal;
use std::time::Duration;

pub const CLIENT: u32 = 1;
pub const OTHER_CLIENT: u32 = 2;
pub const CONTRACTOR: u32 = 5;

/// Builds a ledger with one client, one unrelated client and one contractor.
///
/// Every job in `job_prices` is unpaid and belongs to a single in-progress contract
/// between `CLIENT` and `CONTRACTOR`; job ids start at 1.
pub async fn ledger(client_balance: Decimal, job_prices: &[Decimal]) -> InMemoryLedger {
    let store = InMemoryLedger::new();
    store
        .insert_profile(
            Profile::new(CLIENT, ProfileType::Client, Balance::new(client_balance))
                .with_name("Harry", "Potter"),
        )
        .await
        .unwrap();
    store
        .insert_profile(
            Profile::new(OTHER_CLIENT, ProfileType::Client, Balance::new(Decimal::from(1000)))
                .with_name("Mr", "Robot"),
        )
        .await
        .unwrap();
    store
        .insert_profile(
            Profile::new(CONTRACTOR, ProfileType::Contractor, Balance::ZERO)
                .with_name("John", "Lenon")
                .with_profession("Musician"),
        )
        .await
        .unwrap();
    store
        .insert_contract(Contract {
            id: 1,
            terms: "bla bla bla".to_string(),
            status: ContractStatus::InProgress,
            client_id: CLIENT,
            contractor_id: CONTRACTOR,
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

pub fn engine(store: InMemoryLedger) -> LedgerEngine {
    LedgerEngine::new(
        Box::new(store),
        LedgerConfig::default().with_lock_timeout(Duration::from_secs(2)),
    )
}

pub async fn balance(engine: &LedgerEngine, id: u32) -> Balance {
    engine.store().profile(id).await.unwrap().unwrap().balance
}

pub async fn acting(engine: &LedgerEngine, id: u32) -> Profile {
    engine.authenticate(&id.to_string()).await.unwrap()
}
