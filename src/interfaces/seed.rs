use crate::domain::ports::LedgerStore;
use crate::domain::{Contract, Job, Profile, ProfileType};
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;

/// Initial ledger content, loaded out-of-band before any operation runs.
///
/// JSON shape: `{"profiles": [...], "contracts": [...], "jobs": [...]}`.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct LedgerSeed {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl LedgerSeed {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let seed: Self = serde_json::from_reader(source)?;
        seed.validate()?;
        Ok(seed)
    }

    /// Checks referential integrity and the non-negative balance invariant.
    pub fn validate(&self) -> Result<()> {
        let mut types = HashMap::new();
        for profile in &self.profiles {
            if profile.balance.is_negative() {
                return Err(invalid(format!("profile {} has a negative balance", profile.id)));
            }
            if types.insert(profile.id, profile.r#type).is_some() {
                return Err(invalid(format!("duplicate profile {}", profile.id)));
            }
        }

        let mut contracts = HashSet::new();
        for contract in &self.contracts {
            if types.get(&contract.client_id) != Some(&ProfileType::Client) {
                return Err(invalid(format!(
                    "contract {} client {} is not a client profile",
                    contract.id, contract.client_id
                )));
            }
            if types.get(&contract.contractor_id) != Some(&ProfileType::Contractor) {
                return Err(invalid(format!(
                    "contract {} contractor {} is not a contractor profile",
                    contract.id, contract.contractor_id
                )));
            }
            if !contracts.insert(contract.id) {
                return Err(invalid(format!("duplicate contract {}", contract.id)));
            }
        }

        let mut jobs = HashSet::new();
        for job in &self.jobs {
            if !contracts.contains(&job.contract_id) {
                return Err(invalid(format!(
                    "job {} references unknown contract {}",
                    job.id, job.contract_id
                )));
            }
            if !jobs.insert(job.id) {
                return Err(invalid(format!("duplicate job {}", job.id)));
            }
        }
        Ok(())
    }

    /// Writes the seed into `store`.
    pub async fn install(self, store: &dyn LedgerStore) -> Result<()> {
        for profile in self.profiles {
            store.insert_profile(profile).await?;
        }
        for contract in self.contracts {
            store.insert_contract(contract).await?;
        }
        for job in self.jobs {
            store.insert_job(job).await?;
        }
        Ok(())
    }
}

fn invalid(message: String) -> LedgerError {
    LedgerError::ValidationError(message)
}
