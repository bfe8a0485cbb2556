use super::{Amount, ContractId, JobId, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    New,
    InProgress,
    Terminated,
}

/// Links a client profile to a contractor profile. Read-only for the ledger core.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    #[serde(default)]
    pub terms: String,
    pub status: ContractStatus,
    pub client_id: ProfileId,
    pub contractor_id: ProfileId,
}

impl Contract {
    /// Whether `profile_id` is either side of the contract.
    pub fn involves(&self, profile_id: ProfileId) -> bool {
        self.client_id == profile_id || self.contractor_id == profile_id
    }
}

/// A priced unit of work under a contract.
///
/// `paid` is unset until the job is paid, then flips to `true` exactly once
/// together with `payment_date`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub description: String,
    pub price: Amount,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    pub contract_id: ContractId,
}

impl Job {
    pub fn new(id: JobId, contract_id: ContractId, price: Amount) -> Self {
        Self {
            id,
            description: String::new(),
            price,
            paid: None,
            payment_date: None,
            contract_id,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.paid == Some(true)
    }

    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        self.paid = Some(true);
        self.payment_date = Some(at);
    }

    /// Whether the job was paid within `[start, end]`.
    pub fn paid_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.is_paid()
            && self
                .payment_date
                .is_some_and(|date| date >= start && date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_job_deserialization_defaults_to_unpaid() {
        let json = r#"{"id":1,"description":"work","price":"200","contractId":1}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.price.value(), dec!(200));
        assert!(!job.is_paid());
        assert!(job.payment_date.is_none());
    }

    #[test]
    fn test_job_rejects_non_positive_price() {
        let json = r#"{"id":1,"price":"0","contractId":1}"#;
        assert!(serde_json::from_str::<Job>(json).is_err());
    }

    #[test]
    fn test_mark_paid_sets_date() {
        let mut job = Job::new(1, 1, Amount::new(dec!(10)).unwrap());
        let at = Utc.with_ymd_and_hms(2020, 8, 15, 19, 11, 26).unwrap();
        job.mark_paid(at);
        assert!(job.is_paid());
        assert!(job.paid_between(at, at));
        assert!(!job.paid_between(at + chrono::Duration::seconds(1), at + chrono::Duration::days(1)));
    }

    #[test]
    fn test_contract_status_serialization() {
        let json = r#"{"id":1,"status":"in_progress","clientId":1,"contractorId":5}"#;
        let contract: Contract = serde_json::from_str(json).unwrap();
        assert_eq!(contract.status, ContractStatus::InProgress);
        assert!(contract.involves(1));
        assert!(contract.involves(5));
        assert!(!contract.involves(2));
    }
}
