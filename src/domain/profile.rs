use super::ProfileId;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the monetary balance held by a profile.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific rules
/// and provide type safety for financial calculations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount moved by a payment or deposit.
///
/// Construction (including deserialization) rejects zero and negative values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.normalize().fmt(f)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether this balance can be debited by `amount` without going negative.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, LedgerError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(out_of_range)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, LedgerError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or_else(out_of_range)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.normalize().fmt(f)
    }
}

/// Error for a monetary value that falls outside the representable range.
pub fn out_of_range() -> LedgerError {
    LedgerError::ValidationError("Amount out of range".to_string())
}

/// Sums monetary values, failing instead of overflowing.
pub fn checked_sum<I>(values: I) -> Result<Decimal, LedgerError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| {
            total.checked_add(value).ok_or_else(out_of_range)
        })
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Client,
    Contractor,
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileType::Client => f.write_str("client"),
            ProfileType::Contractor => f.write_str("contractor"),
        }
    }
}

/// A participant of the marketplace.
///
/// Clients fund jobs; contractors get paid for them. The balance is only ever
/// mutated through an atomic unit and never drops below zero.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub profession: String,
    pub balance: Balance,
    pub r#type: ProfileType,
}

impl Profile {
    pub fn new(id: ProfileId, r#type: ProfileType, balance: Balance) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            profession: String::new(),
            balance,
            r#type,
        }
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.to_string();
        self.last_name = last_name.to_string();
        self
    }

    pub fn with_profession(mut self, profession: &str) -> Self {
        self.profession = profession.to_string();
        self
    }

    pub fn is_client(&self) -> bool {
        self.r#type == ProfileType::Client
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Credits the balance. Fails if the result is not representable.
    pub fn credit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self.balance.checked_add(amount.into())?;
        Ok(())
    }

    /// Debits the balance if it covers `amount`.
    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.balance.covers(amount) {
            self.balance = self.balance.checked_sub(amount.into())?;
            Ok(())
        } else {
            Err(LedgerError::InsufficientFunds)
        }
    }
}
