use crate::domain::{ContractId, JobId, ProfileId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Every failure the ledger core can surface.
///
/// Errors raised inside an [`AtomicUnit`](crate::application::unit::AtomicUnit)
/// are returned only after the unit has been rolled back.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Job {0} not found")]
    JobNotFound(JobId),
    #[error("Contract {0} not found")]
    ContractNotFound(ContractId),
    #[error("Job {0} has already been paid for")]
    AlreadyPaid(JobId),
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Profile has no unpaid jobs")]
    NoUnpaidJobs,
    #[error("Deposit of {amount} exceeds the allowed maximum of {cap}")]
    DepositExceedsCap { amount: Decimal, cap: Decimal },
    #[error("Unknown account {0}")]
    UnknownAccount(ProfileId),
    #[error("Unauthorized to make this request")]
    Unauthorized,
    #[error("Account {0} is busy, try again later")]
    LockTimeout(ProfileId),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Caller-visible classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InsufficientFunds,
    Forbidden,
    NoUnpaidJobs,
    DepositExceedsCap,
    UnknownAccount,
    Unauthorized,
    Busy,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code reported to callers.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::InsufficientFunds => 402,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::DepositExceedsCap => 413,
            ErrorKind::UnknownAccount => 422,
            ErrorKind::NoUnpaidJobs => 424,
            ErrorKind::Busy => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "already_paid",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NoUnpaidJobs => "no_unpaid_jobs",
            ErrorKind::DepositExceedsCap => "deposit_exceeds_cap",
            ErrorKind::UnknownAccount => "unknown_account",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Busy => "busy",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Internal => "internal",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::JobNotFound(_) | LedgerError::ContractNotFound(_) => ErrorKind::NotFound,
            LedgerError::AlreadyPaid(_) => ErrorKind::Conflict,
            LedgerError::InsufficientFunds => ErrorKind::InsufficientFunds,
            LedgerError::Forbidden(_) => ErrorKind::Forbidden,
            LedgerError::NoUnpaidJobs => ErrorKind::NoUnpaidJobs,
            LedgerError::DepositExceedsCap { .. } => ErrorKind::DepositExceedsCap,
            LedgerError::UnknownAccount(_) => ErrorKind::UnknownAccount,
            LedgerError::Unauthorized => ErrorKind::Unauthorized,
            LedgerError::LockTimeout(_) => ErrorKind::Busy,
            LedgerError::ValidationError(_)
            | LedgerError::CsvError(_)
            | LedgerError::JsonError(_) => ErrorKind::InvalidRequest,
            LedgerError::IoError(_) | LedgerError::InternalError(_) => ErrorKind::Internal,
            #[cfg(feature = "storage-rocksdb")]
            LedgerError::StorageError(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        LedgerError::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}
