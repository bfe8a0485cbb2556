use std::time::Duration;

/// Default bound on how long a unit waits for a contended profile row.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings of the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long an operation may wait for exclusive access to a profile before
    /// giving up with [`LedgerError::LockTimeout`](crate::error::LedgerError::LockTimeout).
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}
