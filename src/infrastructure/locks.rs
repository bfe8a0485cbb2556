use crate::domain::ProfileId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Exclusive per-profile row locks.
///
/// A guard returned by [`RowLocks::acquire`] grants exclusive access to one
/// profile row until it is dropped. Callers needing several rows must acquire
/// them in ascending id order.
#[derive(Default, Clone)]
pub struct RowLocks {
    rows: Arc<Mutex<HashMap<ProfileId, Arc<Mutex<()>>>>>,
}

pub type RowGuard = OwnedMutexGuard<()>;

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the row for `profile_id` is free and takes it.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the row untouched.
    pub async fn acquire(&self, profile_id: ProfileId) -> RowGuard {
        let row = {
            let mut rows = self.rows.lock().await;
            rows.entry(profile_id).or_default().clone()
        };
        row.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.rows.lock().await.len()
    }
}
