use crate::domain::Profile;
use crate::domain::ports::LedgerStore;
use crate::error::{LedgerError, Result};

/// Resolves an opaque caller credential to the acting profile.
///
/// The credential is the profile id as text. Anything that does not name an
/// existing profile is rejected with [`LedgerError::Unauthorized`].
pub async fn authenticate(store: &dyn LedgerStore, credential: &str) -> Result<Profile> {
    let id = credential
        .trim()
        .parse()
        .map_err(|_| LedgerError::Unauthorized)?;
    store.profile(id).await?.ok_or(LedgerError::Unauthorized)
}
