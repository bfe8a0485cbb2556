use crate::domain::{Profile, ProfileId, ProfileType};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ProfileRow {
    id: ProfileId,
    r#type: ProfileType,
    balance: String,
}

/// Writes final profile balances as CSV (`id,type,balance`).
pub struct ProfileWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ProfileWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes every profile, ordered by id, with normalized balances.
    pub fn write_profiles(&mut self, mut profiles: Vec<Profile>) -> Result<()> {
        profiles.sort_by_key(|p| p.id);
        for profile in profiles {
            self.writer.serialize(ProfileRow {
                id: profile.id,
                r#type: profile.r#type,
                balance: profile.balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
