//! Public rider profile number, issued once on approval.

use serde::{Deserialize, Serialize};

use boda_core::{DomainError, DomainResult};

const PREFIX: &str = "DB";

/// Profile number in the form `DB-YYYY-NNNN`.
///
/// The sequence restarts every calendar year and is zero-padded to four
/// digits; it keeps growing past 9999 rather than wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn issue(year: i32, sequence: u32) -> Self {
        Self(format!("{PREFIX}-{year}-{sequence:04}"))
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        let invalid = || DomainError::validation(format!("invalid profile id: {raw}"));

        let mut parts = raw.split('-');
        let (Some(prefix), Some(year), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if prefix != PREFIX || year.len() != 4 || !digits(year) || seq.len() < 4 || !digits(seq) {
            return Err(invalid());
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
