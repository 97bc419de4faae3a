use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried in tokens.
///
/// Roles stay opaque strings on the wire; the well-known ones are exposed as
/// constants so policy code does not repeat literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Program administrator: every permission.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    /// Field enumerator: registers and reviews riders.
    pub const ENUMERATOR: Role = Role(Cow::Borrowed("enumerator"));
    /// Rider device: self-service endpoints only.
    pub const RIDER: Role = Role(Cow::Borrowed("rider"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
