use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use boda_core::{ActorId, RiderId};

/// Identity of an authenticated principal (reviewer or rider device).
///
/// For rider principals the subject *is* the rider id; for reviewers it is the
/// actor id recorded on decisions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn as_actor(&self) -> ActorId {
        ActorId::from_uuid(self.0)
    }

    pub fn as_rider(&self) -> RiderId {
        RiderId::from_uuid(self.0)
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<RiderId> for PrincipalId {
    fn from(value: RiderId) -> Self {
        Self(*value.as_uuid())
    }
}

impl From<PrincipalId> for Uuid {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}
