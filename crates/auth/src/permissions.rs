use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "riders.approve").
///
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const RIDERS_REGISTER: Permission = Permission(Cow::Borrowed("riders.register"));
    pub const RIDERS_READ: Permission = Permission(Cow::Borrowed("riders.read"));
    pub const RIDERS_APPROVE: Permission = Permission(Cow::Borrowed("riders.approve"));
    pub const RIDERS_REJECT: Permission = Permission(Cow::Borrowed("riders.reject"));
    /// Decide on riders assigned to someone else. Only the wildcard grants it.
    pub const RIDERS_REVIEW_ANY: Permission = Permission(Cow::Borrowed("riders.review_any"));
    pub const SELF_READ: Permission = Permission(Cow::Borrowed("self.read"));
    pub const SELF_PUSH_TOKEN: Permission = Permission(Cow::Borrowed("self.push_token"));
    pub const SELF_ONBOARDING: Permission = Permission(Cow::Borrowed("self.onboarding"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
