use std::collections::HashSet;

use thiserror::Error;

use boda_core::ActorId;

use crate::{JwtClaims, Permission, PrincipalId, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built from verified claims plus the role policy below; no storage lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            principal_id: claims.sub,
            roles: claims.roles.clone(),
            permissions: permissions_for_roles(&claims.roles),
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Rider principals act only on their own record.
    pub fn is_rider(&self) -> bool {
        self.has_role(&Role::RIDER)
    }

    /// Reviewers without `riders.review_any` only see riders assigned to them.
    pub fn assignment_scope(&self) -> Option<ActorId> {
        match authorize(self, &Permission::RIDERS_REVIEW_ANY) {
            Ok(()) => None,
            Err(_) => Some(self.principal_id.as_actor()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Command-side authorization contract (checked at the command boundary).
///
/// The API layer enforces these requirements before calling the service.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Static role → permission policy.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut granted: Vec<Permission> = Vec::new();
    for role in roles {
        let perms: &[Permission] = match role.as_str() {
            "admin" => &[Permission::WILDCARD],
            "enumerator" => &[
                Permission::RIDERS_REGISTER,
                Permission::RIDERS_READ,
                Permission::RIDERS_APPROVE,
                Permission::RIDERS_REJECT,
            ],
            "rider" => &[
                Permission::SELF_READ,
                Permission::SELF_PUSH_TOKEN,
                Permission::SELF_ONBOARDING,
            ],
            _ => &[],
        };
        for p in perms {
            if !granted.contains(p) {
                granted.push(p.clone());
            }
        }
    }
    granted
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
