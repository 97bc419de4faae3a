//! API-side authorization guard.
//!
//! Enforced at the request boundary, before the service is called, so the
//! service and store stay auth-agnostic apart from the rider's own identity.

use boda_auth::{authorize, AuthzError, CommandAuthorization};

use crate::context::PrincipalContext;

/// Check every permission the command requires for the current principal.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    for perm in command.required_permissions() {
        authorize(principal.principal(), perm)?;
    }
    Ok(())
}
