use boda_auth::{CommandAuthorization, Permission};
use boda_core::DomainError;
use boda_infra::ServiceError;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Permissions one route requires.
pub struct RouteAuth {
    pub required: Vec<Permission>,
}

impl CommandAuthorization for RouteAuth {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Authorize the current principal for `perm`.
pub fn guard(principal: &PrincipalContext, perm: Permission) -> Result<(), axum::response::Response> {
    let route = RouteAuth {
        required: vec![perm],
    };
    crate::authz::authorize_command(principal, &route)
        .map_err(|e| errors::service_error_to_response(ServiceError::from(e)))
}

/// Guard for self-service endpoints.
///
/// A credential that does not identify a rider is an authentication failure
/// whatever its roles, so identity is checked before permissions.
pub fn rider_guard(principal: &PrincipalContext, perm: Permission) -> Result<(), axum::response::Response> {
    if !principal.principal().is_rider() {
        return Err(errors::service_error_to_response(ServiceError::from(
            DomainError::Unauthenticated,
        )));
    }
    guard(principal, perm)
}
