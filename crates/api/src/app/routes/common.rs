use axum::response::Response;

use stockroom_auth::{CommandAuthorization, Permission};

use crate::app::errors;
use crate::authz;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CmdAuth<C> {
    /// Unwrap the command once the caller holds every required permission.
    pub fn authorized(self, principal: &PrincipalContext) -> Result<C, Response> {
        authz::authorize_command(principal, &self).map_err(errors::forbidden)?;
        Ok(self.inner)
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Read guard: 403 unless the caller holds `permission`.
pub fn guard(principal: &PrincipalContext, permission: &Permission) -> Result<(), Response> {
    authz::require(principal, permission).map_err(errors::forbidden)
}
