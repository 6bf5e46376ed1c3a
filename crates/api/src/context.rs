use stockroom_auth::{Principal, Role};
use stockroom_infra::projections::UserView;

/// The authenticated caller for a request.
///
/// Built from the live user record, not the token claims, so role and status
/// changes apply to tokens already handed out.
#[derive(Debug, Clone)]
pub struct PrincipalContext {
    principal: Principal,
    user: UserView,
}

impl PrincipalContext {
    pub fn new(user: UserView) -> Self {
        Self {
            principal: Principal::new(user.id, user.username.clone(), user.role),
            user,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user(&self) -> &UserView {
        &self.user
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}
