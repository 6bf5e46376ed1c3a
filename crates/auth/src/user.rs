//! User aggregate (event-sourced).
//!
//! Accounts are created by self-registration (STAFF is approved on the spot,
//! MANAGER waits for an administrator) or by seeding (the ADMIN account).
//! Administrators can approve, reject and delete everyone except other
//! administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, AggregateRoot, DomainError, UserId};
use stockroom_events::Event;

use crate::Role;

/// Stream type for user aggregates.
pub const USER_AGGREGATE_TYPE: &str = "auth.user";

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Pending, UserStatus::Approved, UserStatus::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "PENDING",
            UserStatus::Approved => "APPROVED",
            UserStatus::Rejected => "REJECTED",
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown user status '{s}'")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// # Invariants
/// - Email is stored trimmed and lower-cased.
/// - An ADMIN account's status cannot change and it cannot be deleted.
/// - A deleted user accepts no further commands.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub created: bool,
    pub deleted: bool,
}

impl User {
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            username: String::new(),
            email: String::new(),
            password_hash: String::new(),
            role: Role::Staff,
            status: UserStatus::Pending,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    /// Already hashed; the aggregate never sees plain passwords.
    pub password_hash: String,
    pub role: Role,
    /// Only the startup seeder sets this.
    pub allow_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeUserStatus {
    pub user_id: UserId,
    pub status: UserStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePassword {
    pub user_id: UserId,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
    ChangeStatus(ChangeUserStatus),
    ChangePassword(ChangePassword),
    Delete(DeleteUser),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatusChanged {
    pub user_id: UserId,
    pub from: UserStatus,
    pub to: UserStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub user_id: UserId,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    StatusChanged(UserStatusChanged),
    PasswordChanged(PasswordChanged),
    Deleted(UserDeleted),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "auth.user.registered",
            UserEvent::StatusChanged(_) => "auth.user.status_changed",
            UserEvent::PasswordChanged(_) => "auth.user.password_changed",
            UserEvent::Deleted(_) => "auth.user.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::StatusChanged(e) => e.occurred_at,
            UserEvent::PasswordChanged(e) => e.occurred_at,
            UserEvent::Deleted(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => {
                self.id = e.user_id;
                self.username = e.username.clone();
                self.email = e.email.clone();
                self.password_hash = e.password_hash.clone();
                self.role = e.role;
                self.status = e.status;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            UserEvent::StatusChanged(e) => {
                self.status = e.to;
                self.updated_at = Some(e.occurred_at);
            }
            UserEvent::PasswordChanged(e) => {
                self.password_hash = e.password_hash.clone();
                self.updated_at = Some(e.occurred_at);
            }
            UserEvent::Deleted(e) => {
                self.deleted = true;
                self.updated_at = Some(e.occurred_at);
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
            UserCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            UserCommand::ChangePassword(cmd) => self.handle_change_password(cmd),
            UserCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl User {
    // ─────────────────────────────────────────────────────────────────────────
    // Command Handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("user already exists"));
        }

        let username = cmd.username.trim();
        if username.chars().count() < 3 {
            return Err(DomainError::validation("Username must be at least 3 characters"));
        }

        let email = normalize_email(&cmd.email);
        if !is_plausible_email(&email) {
            return Err(DomainError::validation("Please provide a valid email address"));
        }

        if cmd.password_hash.is_empty() {
            return Err(DomainError::validation("password hash is required"));
        }

        if cmd.role == Role::Admin && !cmd.allow_admin {
            return Err(DomainError::validation("Admin accounts cannot be self-registered"));
        }

        let status = match cmd.role {
            Role::Manager => UserStatus::Pending,
            Role::Staff | Role::Admin => UserStatus::Approved,
        };

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            username: username.to_string(),
            email,
            password_hash: cmd.password_hash.clone(),
            role: cmd.role,
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeUserStatus) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live()?;

        if self.role == Role::Admin {
            return Err(DomainError::invariant("Cannot modify admin user status"));
        }

        if self.status == cmd.status {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::StatusChanged(UserStatusChanged {
            user_id: cmd.user_id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_password(&self, cmd: &ChangePassword) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live()?;

        if cmd.password_hash.is_empty() {
            return Err(DomainError::validation("password hash is required"));
        }

        Ok(vec![UserEvent::PasswordChanged(PasswordChanged {
            user_id: cmd.user_id,
            password_hash: cmd.password_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live()?;

        if self.role == Role::Admin {
            return Err(DomainError::invariant("Cannot delete admin user"));
        }

        Ok(vec![UserEvent::Deleted(UserDeleted {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Trim and lower-case; the same rule is used for lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockroom_events::execute;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn register(user_id: UserId, role: Role) -> UserCommand {
        UserCommand::Register(RegisterUser {
            user_id,
            username: "alice".to_string(),
            email: "  Alice@Example.COM ".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            role,
            allow_admin: false,
            occurred_at: now(),
        })
    }

    fn registered(role: Role) -> User {
        let id = UserId::new();
        let mut user = User::empty(id);
        let mut cmd = register(id, role);
        if let UserCommand::Register(c) = &mut cmd {
            c.allow_admin = true;
        }
        execute(&mut user, &cmd).unwrap();
        user
    }

    #[test]
    fn staff_is_auto_approved_and_email_normalized() {
        let user = registered(Role::Staff);
        assert_eq!(user.status, UserStatus::Approved);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.version, 1);
    }

    #[test]
    fn manager_starts_pending() {
        assert_eq!(registered(Role::Manager).status, UserStatus::Pending);
    }

    #[test]
    fn admin_cannot_self_register() {
        let id = UserId::new();
        let err = User::empty(id).handle(&register(id, Role::Admin)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn invalid_email_and_short_username_are_rejected() {
        let id = UserId::new();
        let user = User::empty(id);

        let mut bad_email = register(id, Role::Staff);
        if let UserCommand::Register(c) = &mut bad_email {
            c.email = "not-an-email".to_string();
        }
        assert!(matches!(user.handle(&bad_email), Err(DomainError::Validation(_))));

        let mut short = register(id, Role::Staff);
        if let UserCommand::Register(c) = &mut short {
            c.username = "al".to_string();
        }
        assert!(matches!(user.handle(&short), Err(DomainError::Validation(_))));
    }

    #[test]
    fn approve_then_reject_manager() {
        let mut user = registered(Role::Manager);
        let id = user.id;
        execute(
            &mut user,
            &UserCommand::ChangeStatus(ChangeUserStatus { user_id: id, status: UserStatus::Approved, occurred_at: now() }),
        )
        .unwrap();
        assert_eq!(user.status, UserStatus::Approved);

        let events = execute(
            &mut user,
            &UserCommand::ChangeStatus(ChangeUserStatus { user_id: id, status: UserStatus::Rejected, occurred_at: now() }),
        )
        .unwrap();
        let UserEvent::StatusChanged(e) = &events[0] else {
            panic!("expected status change");
        };
        assert_eq!((e.from, e.to), (UserStatus::Approved, UserStatus::Rejected));
    }

    #[test]
    fn unchanged_status_emits_nothing() {
        let user = registered(Role::Staff);
        let events = user
            .handle(&UserCommand::ChangeStatus(ChangeUserStatus {
                user_id: user.id,
                status: UserStatus::Approved,
                occurred_at: now(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn admin_is_protected_from_status_change_and_delete() {
        let admin = registered(Role::Admin);
        let status = admin.handle(&UserCommand::ChangeStatus(ChangeUserStatus {
            user_id: admin.id,
            status: UserStatus::Rejected,
            occurred_at: now(),
        }));
        assert_eq!(status, Err(DomainError::invariant("Cannot modify admin user status")));

        let delete = admin.handle(&UserCommand::Delete(DeleteUser { user_id: admin.id, occurred_at: now() }));
        assert_eq!(delete, Err(DomainError::invariant("Cannot delete admin user")));
    }

    #[test]
    fn deleted_user_rejects_further_commands() {
        let mut user = registered(Role::Staff);
        let id = user.id;
        execute(&mut user, &UserCommand::Delete(DeleteUser { user_id: id, occurred_at: now() })).unwrap();

        let result = user.handle(&UserCommand::ChangePassword(ChangePassword {
            user_id: id,
            password_hash: "$argon2id$new".to_string(),
            occurred_at: now(),
        }));
        assert_eq!(result, Err(DomainError::NotFound));
    }

    #[test]
    fn commands_on_unknown_user_are_not_found() {
        let id = UserId::new();
        let result = User::empty(id).handle(&UserCommand::Delete(DeleteUser { user_id: id, occurred_at: now() }));
        assert_eq!(result, Err(DomainError::NotFound));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn registered_email_is_always_normalized(local in "[A-Za-z0-9]{1,10}", domain in "[A-Za-z]{1,8}") {
            let id = UserId::new();
            let cmd = UserCommand::Register(RegisterUser {
                user_id: id,
                username: "someone".to_string(),
                email: format!(" {local}@{domain}.Com "),
                password_hash: "h".to_string(),
                role: Role::Staff,
                allow_admin: false,
                occurred_at: now(),
            });
            let events = User::empty(id).handle(&cmd).unwrap();
            let UserEvent::Registered(e) = &events[0] else { panic!("expected registration") };
            prop_assert_eq!(&e.email, &e.email.trim().to_lowercase());
        }
    }
}
