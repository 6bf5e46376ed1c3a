use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use stockroom_auth::{Role, USER_AGGREGATE_TYPE, UserEvent, UserStatus, normalize_email};
use stockroom_core::UserId;
use stockroom_events::{EventEnvelope, EventSubscriber, SubscriberError};

use super::cursor::StreamCursors;
use super::{ProjectionError, newest_first};
use crate::read_model::{InMemoryStore, KeyedStore};

/// Account read model. The password hash stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub position: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Debug)]
pub struct UsersProjection<S = InMemoryStore<UserId, UserView>> {
    store: S,
    cursors: StreamCursors,
}

impl UsersProjection {
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S> UsersProjection<S>
where
    S: KeyedStore<UserId, UserView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != USER_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.admit(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: UserEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let user_id = match &ev {
            UserEvent::Registered(e) => e.user_id,
            UserEvent::StatusChanged(e) => e.user_id,
            UserEvent::PasswordChanged(e) => e.user_id,
            UserEvent::Deleted(e) => e.user_id,
        };
        if user_id.as_uuid() != aggregate_id.as_uuid() {
            return Err(ProjectionError::StreamMismatch(
                "event user_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            UserEvent::Registered(e) => {
                self.store.upsert(
                    user_id,
                    UserView {
                        id: user_id,
                        username: e.username,
                        email: e.email,
                        password_hash: e.password_hash,
                        role: e.role,
                        status: e.status,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                        position: envelope.global_position(),
                    },
                );
            }
            UserEvent::StatusChanged(e) => {
                let mut view = self.existing(&user_id)?;
                view.status = e.to;
                view.updated_at = e.occurred_at;
                self.store.upsert(user_id, view);
            }
            UserEvent::PasswordChanged(e) => {
                let mut view = self.existing(&user_id)?;
                view.password_hash = e.password_hash;
                view.updated_at = e.occurred_at;
                self.store.upsert(user_id, view);
            }
            UserEvent::Deleted(_) => {
                self.store.remove(&user_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn existing(&self, user_id: &UserId) -> Result<UserView, ProjectionError> {
        self.store
            .get(user_id)
            .ok_or_else(|| ProjectionError::MissingView(format!("user {user_id}")))
    }

    pub fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }

    pub fn get(&self, user_id: &UserId) -> Option<UserView> {
        self.store.get(user_id)
    }

    pub fn by_email(&self, email: &str) -> Option<UserView> {
        let email = normalize_email(email);
        self.store.list().into_iter().find(|u| u.email == email)
    }

    pub fn by_username(&self, username: &str) -> Option<UserView> {
        let username = username.trim();
        self.store
            .list()
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// All users, newest first.
    pub fn list(&self) -> Vec<UserView> {
        let mut all = self.store.list();
        newest_first(&mut all, |u| u.position);
        all
    }

    pub fn pending(&self) -> Vec<UserView> {
        let mut out: Vec<UserView> = self
            .store
            .list()
            .into_iter()
            .filter(|u| u.status == UserStatus::Pending)
            .collect();
        newest_first(&mut out, |u| u.position);
        out
    }

    pub fn count_by_status(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for user in self.store.list() {
            match user.status {
                UserStatus::Pending => counts.pending += 1,
                UserStatus::Approved => counts.approved += 1,
                UserStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }
}

impl<S> EventSubscriber<EventEnvelope<JsonValue>> for UsersProjection<S>
where
    S: KeyedStore<UserId, UserView>,
{
    fn name(&self) -> &'static str {
        "users"
    }

    fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
        self.apply_envelope(message)
            .map_err(|e| e.into_subscriber_error(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;

    #[test]
    fn lookups_are_case_insensitive() {
        let h = Harness::new();
        let id = h.register_user("Alice", "Alice@Example.com", Role::Staff).unwrap();

        assert_eq!(h.users.by_email("  ALICE@example.com ").map(|u| u.id), Some(id));
        assert_eq!(h.users.by_username("alice").map(|u| u.id), Some(id));
        assert_eq!(h.users.get(&id).unwrap().status, UserStatus::Approved);
    }

    #[test]
    fn pending_and_counts() {
        let h = Harness::new();
        h.register_user("alice", "alice@example.com", Role::Staff).unwrap();
        let bob = h.register_user("bob", "bob@example.com", Role::Manager).unwrap();

        assert_eq!(h.users.pending().iter().map(|u| u.id).collect::<Vec<_>>(), vec![bob]);
        assert_eq!(
            h.users.count_by_status(),
            StatusCounts { pending: 1, approved: 1, rejected: 0 }
        );
        assert_eq!(h.users.list().first().map(|u| u.id), Some(bob));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let h = Harness::new();
        let id = h.register_user("alice", "alice@example.com", Role::Staff).unwrap();
        let json = serde_json::to_value(h.users.get(&id).unwrap()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "STAFF");
        assert_eq!(json["status"], "APPROVED");
    }
}
