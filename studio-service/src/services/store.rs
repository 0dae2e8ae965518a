//! Persistence seam for the session lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::ServiceError;
use crate::models::{NewUser, RefreshToken, RefreshTokenState, User};

/// User and refresh-token storage used by `AuthService` and the request
/// authenticator.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, ServiceError>;

    /// Fails with `EmailAlreadyRegistered` when the email is taken (case-insensitive).
    async fn insert_user(&self, user: NewUser) -> Result<User, ServiceError>;

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), ServiceError>;

    /// Atomically moves `old_token_id` from Active to Rotated and inserts
    /// `replacement`.
    ///
    /// The transition only happens if the row exists, belongs to `user_id`,
    /// carries `presented_hash`, is Active and unexpired. Returns `false`
    /// without writing anything otherwise; at most one of several concurrent
    /// callers presenting the same token gets `true`.
    async fn rotate_refresh_token(
        &self,
        old_token_id: Uuid,
        user_id: i64,
        presented_hash: &str,
        replacement: &RefreshToken,
    ) -> Result<bool, ServiceError>;

    /// Conditional Active -> Revoked. Returns whether a row changed.
    async fn revoke_refresh_token(
        &self,
        token_id: Uuid,
        presented_hash: &str,
    ) -> Result<bool, ServiceError>;

    /// Deletes rows past their expiry. Returns the number removed.
    async fn delete_expired_refresh_tokens(&self) -> Result<u64, ServiceError>;
}

#[derive(Default)]
struct InMemoryState {
    users: HashMap<i64, User>,
    next_user_id: i64,
    refresh_tokens: HashMap<Uuid, RefreshToken>,
}

/// Process-local `AuthStore`, used by tests and local tooling.
///
/// A single mutex guards all state, so rotation is atomic with respect to
/// every other store call.
#[derive(Default)]
pub struct InMemoryAuthStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, ServiceError> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Auth store mutex poisoned: {}", e)))
    }

    /// Snapshot of a stored refresh-token row.
    pub fn refresh_token(&self, token_id: Uuid) -> Option<RefreshToken> {
        self.lock()
            .ok()
            .and_then(|state| state.refresh_tokens.get(&token_id).cloned())
    }

    pub fn refresh_token_count(&self) -> usize {
        self.lock().map(|state| state.refresh_tokens.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AuthStore for InMemoryAuthStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, ServiceError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, ServiceError> {
        let mut state = self.lock()?;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let stored = User {
            id: state.next_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            admin: user.admin,
            created_utc: now,
            updated_utc: now,
        };
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), ServiceError> {
        self.lock()?
            .refresh_tokens
            .insert(token.token_id, token.clone());
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        old_token_id: Uuid,
        user_id: i64,
        presented_hash: &str,
        replacement: &RefreshToken,
    ) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;

        let Some(current) = state.refresh_tokens.get_mut(&old_token_id) else {
            return Ok(false);
        };
        if current.user_id != user_id || !current.matches_hash(presented_hash) || !current.is_active()
        {
            return Ok(false);
        }

        current.transition(RefreshTokenState::Rotated);
        state
            .refresh_tokens
            .insert(replacement.token_id, replacement.clone());
        Ok(true)
    }

    async fn revoke_refresh_token(
        &self,
        token_id: Uuid,
        presented_hash: &str,
    ) -> Result<bool, ServiceError> {
        let mut state = self.lock()?;
        match state.refresh_tokens.get_mut(&token_id) {
            Some(row) if row.is_active() && row.matches_hash(presented_hash) => {
                row.transition(RefreshTokenState::Revoked);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, ServiceError> {
        let mut state = self.lock()?;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, row| !row.is_expired());
        Ok((before - state.refresh_tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            admin: false,
        }
    }

    fn row(user_id: i64, token: &str) -> RefreshToken {
        RefreshToken::new(Uuid::new_v4(), user_id, token, Duration::days(7))
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = InMemoryAuthStore::new();
        store.insert_user(new_user("ana@example.com")).await.unwrap();

        let err = store.insert_user(new_user("ANA@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn user_ids_are_assigned_sequentially() {
        let store = InMemoryAuthStore::new();
        let a = store.insert_user(new_user("a@x.com")).await.unwrap();
        let b = store.insert_user(new_user("b@x.com")).await.unwrap();
        assert_eq!(b.id, a.id + 1);
        assert_eq!(
            store.find_user_by_email("B@X.COM").await.unwrap().map(|u| u.id),
            Some(b.id)
        );
    }

    #[tokio::test]
    async fn rotation_succeeds_once() {
        let store = InMemoryAuthStore::new();
        let old = row(1, "old");
        store.insert_refresh_token(&old).await.unwrap();
        let hash = RefreshToken::hash_token("old");

        assert!(store
            .rotate_refresh_token(old.token_id, 1, &hash, &row(1, "new-1"))
            .await
            .unwrap());
        assert!(!store
            .rotate_refresh_token(old.token_id, 1, &hash, &row(1, "new-2"))
            .await
            .unwrap());

        assert_eq!(
            store.refresh_token(old.token_id).unwrap().state(),
            RefreshTokenState::Rotated
        );
        assert_eq!(store.refresh_token_count(), 2);
    }

    #[tokio::test]
    async fn rotation_rejects_wrong_owner_hash_or_expired_row() {
        let store = InMemoryAuthStore::new();
        let old = row(1, "old");
        store.insert_refresh_token(&old).await.unwrap();
        let hash = RefreshToken::hash_token("old");

        assert!(!store
            .rotate_refresh_token(old.token_id, 2, &hash, &row(2, "x"))
            .await
            .unwrap());
        assert!(!store
            .rotate_refresh_token(old.token_id, 1, &RefreshToken::hash_token("forged"), &row(1, "x"))
            .await
            .unwrap());

        let mut expired = row(1, "stale");
        expired.expiry_utc = Utc::now() - Duration::seconds(1);
        store.insert_refresh_token(&expired).await.unwrap();
        assert!(!store
            .rotate_refresh_token(
                expired.token_id,
                1,
                &RefreshToken::hash_token("stale"),
                &row(1, "x")
            )
            .await
            .unwrap());

        // Only the two seeded rows; no replacement was inserted.
        assert_eq!(store.refresh_token_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rotation_has_a_single_winner() {
        let store = Arc::new(InMemoryAuthStore::new());
        let old = row(1, "contended");
        store.insert_refresh_token(&old).await.unwrap();
        let old_id = old.token_id;
        let hash = RefreshToken::hash_token("contended");

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let hash = hash.clone();
            handles.push(tokio::spawn(async move {
                store
                    .rotate_refresh_token(old_id, 1, &hash, &row(1, &format!("next-{}", i)))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn revoke_only_touches_active_rows() {
        let store = InMemoryAuthStore::new();
        let live = row(1, "live");
        store.insert_refresh_token(&live).await.unwrap();
        let hash = RefreshToken::hash_token("live");

        assert!(store.revoke_refresh_token(live.token_id, &hash).await.unwrap());
        assert!(!store.revoke_refresh_token(live.token_id, &hash).await.unwrap());
        assert!(!store.revoke_refresh_token(Uuid::new_v4(), &hash).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let store = InMemoryAuthStore::new();
        store.insert_refresh_token(&row(1, "fresh")).await.unwrap();
        let mut stale = row(1, "stale");
        stale.expiry_utc = Utc::now() - Duration::hours(1);
        store.insert_refresh_token(&stale).await.unwrap();

        assert_eq!(store.delete_expired_refresh_tokens().await.unwrap(), 1);
        assert_eq!(store.refresh_token_count(), 1);
        assert!(store.refresh_token(stale.token_id).is_none());
    }
}
