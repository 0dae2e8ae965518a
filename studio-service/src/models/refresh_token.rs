use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Lifecycle of a refresh-token row.
///
/// Only `Active` rows may be rotated. `Expired` is never stored; it is
/// derived from an `Active` row whose expiry has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Rotated,
    Revoked,
    Expired,
}

impl RefreshTokenState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTokenState::Active => "active",
            RefreshTokenState::Rotated => "rotated",
            RefreshTokenState::Revoked => "revoked",
            RefreshTokenState::Expired => "expired",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "active" => Some(RefreshTokenState::Active),
            "rotated" => Some(RefreshTokenState::Rotated),
            "revoked" => Some(RefreshTokenState::Revoked),
            "expired" => Some(RefreshTokenState::Expired),
            _ => None,
        }
    }
}

/// Server-side record for one outstanding refresh token.
///
/// `token_id` is the `jti` of the signed refresh token; `token_hash` is the
/// SHA-256 of the full signed string.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token_id: Uuid,
    pub user_id: i64,
    pub token_hash: String,
    pub state_code: String,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub state_changed_utc: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn new(token_id: Uuid, user_id: i64, token: &str, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            token_id,
            user_id,
            token_hash: Self::hash_token(token),
            state_code: RefreshTokenState::Active.as_str().to_string(),
            expiry_utc: now + lifetime,
            created_utc: now,
            state_changed_utc: None,
        }
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiry_utc
    }

    pub fn state(&self) -> RefreshTokenState {
        match RefreshTokenState::from_code(&self.state_code) {
            Some(RefreshTokenState::Active) if self.is_expired() => RefreshTokenState::Expired,
            Some(state) => state,
            None => RefreshTokenState::Revoked,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == RefreshTokenState::Active
    }

    /// Constant-time comparison against a presented token hash.
    pub fn matches_hash(&self, presented_hash: &str) -> bool {
        self.token_hash
            .as_bytes()
            .ct_eq(presented_hash.as_bytes())
            .into()
    }

    pub fn transition(&mut self, to: RefreshTokenState) {
        self.state_code = to.as_str().to_string();
        self.state_changed_utc = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> RefreshToken {
        RefreshToken::new(Uuid::new_v4(), 1, "signed.refresh.token", Duration::days(7))
    }

    #[test]
    fn new_row_is_active_and_hashed() {
        let row = token();
        assert!(row.is_active());
        assert_ne!(row.token_hash, "signed.refresh.token");
        assert_eq!(row.token_hash.len(), 64);
        assert!(row.matches_hash(&RefreshToken::hash_token("signed.refresh.token")));
        assert!(!row.matches_hash(&RefreshToken::hash_token("other")));
    }

    #[test]
    fn active_row_past_expiry_reads_as_expired() {
        let mut row = token();
        row.expiry_utc = Utc::now() - Duration::seconds(1);
        assert_eq!(row.state(), RefreshTokenState::Expired);
        assert!(!row.is_active());
    }

    #[test]
    fn rotated_and_revoked_rows_are_not_active() {
        let mut row = token();
        row.transition(RefreshTokenState::Rotated);
        assert_eq!(row.state(), RefreshTokenState::Rotated);
        assert!(row.state_changed_utc.is_some());

        let mut row = token();
        row.transition(RefreshTokenState::Revoked);
        assert!(!row.is_active());
    }

    #[test]
    fn unknown_state_code_fails_closed() {
        let mut row = token();
        row.state_code = "garbage".to_string();
        assert_eq!(row.state(), RefreshTokenState::Revoked);
    }
}
