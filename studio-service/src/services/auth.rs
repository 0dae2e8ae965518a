use crate::{
    models::{CurrentUser, NewUser, RefreshToken, User},
    services::{metrics::record_auth_event, AuthStore, JwtService, ServiceError},
    utils::{hash_password, verify_against_dummy, verify_password, Password, PasswordHashString},
};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use uuid::Uuid;

/// Minimum spacing between expired refresh-token sweeps.
const SWEEP_INTERVAL_SECS: i64 = 60;

/// Opaque token pair handed to the cookie adapter.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, rotates and invalidates sessions.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    jwt: JwtService,
    /// Unix seconds of the last sweep, shared by all clones.
    last_sweep: Arc<AtomicI64>,
}

impl AuthService {
    pub fn new(store: Arc<dyn AuthStore>, jwt: JwtService) -> Self {
        Self {
            store,
            jwt,
            last_sweep: Arc::new(AtomicI64::new(i64::MIN)),
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Hashes the password and stores a new non-admin account. The admin
    /// flag is only granted through an authenticated user update.
    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<User, ServiceError> {
        let password_hash = hash_password(&Password::new(password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let user = self
            .store
            .insert_user(NewUser {
                name,
                email,
                password_hash: password_hash.into_string(),
                admin: false,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Returns the user when the password matches. Unknown email and wrong
    /// password both yield `None` after one Argon2 verification.
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, ServiceError> {
        let password = Password::new(password.to_string());

        let Some(user) = self.store.find_user_by_email(email).await? else {
            verify_against_dummy(&password);
            return Ok(None);
        };

        match verify_password(&password, &PasswordHashString::new(user.password_hash.clone())) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Stored password hash is unusable");
                Ok(None)
            }
        }
    }

    /// Persists a new refresh-token row and mints the token pair bound to it.
    pub async fn login(&self, user: &User) -> Result<SessionTokens, ServiceError> {
        let (tokens, row) = self.mint(user.id, &user.email)?;
        self.store.insert_refresh_token(&row).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(tokens)
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, SessionTokens), ServiceError> {
        let Some(user) = self.validate_credentials(email, password).await? else {
            record_auth_event("login", "rejected");
            return Err(ServiceError::InvalidCredentials);
        };
        let tokens = self.login(&user).await?;
        record_auth_event("login", "success");
        Ok((user, tokens))
    }

    /// Single-use rotation of a refresh token.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<SessionTokens, ServiceError> {
        let presented = presented.ok_or(ServiceError::MissingToken)?;

        let claims = self
            .jwt
            .validate_refresh_token(presented)
            .map_err(|_| ServiceError::InvalidToken)?;

        self.sweep_expired();

        let user_id: i64 = claims.sub.parse().map_err(|_| ServiceError::InvalidToken)?;
        let token_id = Uuid::parse_str(&claims.jti).map_err(|_| ServiceError::InvalidToken)?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let (tokens, replacement) = self.mint(user.id, &user.email)?;

        let rotated = self
            .store
            .rotate_refresh_token(
                token_id,
                user.id,
                &RefreshToken::hash_token(presented),
                &replacement,
            )
            .await?;

        if !rotated {
            tracing::warn!(user_id = user.id, token_id = %token_id, "Refresh token reuse rejected");
            record_auth_event("refresh", "reused");
            return Err(ServiceError::TokenReused);
        }

        tracing::info!(user_id = user.id, "Token refreshed for user");
        record_auth_event("refresh", "success");
        Ok(tokens)
    }

    /// Best-effort revoke of the presented refresh token. Never fails.
    pub async fn logout(&self, presented: Option<&str>) {
        let Some(presented) = presented else {
            return;
        };

        let claims = match self.jwt.validate_refresh_token(presented) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Logout with unusable refresh token");
                return;
            }
        };

        let Ok(token_id) = Uuid::parse_str(&claims.jti) else {
            return;
        };

        match self
            .store
            .revoke_refresh_token(token_id, &RefreshToken::hash_token(presented))
            .await
        {
            Ok(true) => {
                tracing::info!(user_id = %claims.sub, "User logged out");
                record_auth_event("logout", "revoked");
            }
            Ok(false) => tracing::debug!(user_id = %claims.sub, "Refresh token already inactive"),
            Err(e) => tracing::warn!(user_id = %claims.sub, error = %e, "Failed to revoke refresh token"),
        }
    }

    pub async fn current_user(&self, access_token: Option<&str>) -> Result<CurrentUser, ServiceError> {
        let access_token = access_token.ok_or(ServiceError::InvalidToken)?;
        self.resolve_access_token(access_token).await
    }

    /// Verifies an access token and resolves its subject to a live user.
    pub async fn resolve_access_token(&self, token: &str) -> Result<CurrentUser, ServiceError> {
        let claims = self
            .jwt
            .validate_access_token(token)
            .map_err(|_| ServiceError::InvalidToken)?;
        let user_id: i64 = claims.sub.parse().map_err(|_| ServiceError::InvalidToken)?;

        self.store
            .find_user_by_id(user_id)
            .await?
            .map(|user| user.identity())
            .ok_or(ServiceError::UserNotFound)
    }

    fn mint(&self, user_id: i64, email: &str) -> Result<(SessionTokens, RefreshToken), ServiceError> {
        let token_id = Uuid::new_v4();

        let access_token = self
            .jwt
            .generate_access_token(user_id, email)
            .map_err(ServiceError::Internal)?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(user_id, email, token_id)
            .map_err(ServiceError::Internal)?;

        let row = RefreshToken::new(
            token_id,
            user_id,
            &refresh_token,
            self.jwt.refresh_token_lifetime(),
        );

        Ok((
            SessionTokens {
                access_token,
                refresh_token,
            },
            row,
        ))
    }

    /// Claims the sweep slot for `now`. At most one caller wins per interval.
    fn claim_sweep(&self, now: i64) -> bool {
        let last = self.last_sweep.load(Ordering::Acquire);
        if now.saturating_sub(last) < SWEEP_INTERVAL_SECS {
            return false;
        }
        self.last_sweep
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn sweep_expired(&self) {
        if !self.claim_sweep(chrono::Utc::now().timestamp()) {
            return;
        }

        let store = self.store.clone();
        tokio::spawn(async move {
            match store.delete_expired_refresh_tokens().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Swept expired refresh tokens"),
                Err(e) => tracing::warn!(error = %e, "Expired refresh token sweep failed"),
            }
        });
    }
}
