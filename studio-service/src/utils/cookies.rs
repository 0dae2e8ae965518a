//! Cookie transport for session tokens.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::StudioConfig;
use crate::services::SessionTokens;

pub const ACCESS_TOKEN_COOKIE: &str = "auth-token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh-token";

/// Attributes applied to both session cookies.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    secure: bool,
    same_site: SameSite,
    access_max_age_seconds: i64,
    refresh_max_age_seconds: i64,
}

impl CookiePolicy {
    pub fn from_config(config: &StudioConfig) -> Self {
        // Cross-site SPA in production needs SameSite=None, which requires Secure.
        let (secure, same_site) = if config.is_prod() {
            (true, SameSite::None)
        } else {
            (false, SameSite::Strict)
        };

        Self {
            secure,
            same_site,
            access_max_age_seconds: config.jwt.access_token_expiry_minutes * 60,
            refresh_max_age_seconds: config.jwt.refresh_token_expiry_days * 24 * 60 * 60,
        }
    }

    fn build(&self, name: &'static str, value: String, max_age_seconds: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path("/")
            .max_age(time::Duration::seconds(max_age_seconds))
            .build()
    }

    /// Sets both session cookies.
    pub fn attach(&self, jar: CookieJar, tokens: &SessionTokens) -> CookieJar {
        jar.add(self.build(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            self.access_max_age_seconds,
        ))
        .add(self.build(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            self.refresh_max_age_seconds,
        ))
    }

    /// Overwrites both session cookies with expired, empty values.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(ACCESS_TOKEN_COOKIE, String::new(), 0))
            .add(self.build(REFRESH_TOKEN_COOKIE, String::new(), 0))
    }
}

/// Reads a non-empty cookie value.
pub fn read_token(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
