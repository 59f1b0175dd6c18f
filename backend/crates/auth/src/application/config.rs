//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::client::TrustedProxies;
use platform::cookie::CookieConfig;
use platform::rate_limit::RateLimitConfig;

pub use platform::cookie::SameSite;

use crate::domain::entity::OAuthProvider;

/// OAuth client registered with one provider
#[derive(Debug, Clone)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Default)]
pub struct OAuthSettings {
    /// Frontend origin the provider redirects back to; the callback page
    /// lives at `{redirect_base}/oauth/{provider}/callback`
    pub redirect_base: String,
    pub google: Option<OAuthClientCredentials>,
    pub discord: Option<OAuthClientCredentials>,
}

impl OAuthSettings {
    pub fn credentials(&self, provider: OAuthProvider) -> Option<&OAuthClientCredentials> {
        match provider {
            OAuthProvider::Google => self.google.as_ref(),
            OAuthProvider::Discord => self.discord.as_ref(),
        }
    }

    pub fn redirect_uri(&self, provider: OAuthProvider) -> String {
        format!(
            "{}/oauth/{}/callback",
            self.redirect_base.trim_end_matches('/'),
            provider.code()
        )
    }
}

/// Per-scope request limits, keyed by client IP
#[derive(Debug, Clone)]
pub struct AuthRateLimits {
    pub sign_in: RateLimitConfig,
    pub sign_up: RateLimitConfig,
    pub password_reset: RateLimitConfig,
    pub oauth: RateLimitConfig,
}

impl Default for AuthRateLimits {
    fn default() -> Self {
        Self {
            sign_in: RateLimitConfig::new(10, 60),
            sign_up: RateLimitConfig::new(5, 60),
            password_reset: RateLimitConfig::new(5, 15 * 60),
            oauth: RateLimitConfig::new(20, 60),
        }
    }
}

impl AuthRateLimits {
    /// Longest window; rows older than this can be dropped
    pub fn longest_window(&self) -> Duration {
        [
            &self.sign_in,
            &self.sign_up,
            &self.password_reset,
            &self.oauth,
        ]
        .iter()
        .map(|c| c.window)
        .max()
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 key for access tokens and two-factor tickets (at least 32 bytes)
    pub jwt_secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub two_factor_ticket_ttl: Duration,
    /// Lifetime of the ticket a Moderator+ without 2FA uses to enroll
    pub enrollment_ticket_ttl: Duration,
    /// Refresh session TTL without "Remember Me" (12 hours)
    pub refresh_ttl_short: Duration,
    /// Refresh session TTL with "Remember Me" (30 days)
    pub refresh_ttl_long: Duration,
    pub refresh_cookie_name: String,
    /// The cookie is only sent to the auth routes
    pub refresh_cookie_path: String,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Application-wide secret mixed into password hashes
    pub password_pepper: Option<Vec<u8>>,
    /// Query HIBP when a password is set
    pub check_breached_passwords: bool,
    /// Shown in authenticator apps
    pub totp_issuer: String,
    pub hold_ttl: Duration,
    pub oauth_state_ttl: Duration,
    pub password_reset_ttl: Duration,
    pub email_change_ttl: Duration,
    /// Time between scheduling and purging an account
    pub deletion_grace: Duration,
    /// Base URL for links in mails
    pub frontend_url: String,
    pub oauth: OAuthSettings,
    pub rate_limits: AuthRateLimits,
    /// Proxies whose forwarding headers name the client for rate limiting
    pub trusted_proxies: TrustedProxies,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            access_token_ttl: Duration::from_secs(15 * 60),
            two_factor_ticket_ttl: Duration::from_secs(5 * 60),
            enrollment_ticket_ttl: Duration::from_secs(10 * 60),
            refresh_ttl_short: Duration::from_secs(12 * 3600),
            refresh_ttl_long: Duration::from_secs(30 * 24 * 3600),
            refresh_cookie_name: "refresh_token".to_string(),
            refresh_cookie_path: "/api/auth".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            check_breached_passwords: true,
            totp_issuer: "Circle".to_string(),
            hold_ttl: Duration::from_secs(30 * 60),
            oauth_state_ttl: Duration::from_secs(10 * 60),
            password_reset_ttl: Duration::from_secs(3600),
            email_change_ttl: Duration::from_secs(3600),
            deletion_grace: Duration::from_secs(30 * 24 * 3600),
            frontend_url: "http://localhost:5173".to_string(),
            oauth: OAuthSettings::default(),
            rate_limits: AuthRateLimits::default(),
            trusted_proxies: TrustedProxies::default(),
        }
    }
}

impl AuthConfig {
    pub fn with_random_secret() -> Self {
        Self {
            jwt_secret: platform::crypto::random_bytes(32),
            ..Default::default()
        }
    }

    /// Insecure cookie, no breach lookups
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            check_breached_passwords: false,
            ..Self::with_random_secret()
        }
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn refresh_ttl(&self, remember_me: bool) -> chrono::Duration {
        let ttl = if remember_me {
            self.refresh_ttl_long
        } else {
            self.refresh_ttl_short
        };
        to_chrono(ttl)
    }

    pub fn refresh_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.refresh_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: self.refresh_cookie_path.clone(),
            max_age_secs: None,
        }
    }

    /// Absolute link into the frontend
    pub fn frontend_link(&self, path: &str, token: &str) -> String {
        format!(
            "{}/{}?token={}",
            self.frontend_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            token
        )
    }
}

pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_ttl() {
        let config = AuthConfig::default();
        assert_eq!(config.refresh_ttl(false), chrono::Duration::hours(12));
        assert_eq!(config.refresh_ttl(true), chrono::Duration::days(30));
    }

    #[test]
    fn test_development_has_usable_secret() {
        let config = AuthConfig::development();
        assert_eq!(config.jwt_secret.len(), 32);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_frontend_link() {
        let config = AuthConfig {
            frontend_url: "https://app.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.frontend_link("/reset-password", "abc"),
            "https://app.example.com/reset-password?token=abc"
        );
    }

    #[test]
    fn test_redirect_uri() {
        let settings = OAuthSettings {
            redirect_base: "https://app.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.redirect_uri(OAuthProvider::Discord),
            "https://app.example.com/oauth/discord/callback"
        );
        assert!(settings.credentials(OAuthProvider::Google).is_none());
    }

    #[test]
    fn test_longest_window() {
        assert_eq!(
            AuthRateLimits::default().longest_window(),
            Duration::from_secs(900)
        );
    }
}
