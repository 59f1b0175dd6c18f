//! Process Settings
//!
//! Everything the binary reads from the environment (after `.env`), turned
//! into the crate-level configs. Debug builds fall back to development
//! defaults; release builds refuse to start without the secrets.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::AuthConfig;
use auth::config::{OAuthClientCredentials, OAuthSettings};
use axum::http::HeaderValue;
use base64::Engine;
use base64::engine::general_purpose;
use platform::client::TrustedProxies;
use platform::mail::{SmtpSecurity, SmtpSettings};
use profile::ProfileConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";
const JWT_SECRET_MIN_BYTES: usize = 32;

pub struct AppSettings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<HeaderValue>,
    pub auth: AuthConfig,
    pub profile: ProfileConfig,
    /// `None` sends mail to the log
    pub smtp: Option<SmtpSettings>,
    pub maintenance_interval: Duration,
}

impl AppSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = parse_or("BIND_ADDR", DEFAULT_BIND_ADDR)?;

        let frontend_origins = optional("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();

        Ok(Self {
            database_url,
            bind_addr,
            frontend_origins,
            auth: auth_config()?,
            profile: profile_config(),
            smtp: smtp_settings()?,
            maintenance_interval: Duration::from_secs(parse_or("MAINTENANCE_INTERVAL_SECS", "300")?),
        })
    }
}

fn auth_config() -> anyhow::Result<AuthConfig> {
    let mut config = if cfg!(debug_assertions) {
        AuthConfig::development()
    } else {
        AuthConfig::default()
    };

    match optional("JWT_SECRET") {
        Some(secret) => {
            let secret = decode_base64("JWT_SECRET", &secret)?;
            if secret.len() < JWT_SECRET_MIN_BYTES {
                bail!("JWT_SECRET must decode to at least {JWT_SECRET_MIN_BYTES} bytes");
            }
            config.jwt_secret = secret;
        }
        None if cfg!(debug_assertions) => {
            tracing::warn!("JWT_SECRET not set, using a random secret; tokens die with the process");
        }
        None => bail!("JWT_SECRET must be set in production"),
    }

    if let Some(pepper) = optional("PASSWORD_PEPPER") {
        config.password_pepper = Some(decode_base64("PASSWORD_PEPPER", &pepper)?);
    }
    if let Some(url) = optional("FRONTEND_URL") {
        config.frontend_url = url;
    }
    if let Some(proxies) = optional("TRUSTED_PROXIES") {
        config.trusted_proxies = TrustedProxies::parse_list(&proxies)
            .with_context(|| format!("Invalid TRUSTED_PROXIES value: {proxies}"))?;
    }

    config.oauth = OAuthSettings {
        redirect_base: optional("OAUTH_REDIRECT_BASE").unwrap_or_else(|| config.frontend_url.clone()),
        google: oauth_client("GOOGLE"),
        discord: oauth_client("DISCORD"),
    };

    Ok(config)
}

fn oauth_client(prefix: &str) -> Option<OAuthClientCredentials> {
    let client_id = optional(&format!("{prefix}_CLIENT_ID"))?;
    let Some(client_secret) = optional(&format!("{prefix}_CLIENT_SECRET")) else {
        tracing::warn!("{prefix}_CLIENT_ID is set without {prefix}_CLIENT_SECRET; provider disabled");
        return None;
    };
    Some(OAuthClientCredentials {
        client_id,
        client_secret,
    })
}

fn profile_config() -> ProfileConfig {
    let mut config = if cfg!(debug_assertions) {
        ProfileConfig::development()
    } else {
        ProfileConfig::default()
    };

    if let Some(dir) = optional("MEDIA_DIR") {
        config.media_dir = PathBuf::from(dir);
    }
    if let Some(api_url) = optional("PUBLIC_API_URL") {
        config.media_base_url = format!("{}/media", api_url.trim_end_matches('/'));
    }
    config
}

fn smtp_settings() -> anyhow::Result<Option<SmtpSettings>> {
    let Some(host) = optional("SMTP_HOST") else {
        return Ok(None);
    };

    let port: u16 = parse_or("SMTP_PORT", "587")?;
    let security = match port {
        465 => SmtpSecurity::Tls,
        25 | 1025 => SmtpSecurity::None,
        _ => SmtpSecurity::StartTls,
    };

    Ok(Some(SmtpSettings {
        host,
        port,
        username: optional("SMTP_USERNAME"),
        password: optional("SMTP_PASSWORD"),
        security,
        from: optional("MAIL_FROM").context("MAIL_FROM must be set when SMTP_HOST is")?,
    }))
}

/// Unset and empty are the same
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = optional(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

fn decode_base64(key: &str, value: &str) -> anyhow::Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value)
        .with_context(|| format!("{key} must be base64"))
}
