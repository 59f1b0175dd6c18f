//! OAuth Provider Gateway
//!
//! Authorization-code flow against Google and Discord over `reqwest`.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::application::config::{OAuthClientCredentials, OAuthSettings};
use crate::domain::entity::{OAuthIdentity, OAuthProvider};
use crate::domain::gateway::OAuthGateway;
use crate::error::{AuthError, AuthResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

struct Endpoints {
    authorize: &'static str,
    token: &'static str,
    identity: &'static str,
    scope: &'static str,
}

const fn endpoints(provider: OAuthProvider) -> Endpoints {
    match provider {
        OAuthProvider::Google => Endpoints {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth",
            token: "https://oauth2.googleapis.com/token",
            identity: "https://openidconnect.googleapis.com/v1/userinfo",
            scope: "openid email profile",
        },
        OAuthProvider::Discord => Endpoints {
            authorize: "https://discord.com/oauth2/authorize",
            token: "https://discord.com/api/oauth2/token",
            identity: "https://discord.com/api/users/@me",
            scope: "identify email",
        },
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

impl From<GoogleUserInfo> for OAuthIdentity {
    fn from(info: GoogleUserInfo) -> Self {
        Self {
            provider_user_id: info.sub,
            email: info.email,
            email_verified: info.email_verified,
            display_name: info.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    global_name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    verified: bool,
}

impl From<DiscordUser> for OAuthIdentity {
    fn from(user: DiscordUser) -> Self {
        Self {
            provider_user_id: user.id,
            email: user.email,
            email_verified: user.verified,
            display_name: Some(user.global_name.unwrap_or(user.username)),
        }
    }
}

/// Talks to the real providers
#[derive(Clone)]
pub struct HttpOAuthGateway {
    client: Client,
    settings: OAuthSettings,
}

impl HttpOAuthGateway {
    pub fn new(settings: OAuthSettings) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    fn credentials(&self, provider: OAuthProvider) -> AuthResult<&OAuthClientCredentials> {
        self.settings
            .credentials(provider)
            .ok_or(AuthError::OAuthProviderNotConfigured)
    }

    async fn exchange_code(&self, provider: OAuthProvider, code: &str) -> AuthResult<String> {
        let credentials = self.credentials(provider)?;
        let redirect_uri = self.settings.redirect_uri(provider);

        let response = self
            .client
            .post(endpoints(provider).token)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::OAuthProviderError(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::OAuthProviderError(format!(
                "{provider} token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::OAuthProviderError(format!("Invalid token response: {e}")))?;

        Ok(token.access_token)
    }
}

impl OAuthGateway for HttpOAuthGateway {
    fn is_configured(&self, provider: OAuthProvider) -> bool {
        self.settings.credentials(provider).is_some()
    }

    fn authorization_url(&self, provider: OAuthProvider, state: &str) -> AuthResult<String> {
        let credentials = self.credentials(provider)?;
        let endpoints = endpoints(provider);
        let redirect_uri = self.settings.redirect_uri(provider);

        let url = Url::parse_with_params(
            endpoints.authorize,
            &[
                ("response_type", "code"),
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", endpoints.scope),
                ("state", state),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::Internal(format!("Invalid authorization URL: {e}")))?;

        Ok(url.into())
    }

    async fn fetch_identity(&self, provider: OAuthProvider, code: &str) -> AuthResult<OAuthIdentity> {
        let access_token = self.exchange_code(provider, code).await?;

        let response = self
            .client
            .get(endpoints(provider).identity)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| AuthError::OAuthProviderError(format!("Identity request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::OAuthProviderError(format!(
                "{provider} identity endpoint returned {}",
                response.status()
            )));
        }

        let identity: OAuthIdentity = match provider {
            OAuthProvider::Google => response.json::<GoogleUserInfo>().await.map(Into::into),
            OAuthProvider::Discord => response.json::<DiscordUser>().await.map(Into::into),
        }
        .map_err(|e| AuthError::OAuthProviderError(format!("Invalid identity response: {e}")))?;

        tracing::debug!(%provider, "Fetched OAuth identity");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HttpOAuthGateway {
        HttpOAuthGateway::new(OAuthSettings {
            redirect_base: "https://app.example.com/".to_string(),
            google: Some(OAuthClientCredentials {
                client_id: "google-client".to_string(),
                client_secret: "secret".to_string(),
            }),
            discord: None,
        })
        .unwrap()
    }

    #[test]
    fn test_authorization_url_carries_state() {
        let url = gateway()
            .authorization_url(OAuthProvider::Google, "abc_123")
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.host_str(), Some("accounts.google.com"));
        assert!(params.contains(&("state".to_string(), "abc_123".to_string())));
        assert!(params.contains(&("client_id".to_string(), "google-client".to_string())));
        assert!(params.contains(&(
            "redirect_uri".to_string(),
            "https://app.example.com/oauth/google/callback".to_string()
        )));
    }

    #[test]
    fn test_unconfigured_provider() {
        let gateway = gateway();
        assert!(gateway.is_configured(OAuthProvider::Google));
        assert!(!gateway.is_configured(OAuthProvider::Discord));
        assert!(matches!(
            gateway.authorization_url(OAuthProvider::Discord, "s"),
            Err(AuthError::OAuthProviderNotConfigured)
        ));
    }

    #[test]
    fn test_parse_google_identity() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub":"1098","email":"a@example.com","email_verified":true,"name":"Ann"}"#,
        )
        .unwrap();
        let identity = OAuthIdentity::from(info);
        assert_eq!(identity.provider_user_id, "1098");
        assert!(identity.email_verified);
        assert_eq!(identity.display_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_parse_discord_identity_without_email() {
        let user: DiscordUser =
            serde_json::from_str(r#"{"id":"42","username":"ann","global_name":null}"#).unwrap();
        let identity = OAuthIdentity::from(user);
        assert_eq!(identity.provider_user_id, "42");
        assert_eq!(identity.email, None);
        assert!(!identity.email_verified);
        assert_eq!(identity.display_name.as_deref(), Some("ann"));
    }
}
