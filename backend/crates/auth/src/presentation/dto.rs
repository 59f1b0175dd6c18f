//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{AccountInfo, EmailChangeProgress, HoldInfo, SessionView};
use crate::domain::entity::{ConfirmedSide, OAuthProvider};
use crate::domain::value_object::{user_role::UserRole, user_status::UserStatus};
use crate::domain::value_object::totp_secret::TotpEnrollment;

// ============================================================================
// Sign Up / Sign In
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub user_name: String,
    /// Ignored when `hold_token` is present
    pub email: Option<String>,
    pub password: Option<String>,
    pub hold_token: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    /// User name or email
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInTotpRequest {
    pub ticket: String,
    pub code: String,
}

/// Returned whenever a session is opened or refreshed
///
/// The refresh token itself travels in the cookie only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub public_id: String,
    pub user_name: String,
    pub user_role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorRequiredResponse {
    pub requires_2fa: bool,
    pub ticket: String,
}

// ============================================================================
// Sessions / Account
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub session_id: String,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub remember_me: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub current: bool,
}

impl From<SessionView> for SessionItem {
    fn from(view: SessionView) -> Self {
        Self {
            session_id: view.session_id.to_string(),
            user_agent: view.user_agent,
            client_ip: view.client_ip,
            remember_me: view.remember_me,
            created_at: view.created_at,
            last_used_at: view.last_used_at,
            expires_at: view.expires_at,
            current: view.is_current,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedResponse {
    pub revoked: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub public_id: String,
    pub user_name: String,
    pub email: String,
    pub email_verified: bool,
    pub user_role: UserRole,
    pub user_status: UserStatus,
    pub totp_enabled: bool,
    pub has_password: bool,
    pub providers: Vec<OAuthProvider>,
    pub deletion_scheduled_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountInfo> for MeResponse {
    fn from(info: AccountInfo) -> Self {
        let user = info.user;
        Self {
            public_id: user.public_id.to_string(),
            user_name: user.user_name.display().to_string(),
            email: user.email.as_str().to_string(),
            email_verified: user.email_verified,
            user_role: user.user_role,
            user_status: user.user_status,
            totp_enabled: info.totp_enabled,
            has_password: info.has_password,
            providers: info.providers,
            deletion_scheduled_at: user.deletion_scheduled_at,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// TOTP
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpSetupResponse {
    /// QR code as base64-encoded PNG
    pub qr_code: String,
    /// Secret for manual entry
    pub secret: String,
    pub otpauth_url: String,
}

impl From<TotpEnrollment> for TotpSetupResponse {
    fn from(enrollment: TotpEnrollment) -> Self {
        Self {
            qr_code: enrollment.qr_code_base64,
            secret: enrollment.secret,
            otpauth_url: enrollment.otpauth_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpCodeRequest {
    pub code: String,
}

// ============================================================================
// Password
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

// ============================================================================
// Email change
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailChangeRequest {
    pub new_email: String,
    pub password: Option<String>,
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfirmResponse {
    pub confirmed: ConfirmedSide,
    pub completed: bool,
}

impl From<EmailChangeProgress> for EmailConfirmResponse {
    fn from(progress: EmailChangeProgress) -> Self {
        Self {
            confirmed: progress.side,
            completed: progress.completed,
        }
    }
}

// ============================================================================
// OAuth
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStartResponse {
    pub authorization_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackRequest {
    pub code: String,
    pub state: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_token: Option<String>,
    pub provider: OAuthProvider,
    pub email: String,
    pub suggested_user_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<HoldInfo> for HoldResponse {
    fn from(info: HoldInfo) -> Self {
        Self {
            hold_token: info.hold_token,
            provider: info.provider,
            email: info.email.as_str().to_string(),
            suggested_user_name: info.suggested_user_name.map(|n| n.display().to_string()),
            expires_at: info.expires_at,
        }
    }
}

// ============================================================================
// Account deletion
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReauthRequest {
    pub password: Option<String>,
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionScheduledResponse {
    pub deletion_scheduled_at: DateTime<Utc>,
}

// ============================================================================
// Events
// ============================================================================

/// `?access_token=` for EventSource clients, which cannot set headers
#[derive(Debug, Clone, Deserialize)]
pub struct EventsQuery {
    pub access_token: Option<String>,
}
