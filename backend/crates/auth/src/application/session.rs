//! Session Issuance
//!
//! The last step shared by every way of signing in (password, TOTP ticket,
//! OAuth, sign-up): enforce the two-factor rules, then open a refresh
//! session and mint an access token.

use platform::client::ClientFingerprint;
use platform::crypto::token_hash;

use crate::application::config::AuthConfig;
use crate::application::tokens::{Principal, TokenService};
use crate::domain::entity::{Credential, RefreshSession, User};
use crate::domain::repository::{RefreshSessionRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

/// Tokens handed to the client after a successful sign-in or refresh
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub user: User,
    pub access_token: String,
    pub expires_in_secs: u64,
    /// Raw refresh token for the cookie
    pub refresh_token: String,
    pub refresh_max_age_secs: i64,
}

#[derive(Debug, Clone)]
pub enum SignInOutcome {
    SignedIn(Box<SessionTokens>),
    /// Password (or provider) accepted; a TOTP code must follow
    TwoFactorRequired { ticket: String },
    /// The role demands 2FA but none is enrolled; the ticket opens the
    /// enrollment routes only
    TwoFactorSetupRequired { enrollment_ticket: String },
}

/// Open a refresh session for `user` and mint an access token
pub(crate) async fn open_session<R>(
    repo: &R,
    tokens: &TokenService,
    config: &AuthConfig,
    mut user: User,
    remember_me: bool,
    fingerprint: &ClientFingerprint,
) -> AuthResult<SessionTokens>
where
    R: UserRepository + RefreshSessionRepository,
{
    let (session, refresh_token) = RefreshSession::issue(
        user.user_id,
        remember_me,
        fingerprint,
        config.refresh_ttl(remember_me),
    );
    repo.create_session(&session).await?;

    user.record_login();
    repo.update_user(&user).await?;

    let access = tokens.issue_access(&user)?;

    tracing::info!(
        public_id = %user.public_id,
        session_id = %session.session_id,
        remember_me,
        "Session opened"
    );

    Ok(SessionTokens {
        user,
        access_token: access.token,
        expires_in_secs: access.expires_in_secs,
        refresh_token,
        refresh_max_age_secs: session.max_age_secs(),
    })
}

/// Apply the two-factor rules once the first factor has been accepted
pub(crate) async fn complete_sign_in<R>(
    repo: &R,
    tokens: &TokenService,
    config: &AuthConfig,
    user: User,
    credential: &Credential,
    remember_me: bool,
    fingerprint: &ClientFingerprint,
) -> AuthResult<SignInOutcome>
where
    R: UserRepository + RefreshSessionRepository,
{
    if !user.can_sign_in() {
        return Err(AuthError::AccountDisabled);
    }

    if credential.active_totp().is_some() {
        let ticket = tokens.issue_two_factor_ticket(&user.user_id, remember_me)?;
        tracing::debug!(public_id = %user.public_id, "Two-factor code required");
        return Ok(SignInOutcome::TwoFactorRequired { ticket });
    }

    if user.user_role.requires_two_factor() {
        let enrollment_ticket = tokens.issue_enrollment_ticket(&user)?;
        tracing::info!(public_id = %user.public_id, "Two-factor enrollment required");
        return Ok(SignInOutcome::TwoFactorSetupRequired { enrollment_ticket });
    }

    let session = open_session(repo, tokens, config, user, remember_me, fingerprint).await?;
    Ok(SignInOutcome::SignedIn(Box::new(session)))
}

/// Load the caller's account; a vanished or disabled account ends access
pub(crate) async fn load_user<R>(repo: &R, principal: &Principal) -> AuthResult<User>
where
    R: UserRepository,
{
    let user = repo
        .find_by_id(&principal.user_id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;
    if !user.can_sign_in() {
        return Err(AuthError::AccountDisabled);
    }
    Ok(user)
}

/// The refresh session behind the caller's cookie, if it is theirs
pub(crate) async fn current_session<R>(
    repo: &R,
    principal: &Principal,
    refresh_token: Option<&str>,
) -> AuthResult<Option<RefreshSession>>
where
    R: RefreshSessionRepository,
{
    let Some(token) = refresh_token else {
        return Ok(None);
    };
    let session = repo.find_session(&token_hash(token)).await?;
    Ok(session.filter(|s| s.user_id == principal.user_id))
}
