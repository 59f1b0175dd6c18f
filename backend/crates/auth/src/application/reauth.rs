//! Re-authentication for sensitive changes
//!
//! Changing the password or email and scheduling deletion ask for the
//! current password (when the account has one) and a TOTP code (when
//! two-factor is on), even with a valid access token.

use crate::application::config::AuthConfig;
use crate::domain::entity::{Credential, User};
use crate::domain::value_object::user_password::RawPassword;
use crate::error::{AuthError, AuthResult};

pub(crate) fn verify_reauth(
    config: &AuthConfig,
    user: &User,
    credential: &Credential,
    password: Option<String>,
    totp_code: Option<&str>,
) -> AuthResult<()> {
    if let Some(hash) = &credential.password_hash {
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AuthError::Validation("Current password is required".to_string()))?;
        let raw = RawPassword::for_verification(password);
        if !hash.verify(&raw, config.pepper()) {
            return Err(AuthError::InvalidCredentials);
        }
    }

    if let Some(secret) = credential.active_totp() {
        let code = totp_code.ok_or(AuthError::InvalidTwoFactorCode)?;
        if !secret.verify(code, &config.totp_issuer, user.account_label())? {
            return Err(AuthError::InvalidTwoFactorCode);
        }
    }

    Ok(())
}
