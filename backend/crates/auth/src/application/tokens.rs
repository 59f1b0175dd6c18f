//! Access Tokens and Tickets
//!
//! All are HS256 JWTs signed with `AuthConfig::jwt_secret`. The `typ`
//! claim keeps one kind from being accepted as another. An enrollment
//! ticket carries the same claims as an access token but only opens the
//! TOTP enrollment routes.

use std::time::Duration;

use kernel::UserId;
use platform::jwt::{JwtCodec, unix_now};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::User;
use crate::domain::value_object::{public_id::PublicId, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

const ACCESS_TYP: &str = "access";
const TWO_FACTOR_TYP: &str = "2fa";
const ENROLLMENT_TYP: &str = "enroll";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Public id
    pub sub: String,
    pub uid: Uuid,
    pub role: UserRole,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorClaims {
    pub uid: Uuid,
    pub remember_me: bool,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

/// The caller behind a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub public_id: PublicId,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TokenService {
    codec: JwtCodec,
    access_ttl: Duration,
    ticket_ttl: Duration,
    enrollment_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        Ok(Self {
            codec: JwtCodec::new(&config.jwt_secret)?,
            access_ttl: config.access_token_ttl,
            ticket_ttl: config.two_factor_ticket_ttl,
            enrollment_ttl: config.enrollment_ticket_ttl,
        })
    }

    fn issue_principal(&self, user: &User, typ: &str, ttl: Duration) -> AuthResult<String> {
        let iat = unix_now();
        let claims = AccessClaims {
            sub: user.public_id.to_string(),
            uid: *user.user_id.as_uuid(),
            role: user.user_role,
            typ: typ.to_string(),
            iat,
            exp: iat + ttl.as_secs() as i64,
        };
        Ok(self.codec.encode(&claims)?)
    }

    fn verify_principal(&self, token: &str, typ: &str) -> AuthResult<Principal> {
        let claims: AccessClaims = self.codec.decode(token)?;
        if claims.typ != typ {
            return Err(AuthError::Unauthenticated);
        }
        let public_id =
            PublicId::parse_str(&claims.sub).map_err(|_| AuthError::Unauthenticated)?;

        Ok(Principal {
            user_id: UserId::from_uuid(claims.uid),
            public_id,
            role: claims.role,
        })
    }

    pub fn issue_access(&self, user: &User) -> AuthResult<AccessToken> {
        Ok(AccessToken {
            token: self.issue_principal(user, ACCESS_TYP, self.access_ttl)?,
            expires_in_secs: self.access_ttl.as_secs(),
        })
    }

    pub fn verify_access(&self, token: &str) -> AuthResult<Principal> {
        self.verify_principal(token, ACCESS_TYP)
    }

    pub fn issue_enrollment_ticket(&self, user: &User) -> AuthResult<String> {
        self.issue_principal(user, ENROLLMENT_TYP, self.enrollment_ttl)
    }

    /// Access token or enrollment ticket
    pub fn verify_enrollment(&self, token: &str) -> AuthResult<Principal> {
        self.verify_access(token)
            .or_else(|_| self.verify_principal(token, ENROLLMENT_TYP))
    }

    pub fn issue_two_factor_ticket(&self, user_id: &UserId, remember_me: bool) -> AuthResult<String> {
        let iat = unix_now();
        let claims = TwoFactorClaims {
            uid: *user_id.as_uuid(),
            remember_me,
            typ: TWO_FACTOR_TYP.to_string(),
            iat,
            exp: iat + self.ticket_ttl.as_secs() as i64,
        };
        Ok(self.codec.encode(&claims)?)
    }

    pub fn verify_two_factor_ticket(&self, ticket: &str) -> AuthResult<TwoFactorClaims> {
        let claims: TwoFactorClaims = self
            .codec
            .decode(ticket)
            .map_err(|_| AuthError::InvalidTwoFactorTicket)?;
        if claims.typ != TWO_FACTOR_TYP {
            return Err(AuthError::InvalidTwoFactorTicket);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{email::Email, user_name::UserName};

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::with_random_secret()).unwrap()
    }

    fn user() -> User {
        User::new(
            UserName::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            true,
        )
    }

    #[test]
    fn test_access_roundtrip() {
        let service = service();
        let user = user();
        let token = service.issue_access(&user).unwrap();
        assert_eq!(token.expires_in_secs, 900);

        let principal = service.verify_access(&token.token).unwrap();
        assert_eq!(principal.user_id, user.user_id);
        assert_eq!(principal.public_id, user.public_id);
        assert_eq!(principal.role, UserRole::User);
    }

    #[test]
    fn test_ticket_not_accepted_as_access() {
        let service = service();
        let user = user();
        let ticket = service.issue_two_factor_ticket(&user.user_id, true).unwrap();

        assert!(matches!(
            service.verify_access(&ticket),
            Err(AuthError::Unauthenticated)
        ));
        let claims = service.verify_two_factor_ticket(&ticket).unwrap();
        assert!(claims.remember_me);

        let access = service.issue_access(&user).unwrap();
        assert!(matches!(
            service.verify_two_factor_ticket(&access.token),
            Err(AuthError::InvalidTwoFactorTicket)
        ));
    }

    #[test]
    fn test_enrollment_ticket_only_opens_enrollment() {
        let service = service();
        let user = user();
        let ticket = service.issue_enrollment_ticket(&user).unwrap();

        assert!(matches!(
            service.verify_access(&ticket),
            Err(AuthError::Unauthenticated)
        ));
        assert_eq!(service.verify_enrollment(&ticket).unwrap().user_id, user.user_id);

        let access = service.issue_access(&user).unwrap();
        assert_eq!(
            service.verify_enrollment(&access.token).unwrap().public_id,
            user.public_id
        );

        let two_factor = service.issue_two_factor_ticket(&user.user_id, false).unwrap();
        assert!(service.verify_enrollment(&two_factor).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = AuthConfig {
            jwt_secret: b"short".to_vec(),
            ..Default::default()
        };
        assert!(matches!(
            TokenService::new(&config),
            Err(AuthError::Internal(_))
        ));
    }
}
