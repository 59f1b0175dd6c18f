//! Entities

pub mod account_event;
pub mod credential;
pub mod email_change;
pub mod oauth;
pub mod password_reset;
pub mod refresh_session;
pub mod user;

pub use account_event::{AccountEvent, AccountEventEnvelope, ConfirmedSide};
pub use credential::Credential;
pub use email_change::EmailChangeVerification;
pub use oauth::{AuthHold, AuthProviderLink, OAuthIdentity, OAuthProvider, OAuthState};
pub use password_reset::PasswordReset;
pub use refresh_session::RefreshSession;
pub use user::User;
