//! Application Layer
//!
//! Use cases and application services.

pub mod account_deletion;
pub mod config;
pub mod email_change;
pub mod maintenance;
pub mod me;
pub(crate) mod notifications;
pub mod oauth;
pub mod password;
pub(crate) mod reauth;
pub mod refresh;
pub mod session;
pub mod sessions;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod tokens;
pub mod totp;

pub use account_deletion::{AccountDeletionUseCase, ScheduleDeletionInput};
pub use config::AuthConfig;
pub use email_change::{EmailChangeProgress, EmailChangeUseCase, RequestEmailChangeInput};
pub use maintenance::{MaintenanceReport, MaintenanceUseCase};
pub use me::{AccountInfo, MeUseCase};
pub use oauth::{HoldInfo, OAuthCallbackInput, OAuthOutcome, OAuthUseCase};
pub use password::{ChangePasswordInput, ConfirmResetInput, PasswordUseCase};
pub use refresh::RefreshUseCase;
pub use session::{SessionTokens, SignInOutcome};
pub use sessions::{SessionView, SessionsUseCase};
pub use sign_in::{SignInInput, SignInTotpInput, SignInTotpUseCase, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use tokens::{Principal, TokenService};
pub use totp::TotpUseCase;
