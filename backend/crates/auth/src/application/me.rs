//! Current account view

use std::sync::Arc;

use crate::application::session::load_user;
use crate::application::tokens::Principal;
use crate::domain::entity::{OAuthProvider, User};
use crate::domain::repository::{CredentialRepository, OAuthRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub user: User,
    pub totp_enabled: bool,
    pub has_password: bool,
    pub providers: Vec<OAuthProvider>,
}

pub struct MeUseCase<R>
where
    R: UserRepository + CredentialRepository + OAuthRepository,
{
    repo: Arc<R>,
}

impl<R> MeUseCase<R>
where
    R: UserRepository + CredentialRepository + OAuthRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, principal: &Principal) -> AuthResult<AccountInfo> {
        let user = load_user(self.repo.as_ref(), principal).await?;
        let credential = self
            .repo
            .find_credential(&user.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Credential missing".to_string()))?;
        let providers = self
            .repo
            .list_links(&user.user_id)
            .await?
            .into_iter()
            .map(|link| link.provider)
            .collect();

        Ok(AccountInfo {
            totp_enabled: credential.totp_enabled,
            has_password: credential.has_password(),
            providers,
            user,
        })
    }
}
