//! Gateway Traits
//!
//! Outbound calls the use cases make besides storage.

use crate::domain::entity::{AccountEventEnvelope, OAuthIdentity, OAuthProvider};
use crate::error::AuthResult;

#[trait_variant::make(OAuthGateway: Send)]
pub trait LocalOAuthGateway {
    fn is_configured(&self, provider: OAuthProvider) -> bool;

    /// Provider consent URL carrying `state`
    fn authorization_url(&self, provider: OAuthProvider, state: &str) -> AuthResult<String>;

    /// Exchange the authorization code and read the identity
    async fn fetch_identity(&self, provider: OAuthProvider, code: &str) -> AuthResult<OAuthIdentity>;
}

/// Fan-out for [`AccountEvent`](crate::domain::entity::AccountEvent)s
///
/// Publishing never blocks and never fails; events with no listener are
/// dropped.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, envelope: AccountEventEnvelope);
}
