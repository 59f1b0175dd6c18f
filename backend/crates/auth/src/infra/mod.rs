//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod events;
pub mod mail;
pub mod oauth;
pub mod postgres;

pub use events::BroadcastEventHub;
pub use mail::AppMailer;
pub use oauth::HttpOAuthGateway;
pub use postgres::PgAuthRepository;
