//! Presentation Layer
//!
//! HTTP handlers, DTOs, extractors, router, and middleware.

pub mod dto;
pub mod extractor;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use extractor::{AuthUser, Client, EnrollingUser, MaybeAuthUser, RefreshCookie, StreamUser};
pub use handlers::AuthAppState;
pub use middleware::{RateLimitState, rate_limit};
pub use router::auth_router;
