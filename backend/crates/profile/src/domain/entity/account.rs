use chrono::{DateTime, Utc};
use kernel::UserId;

/// The slice of a user account the profile pages show
///
/// Lookups by name only return `Active` accounts; a caller loaded by id
/// may also be pending deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: UserId,
    pub public_id: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}
