//! Follower Graph Entries

use chrono::{DateTime, Utc};

/// One row of a followers/following list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowEntry {
    pub public_id: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub avatar_key: Option<String>,
    /// When the follow happened
    pub followed_at: DateTime<Utc>,
}

/// Which side of the graph a list walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    /// Accounts following the subject
    Followers,
    /// Accounts the subject follows
    Following,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Validated `limit`/`offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Out-of-range values are clamped rather than rejected
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamps() {
        assert_eq!(
            PageRequest::default(),
            PageRequest {
                limit: 20,
                offset: 0
            }
        );
        assert_eq!(PageRequest::new(Some(0), Some(-5)).limit, 1);
        assert_eq!(PageRequest::new(Some(0), Some(-5)).offset, 0);
        assert_eq!(PageRequest::new(Some(500), Some(40)).limit, 100);
        assert_eq!(PageRequest::new(Some(500), Some(40)).offset, 40);
    }
}
