//! API DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{ProfileConfig, ProfileView};
use crate::domain::entity::{FollowEntry, Page, PageRequest, ProfilePatch};
use crate::error::ProfileResult;

/// PATCH /me/profile; omitted fields stay as they are, `""` clears
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_patch(self) -> ProfileResult<ProfilePatch> {
        ProfilePatch::parse(self.display_name, self.bio, self.location, self.website)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub public_id: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    pub joined_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn from_view(view: ProfileView, config: &ProfileConfig) -> Self {
        let ProfileView {
            account,
            profile,
            followers,
            following,
            is_following,
        } = view;

        Self {
            public_id: account.public_id,
            user_name: account.user_name,
            display_name: profile.display_name,
            bio: profile.bio,
            location: profile.location,
            website: profile.website,
            avatar_url: profile.avatar_key.map(|key| config.media_url(&key)),
            banner_url: profile.banner_key.map(|key| config.media_url(&key)),
            followers_count: followers,
            following_count: following,
            is_following,
            joined_at: account.created_at,
        }
    }
}

/// Returned by the avatar and banner routes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowItem {
    pub public_id: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowListResponse {
    pub items: Vec<FollowItem>,
    pub total: i64,
}

impl FollowListResponse {
    pub fn from_page(page: Page<FollowEntry>, config: &ProfileConfig) -> Self {
        Self {
            items: page
                .items
                .into_iter()
                .map(|entry| FollowItem {
                    public_id: entry.public_id,
                    user_name: entry.user_name,
                    display_name: entry.display_name,
                    avatar_url: entry.avatar_key.map(|key| config.media_url(&key)),
                    followed_at: entry.followed_at,
                })
                .collect(),
            total: page.total,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.limit, params.offset)
    }
}
