//! PostgreSQL Repository Implementations
//!
//! Reads `users` (owned by the auth crate) and owns `user_profiles` and
//! `follows`. Both tables cascade when the user row goes.

use chrono::{DateTime, Utc};
use kernel::UserId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{Account, FollowDirection, FollowEntry, Page, PageRequest, Profile};
use crate::domain::repository::{AccountRepository, FollowRepository, ProfileRepository};
use crate::error::ProfileResult;

/// `users.user_status` values
const STATUS_ACTIVE: i16 = 0;
const STATUS_PENDING_DELETION: i16 = 2;

/// PostgreSQL-backed profile repository
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    user_id: Uuid,
    public_id: String,
    user_name: String,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            public_id: row.public_id,
            user_name: row.user_name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    display_name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    website: Option<String>,
    avatar_key: Option<String>,
    banner_key: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            display_name: row.display_name,
            bio: row.bio,
            location: row.location,
            website: row.website,
            avatar_key: row.avatar_key,
            banner_key: row.banner_key,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FollowRow {
    public_id: String,
    user_name: String,
    display_name: Option<String>,
    avatar_key: Option<String>,
    followed_at: DateTime<Utc>,
}

impl From<FollowRow> for FollowEntry {
    fn from(row: FollowRow) -> Self {
        Self {
            public_id: row.public_id,
            user_name: row.user_name,
            display_name: row.display_name,
            avatar_key: row.avatar_key,
            followed_at: row.followed_at,
        }
    }
}

impl AccountRepository for PgProfileRepository {
    async fn find_active_by_name(&self, canonical: &str) -> ProfileResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT user_id, public_id, user_name, created_at
            FROM users
            WHERE user_name_canonical = $1 AND user_status = $2
            "#,
        )
        .bind(canonical)
        .bind(STATUS_ACTIVE)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_member_by_id(&self, user_id: &UserId) -> ProfileResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT user_id, public_id, user_name, created_at
            FROM users
            WHERE user_id = $1 AND user_status IN ($2, $3)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(STATUS_ACTIVE)
        .bind(STATUS_PENDING_DELETION)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

impl ProfileRepository for PgProfileRepository {
    async fn find_profile(&self, user_id: &UserId) -> ProfileResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, display_name, bio, location, website,
                   avatar_key, banner_key, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn save_profile(&self, profile: &Profile) -> ProfileResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                user_id, display_name, bio, location, website,
                avatar_key, banner_key, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                bio = EXCLUDED.bio,
                location = EXCLUDED.location,
                website = EXCLUDED.website,
                avatar_key = EXCLUDED.avatar_key,
                banner_key = EXCLUDED.banner_key,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.location)
        .bind(&profile.website)
        .bind(&profile.avatar_key)
        .bind(&profile.banner_key)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn media_keys_in_use(&self) -> ProfileResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT avatar_key FROM user_profiles WHERE avatar_key IS NOT NULL
            UNION ALL
            SELECT banner_key FROM user_profiles WHERE banner_key IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }
}

impl FollowRepository for PgProfileRepository {
    async fn add_follow(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower.as_uuid())
        .bind(followee.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_follow(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower.as_uuid())
            .bind(followee.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower.as_uuid())
        .bind(followee.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn follow_counts(&self, user_id: &UserId) -> ProfileResult<(i64, i64)> {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows f
                    JOIN users u ON u.user_id = f.follower_id
                    WHERE f.followee_id = $1 AND u.user_status = $2),
                (SELECT COUNT(*) FROM follows f
                    JOIN users u ON u.user_id = f.followee_id
                    WHERE f.follower_id = $1 AND u.user_status = $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(STATUS_ACTIVE)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn list_follows(
        &self,
        user_id: &UserId,
        direction: FollowDirection,
        page: PageRequest,
    ) -> ProfileResult<Page<FollowEntry>> {
        // `subject` is the column matching `user_id`; `other` is the listed side
        let (subject, other) = match direction {
            FollowDirection::Followers => ("followee_id", "follower_id"),
            FollowDirection::Following => ("follower_id", "followee_id"),
        };

        let items = sqlx::query_as::<_, FollowRow>(&format!(
            r#"
            SELECT u.public_id, u.user_name, p.display_name, p.avatar_key,
                   f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.user_id = f.{other}
            LEFT JOIN user_profiles p ON p.user_id = u.user_id
            WHERE f.{subject} = $1 AND u.user_status = $2
            ORDER BY f.created_at DESC, u.user_id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(STATUS_ACTIVE)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM follows f
            JOIN users u ON u.user_id = f.{other}
            WHERE f.{subject} = $1 AND u.user_status = $2
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(STATUS_ACTIVE)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page {
            items: items.into_iter().map(Into::into).collect(),
            total,
        })
    }
}
