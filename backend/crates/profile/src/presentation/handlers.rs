//! HTTP Handlers

use std::sync::Arc;

use auth::{AuthUser, MaybeAuthUser, Principal, TokenService};
use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{FromRef, Multipart, Path, Query, State};
use axum::http::StatusCode;
use kernel::extract::ApiJson;

use crate::application::{FollowUseCase, MediaUseCase, ProfileConfig, ProfileUseCase};
use crate::domain::entity::{FollowDirection, Profile};
use crate::domain::gateway::MediaStore;
use crate::domain::media::MediaKind;
use crate::domain::repository::ProfileStore;
use crate::error::{ProfileError, ProfileResult};
use crate::presentation::dto::{
    FollowListResponse, MediaResponse, PageParams, ProfileResponse, UpdateProfileRequest,
};

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

/// Shared state for profile handlers
///
/// `tokens` is the auth crate's token service, so [`AuthUser`] works here.
pub struct ProfileAppState<R, S> {
    pub repo: Arc<R>,
    pub media: Arc<S>,
    pub config: Arc<ProfileConfig>,
    pub tokens: Arc<TokenService>,
}

impl<R, S> ProfileAppState<R, S> {
    pub fn new(repo: R, media: S, config: ProfileConfig, tokens: Arc<TokenService>) -> Self {
        Self {
            repo: Arc::new(repo),
            media: Arc::new(media),
            config: Arc::new(config),
            tokens,
        }
    }
}

impl<R, S> Clone for ProfileAppState<R, S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            media: self.media.clone(),
            config: self.config.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<R, S> FromRef<ProfileAppState<R, S>> for Arc<TokenService> {
    fn from_ref(state: &ProfileAppState<R, S>) -> Self {
        state.tokens.clone()
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// GET /api/users/{userName}
pub async fn get_profile<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(user_name): Path<String>,
) -> ProfileResult<Json<ProfileResponse>>
where
    R: ProfileStore,
{
    let view = ProfileUseCase::new(state.repo.clone())
        .view(&user_name, viewer.as_ref())
        .await?;
    Ok(Json(ProfileResponse::from_view(view, &state.config)))
}

/// GET /api/users/me/profile
pub async fn get_own_profile<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
) -> ProfileResult<Json<ProfileResponse>>
where
    R: ProfileStore,
{
    let view = ProfileUseCase::new(state.repo.clone()).own(&principal).await?;
    Ok(Json(ProfileResponse::from_view(view, &state.config)))
}

/// PATCH /api/users/me/profile
pub async fn update_profile<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ProfileResult<Json<ProfileResponse>>
where
    R: ProfileStore,
{
    let patch = req.into_patch()?;
    let view = ProfileUseCase::new(state.repo.clone())
        .update(&principal, patch)
        .await?;
    Ok(Json(ProfileResponse::from_view(view, &state.config)))
}

// ============================================================================
// Avatar / Banner
// ============================================================================

fn media_response(profile: &Profile, config: &ProfileConfig) -> MediaResponse {
    MediaResponse {
        avatar_url: profile.avatar_key.as_deref().map(|key| config.media_url(key)),
        banner_url: profile.banner_key.as_deref().map(|key| config.media_url(key)),
    }
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> ProfileError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ProfileError::MediaTooLarge { max_bytes }
    } else {
        ProfileError::Validation(e.body_text())
    }
}

/// Contents of the `file` field, refusing to buffer past `max_bytes`
async fn read_file_field(multipart: &mut Multipart, max_bytes: usize) -> ProfileResult<Vec<u8>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ProfileError::MediaTooLarge { max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(ProfileError::MissingFile)
}

async fn upload<R, S>(
    state: ProfileAppState<R, S>,
    principal: Principal,
    kind: MediaKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> ProfileResult<Json<MediaResponse>>
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    let mut multipart = multipart.map_err(|_| {
        ProfileError::Validation("Expected a multipart/form-data body".to_string())
    })?;
    let bytes = read_file_field(&mut multipart, state.config.max_bytes(kind)).await?;

    let profile = MediaUseCase::new(state.repo.clone(), state.media.clone(), state.config.clone())
        .upload(&principal, kind, &bytes)
        .await?;
    Ok(Json(media_response(&profile, &state.config)))
}

async fn remove<R, S>(
    state: ProfileAppState<R, S>,
    principal: Principal,
    kind: MediaKind,
) -> ProfileResult<Json<MediaResponse>>
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    let profile = MediaUseCase::new(state.repo.clone(), state.media.clone(), state.config.clone())
        .remove(&principal, kind)
        .await?;
    Ok(Json(media_response(&profile, &state.config)))
}

/// PUT /api/users/me/avatar
pub async fn put_avatar<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ProfileResult<Json<MediaResponse>>
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    upload(state, principal, MediaKind::Avatar, multipart).await
}

/// DELETE /api/users/me/avatar
pub async fn delete_avatar<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
) -> ProfileResult<Json<MediaResponse>>
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    remove(state, principal, MediaKind::Avatar).await
}

/// PUT /api/users/me/banner
pub async fn put_banner<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ProfileResult<Json<MediaResponse>>
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    upload(state, principal, MediaKind::Banner, multipart).await
}

/// DELETE /api/users/me/banner
pub async fn delete_banner<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
) -> ProfileResult<Json<MediaResponse>>
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    remove(state, principal, MediaKind::Banner).await
}

// ============================================================================
// Follower Graph
// ============================================================================

/// PUT /api/users/{userName}/follow
pub async fn follow<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
    Path(user_name): Path<String>,
) -> ProfileResult<StatusCode>
where
    R: ProfileStore,
{
    FollowUseCase::new(state.repo.clone())
        .follow(&principal, &user_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/{userName}/follow
pub async fn unfollow<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    AuthUser(principal): AuthUser,
    Path(user_name): Path<String>,
) -> ProfileResult<StatusCode>
where
    R: ProfileStore,
{
    FollowUseCase::new(state.repo.clone())
        .unfollow(&principal, &user_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn follow_list<R>(
    repo: Arc<R>,
    config: &ProfileConfig,
    user_name: &str,
    direction: FollowDirection,
    params: PageParams,
) -> ProfileResult<Json<FollowListResponse>>
where
    R: ProfileStore,
{
    let page = FollowUseCase::new(repo)
        .list(user_name, direction, params.into())
        .await?;
    Ok(Json(FollowListResponse::from_page(page, config)))
}

/// GET /api/users/{userName}/followers
pub async fn followers<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    Path(user_name): Path<String>,
    Query(params): Query<PageParams>,
) -> ProfileResult<Json<FollowListResponse>>
where
    R: ProfileStore,
{
    follow_list(
        state.repo.clone(),
        &state.config,
        &user_name,
        FollowDirection::Followers,
        params,
    )
    .await
}

/// GET /api/users/{userName}/following
pub async fn following<R, S>(
    State(state): State<ProfileAppState<R, S>>,
    Path(user_name): Path<String>,
    Query(params): Query<PageParams>,
) -> ProfileResult<Json<FollowListResponse>>
where
    R: ProfileStore,
{
    follow_list(
        state.repo.clone(),
        &state.config,
        &user_name,
        FollowDirection::Following,
        params,
    )
    .await
}
