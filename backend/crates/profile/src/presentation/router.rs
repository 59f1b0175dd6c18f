//! Profile Router

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};

use crate::domain::gateway::MediaStore;
use crate::domain::repository::ProfileStore;
use crate::presentation::handlers::{self, ProfileAppState};

/// Routes mounted under `/api/users`
pub fn profile_router<R, S>(state: ProfileAppState<R, S>) -> Router
where
    R: ProfileStore,
    S: MediaStore + Send + Sync + 'static,
{
    let upload_limit = DefaultBodyLimit::max(state.config.upload_body_limit());

    Router::new()
        .route(
            "/me/profile",
            get(handlers::get_own_profile::<R, S>).patch(handlers::update_profile::<R, S>),
        )
        .route(
            "/me/avatar",
            put(handlers::put_avatar::<R, S>)
                .delete(handlers::delete_avatar::<R, S>)
                .layer(upload_limit),
        )
        .route(
            "/me/banner",
            put(handlers::put_banner::<R, S>)
                .delete(handlers::delete_banner::<R, S>)
                .layer(upload_limit),
        )
        .route("/{user_name}", get(handlers::get_profile::<R, S>))
        .route(
            "/{user_name}/follow",
            put(handlers::follow::<R, S>).delete(handlers::unfollow::<R, S>),
        )
        .route("/{user_name}/followers", get(handlers::followers::<R, S>))
        .route("/{user_name}/following", get(handlers::following::<R, S>))
        .with_state(state)
}
