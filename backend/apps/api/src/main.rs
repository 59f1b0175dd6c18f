//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;
mod jobs;

use std::net::SocketAddr;
use std::sync::Arc;

use auth::{AppMailer, AuthAppState, BroadcastEventHub, HttpOAuthGateway, PgAuthRepository, auth_router};
use axum::Router;
use axum::http::{Method, header};
use platform::mail::SmtpMailer;
use profile::{FsMediaStore, PgProfileRepository, ProfileAppState, profile_router};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppSettings;
use crate::jobs::Maintenance;

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,profile=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = AppSettings::from_env()?;

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Outgoing mail
    let mailer = match &settings.smtp {
        Some(smtp) => AppMailer::from(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!("SMTP_HOST not set, mails are written to the log");
            AppMailer::default()
        }
    };
    tracing::info!(mailer = mailer.kind(), "Mailer ready");

    // Auth
    let oauth = HttpOAuthGateway::new(settings.auth.oauth.clone())?;
    let events = Arc::new(BroadcastEventHub::default());
    let auth_state = AuthAppState::new(
        PgAuthRepository::new(pool.clone()),
        settings.auth,
        oauth,
        mailer,
        events,
    )?;

    // Profiles and media
    let media = FsMediaStore::new(settings.profile.media_dir.clone());
    media.prepare().await?;
    tracing::info!(media_dir = %media.root().display(), "Media storage ready");

    let profile_state = ProfileAppState::new(
        PgProfileRepository::new(pool.clone()),
        media,
        settings.profile,
        auth_state.tokens.clone(),
    );

    // Periodic cleanup
    Maintenance {
        auth_repo: auth_state.repo.clone(),
        auth_config: auth_state.config.clone(),
        profile_repo: profile_state.repo.clone(),
        media: profile_state.media.clone(),
        profile_config: profile_state.config.clone(),
    }
    .spawn(settings.maintenance_interval);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(settings.frontend_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let media_files = ServeDir::new(profile_state.media.root());
    let app = Router::new()
        .nest("/api/auth", auth_router(auth_state))
        .nest("/api/users", profile_router(profile_state))
        .nest_service("/media", media_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", settings.bind_addr);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
