use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use flazic_db::AppState;

mod api;
mod auth;
mod error;
mod notify;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let db_config = flazic_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = flazic_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    tracing::info!("running database migrations...");
    flazic_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    let jwt_secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "dev-secret-change-me-in-production".to_string());

    // SECURITY: warn if JWT secret is the default fallback
    if jwt_secret == "dev-secret-change-me-in-production" {
        tracing::error!(
            "JWT_SECRET is set to a known default value! \
             Set JWT_SECRET to a strong random string (≥32 chars) in production."
        );
        if std::env::var("FLAZIC_ENV").unwrap_or_default() == "production" {
            panic!("Refusing to start: JWT_SECRET must be set to a secure value in production.");
        }
    }

    let jwt_algorithm = std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
    if !matches!(jwt_algorithm.as_str(), "HS256" | "HS384" | "HS512") {
        tracing::warn!("unknown JWT_ALGORITHM {jwt_algorithm:?}, falling back to HS256");
    }
    let token_ttl_minutes = std::env::var("JWT_EXPIRE_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    let state = Arc::new(AppState {
        db,
        jwt_secret,
        jwt_algorithm,
        token_ttl_minutes,
    });

    // Auth routes
    let auth_public = Router::new()
        .route("/register", post(auth::routes::register))
        .route("/login", post(auth::routes::login));

    let auth_protected = Router::new().route("/me", get(auth::routes::me)).layer(
        axum_middleware::from_fn_with_state(state.clone(), auth::middleware::require_auth),
    );

    // Public reads. optional_auth lets owners see their own private rows.
    let public_api = Router::new()
        .route("/users", get(api::users::list_users))
        .route("/users/{id}", get(api::users::get_user))
        .route("/users/{id}/tracks", get(api::users::get_user_tracks))
        .route("/users/{id}/followers", get(api::users::get_user_followers))
        .route("/users/{id}/following", get(api::users::get_user_following))
        .route("/users/{id}/stats", get(api::users::get_user_stats))
        .route("/tracks", get(api::tracks::list_tracks))
        .route("/tracks/{id}", get(api::tracks::get_track))
        .route("/tracks/{id}/audio", get(api::tracks::get_track_audio))
        .route("/tracks/{id}/likes", get(api::tracks::get_track_likes))
        .route(
            "/tracks/{id}/comments",
            get(api::comments::list_track_comments),
        )
        .route("/comments/{id}", get(api::comments::get_comment))
        .route(
            "/comments/{id}/replies",
            get(api::comments::get_comment_replies),
        )
        .route("/playlists", get(api::playlists::list_playlists))
        .route("/playlists/{id}", get(api::playlists::get_playlist))
        .route("/events", get(api::events::list_events))
        .route("/events/{id}", get(api::events::get_event))
        .route(
            "/social-links/user/{user_id}",
            get(api::social_links::list_user_links),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::optional_auth,
        ));

    // Mutations require auth
    let protected_api = Router::new()
        .merge(
            Router::new()
                .route("/tracks/upload-audio", post(api::tracks::upload_audio))
                .layer(DefaultBodyLimit::max(100 * 1024 * 1024)), // 100 MB audio uploads
        )
        .route("/users/profile", put(api::users::update_profile))
        .route("/users/{id}", delete(api::users::delete_user))
        .route("/tracks", post(api::tracks::create_track))
        .route(
            "/tracks/{id}",
            put(api::tracks::update_track).delete(api::tracks::delete_track),
        )
        .route("/tracks/{id}/like", post(api::tracks::toggle_like))
        .route("/comments", post(api::comments::create_comment))
        .route(
            "/comments/{id}",
            put(api::comments::update_comment).delete(api::comments::delete_comment),
        )
        .route("/follow/{user_id}", post(api::follows::toggle_follow))
        .route("/follow/{user_id}/status", get(api::follows::follow_status))
        .route("/follow/me/followers", get(api::follows::my_followers))
        .route("/follow/me/following", get(api::follows::my_following))
        .route("/follow/me/stats", get(api::follows::my_follow_stats))
        .route(
            "/notifications",
            get(api::notifications::list_notifications),
        )
        .route(
            "/notifications/stats",
            get(api::notifications::notification_stats),
        )
        .route(
            "/notifications/read-all",
            put(api::notifications::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            put(api::notifications::mark_read),
        )
        .route(
            "/notifications/{id}",
            delete(api::notifications::delete_notification),
        )
        .route("/playlists", post(api::playlists::create_playlist))
        .route(
            "/playlists/{id}",
            put(api::playlists::update_playlist).delete(api::playlists::delete_playlist),
        )
        .route("/playlists/{id}/tracks", post(api::playlists::add_track))
        .route(
            "/playlists/{id}/tracks/{track_id}",
            delete(api::playlists::remove_track),
        )
        .route("/events", post(api::events::create_event))
        .route(
            "/events/{id}",
            put(api::events::update_event).delete(api::events::delete_event),
        )
        .route("/social-links", post(api::social_links::create_link))
        .route(
            "/social-links/{id}",
            put(api::social_links::update_link).delete(api::social_links::delete_link),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .merge(public_api)
        .merge(protected_api);

    // CORS — restrict to configured origins
    let cors = {
        let allowed_origins_str = std::env::var("CORS_ORIGINS").unwrap_or_default();
        let methods = [
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ];
        if allowed_origins_str.is_empty() {
            tracing::warn!(
                "CORS_ORIGINS not set — defaulting to restrictive CORS. \
                 Set CORS_ORIGINS=http://localhost:3000 for dev."
            );
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
                    "http://localhost:8080",
                )))
                .allow_methods(methods)
                .allow_headers(tower_http::cors::Any)
        } else {
            let origins: Vec<HeaderValue> = allowed_origins_str
                .split(',')
                .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
                .collect();
            tracing::info!("CORS allowed origins: {:?}", origins);
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers(tower_http::cors::Any)
        }
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listener"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
