pub mod admin;
pub mod auth;
pub mod battles;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod generate;
pub mod mail;
pub mod topics;
pub mod votes;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use config::Config;
use generate::ContentGenerator;

pub type DbPool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub generator: Arc<dyn ContentGenerator>,
}

impl AppState {
    pub fn new(
        db: DbPool,
        config: Config,
        http: reqwest::Client,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            http,
            generator,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let origin = match state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!(origin = %state.config.cors_origin, "invalid CORS_ORIGIN, allowing any origin");
            AllowOrigin::any()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "ok" }))
        // Auth
        .route("/api/auth/login-link", post(auth::request_login_link))
        .route("/api/auth/verify", post(auth::verify_login_link))
        .route("/api/auth/me", get(auth::me))
        // Battles
        .route(
            "/api/battles",
            get(battles::list_battles).post(battles::publish_battle),
        )
        .route(
            "/api/battles/{id}",
            get(battles::get_battle).put(battles::moderate_battle),
        )
        .route("/api/battles/{id}/vote", post(votes::cast_vote))
        .route(
            "/api/battles/{id}/reaction",
            get(votes::current_reaction).post(votes::cast_reaction),
        )
        // Comments
        .route(
            "/api/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/comments/{id}/status", put(comments::review_comment))
        // Topics
        .route(
            "/api/topics",
            get(topics::list_topics).post(topics::create_topic),
        )
        .route("/api/topics/suggestions", get(topics::suggestions))
        .route("/api/topics/{id}", put(topics::update_topic))
        // Admins & system
        .route("/api/users", get(admin::list_users).post(admin::add_admin))
        .route("/api/users/{id}", axum::routing::delete(admin::revoke_admin))
        .route(
            "/api/system/config",
            get(admin::get_config).put(admin::update_config),
        )
        .route("/api/system/status", get(admin::system_status))
        // Generation
        .route("/api/generate", post(generate::generate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
