/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use marketdesk_api::{app::AppState, config::Config};
/// use marketdesk_shared::auth::provider::SessionAuthenticator;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let auth = SessionAuthenticator::new(
///     pool.clone(),
///     config.auth.jwt_secret.clone(),
///     config.auth.session_policies(),
/// );
/// let state = AppState::new(pool, config, Arc::new(auth));
/// let app = marketdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_auth_layer},
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use marketdesk_shared::auth::provider::AuthProvider;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Authentication service
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            auth,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register           # public
///     │   ├── POST /login              # public
///     │   ├── POST /logout             # session
///     │   └── GET  /session            # session
///     ├── /admin/                      # administrator
///     │   ├── GET|POST /accounts
///     │   ├── PATCH    /accounts/:id/status
///     │   ├── PATCH    /accounts/:id/membership
///     │   └── GET      /dashboard
///     ├── /master-data/:kind           # session; writes need administrator
///     │   ├── GET|POST /
///     │   ├── POST     /import
///     │   └── GET|PUT|DELETE /:id
///     └── /pricing/
///         ├── GET|POST /configs        # administrator
///         ├── POST     /configs/import # administrator
///         ├── GET|PUT|DELETE /configs/:id
///         └── POST     /resolve        # session
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session resolution (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let session_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/session", get(routes::auth::current_session));

    let admin_routes = Router::new()
        .route(
            "/accounts",
            get(routes::admin::list_accounts).post(routes::admin::create_account),
        )
        .route("/accounts/:id/status", patch(routes::admin::update_account_status))
        .route(
            "/accounts/:id/membership",
            patch(routes::admin::update_account_membership),
        )
        .route("/dashboard", get(routes::admin::dashboard));

    let master_data_routes = Router::new()
        .route(
            "/:kind",
            get(routes::master_data::list_records).post(routes::master_data::create_record),
        )
        .route("/:kind/import", post(routes::master_data::import_records))
        .route(
            "/:kind/:id",
            get(routes::master_data::get_record)
                .put(routes::master_data::update_record)
                .delete(routes::master_data::delete_record),
        );

    let pricing_routes = Router::new()
        .route(
            "/configs",
            get(routes::pricing::list_configs).post(routes::pricing::create_config),
        )
        .route("/configs/import", post(routes::pricing::import_configs))
        .route(
            "/configs/:id",
            get(routes::pricing::get_config)
                .put(routes::pricing::update_config)
                .delete(routes::pricing::delete_config),
        )
        .route("/resolve", post(routes::pricing::resolve));

    // Everything below needs a live session
    let protected_routes = Router::new()
        .nest("/auth", session_auth_routes)
        .nest("/admin", admin_routes)
        .nest("/master-data", master_data_routes)
        .nest("/pricing", pricing_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes)
        .merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
