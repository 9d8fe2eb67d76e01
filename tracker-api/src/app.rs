/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use tracker_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracker_shared::auth::{authorization::Policy, middleware::create_jwt_middleware};

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Authorization policy built from the configuration
    pub policy: Arc<Policy>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let policy = config.policy();

        Self {
            db,
            config: Arc::new(config),
            policy: Arc::new(policy),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                          # public
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register               # public
///     │   ├── POST /login                  # public
///     │   ├── POST /refresh                # public
///     │   └── GET  /me
///     ├── /projects/
///     │   ├── GET, POST /
///     │   ├── GET, PUT, DELETE /:id
///     │   ├── PUT  /:id/users
///     │   └── POST /:id/issues
///     └── /issues/
///         ├── POST /
///         └── GET, PUT, DELETE /:id
/// ```
///
/// Everything under `/v1` except the three public auth routes requires a
/// bearer access token.
pub fn build_router(state: AppState) -> Router {
    let jwt_layer = middleware::from_fn(create_jwt_middleware(state.jwt_secret().to_string()));

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/projects/:id/users", put(routes::projects::set_project_users))
        .route("/projects/:id/issues", post(routes::projects::create_project_issue))
        .route("/issues", post(routes::issues::create_issue))
        .route(
            "/issues/:id",
            get(routes::issues::get_issue)
                .put(routes::issues::update_issue)
                .delete(routes::issues::delete_issue),
        )
        .layer(jwt_layer);

    let v1_routes = public_routes.merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

/// CORS for the configured origins; `*` is fully permissive
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}
