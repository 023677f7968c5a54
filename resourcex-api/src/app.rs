/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use resourcex_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = resourcex_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```
use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use resourcex_shared::auth::middleware::authenticate;
use resourcex_shared::models::resource::OverduePolicy;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// The configured overdue policy for dashboard statistics
    pub fn overdue_policy(&self) -> OverduePolicy {
        OverduePolicy {
            exclude_cancelled: self.config.dashboard.overdue_excludes_cancelled,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                    # Health check (public)
/// ├── /v1/                       # API v1 (versioned)
/// │   ├── /auth/                 # Authentication endpoints (public)
/// │   │   ├── POST /register
/// │   │   ├── POST /login
/// │   │   ├── POST /refresh
/// │   │   └── GET  /verify-email/:token
/// │   ├── GET /me                # Current user (authenticated)
/// │   ├── /resources/            # Resource CRUD (authenticated, scoped)
/// │   │   ├── GET    /           # List with filters and pagination
/// │   │   ├── POST   /           # Create
/// │   │   ├── GET    /:uuid      # Show
/// │   │   ├── PUT    /:uuid      # Update (owner or admin)
/// │   │   └── DELETE /:uuid      # Soft delete (owner or admin)
/// │   ├── GET /dashboard         # Aggregated statistics (authenticated)
/// │   └── /users/                # User collections
/// │       ├── GET /              # List (admin only)
/// │       ├── GET /stats         # Statistics (admin only)
/// │       └── GET /assignment    # Assignable users (authenticated)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Response compression (gzip/brotli, negotiated per request)
/// 4. Security headers
/// 5. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/verify-email/:token", get(routes::auth::verify_email));

    // Resource routes (require JWT authentication)
    let resource_routes = Router::new()
        .route(
            "/",
            get(routes::resources::list_resources).post(routes::resources::create_resource),
        )
        .route(
            "/:uuid",
            get(routes::resources::show_resource)
                .put(routes::resources::update_resource)
                .delete(routes::resources::delete_resource),
        );

    // User collection routes (authenticated; list/stats are admin-only in
    // their handlers)
    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/stats", get(routes::users::user_stats))
        .route("/assignment", get(routes::users::users_for_assignment));

    // Everything behind authentication
    let protected_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .nest("/resources", resource_routes)
        .route("/dashboard", get(routes::dashboard::dashboard))
        .nest("/users", user_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new().nest("/auth", auth_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
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
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the Bearer token, loads the user and their roles from the
/// database, and injects the resulting AuthContext into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_context = authenticate(&state.db, state.jwt_secret(), req.headers()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
