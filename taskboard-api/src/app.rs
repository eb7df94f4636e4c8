/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use taskboard_shared::cache::{memory::MemoryCache, CacheGateway};
/// use taskboard_shared::events::TracingPublisher;
/// use taskboard_shared::services::ServiceContext;
/// use taskboard_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let ctx = ServiceContext::new(
///     Arc::new(PgStore::new(pool.clone())),
///     CacheGateway::new(Arc::new(MemoryCache::new())),
///     Arc::new(TracingPublisher),
/// );
/// let state = AppState::new(pool, ctx, config, CancellationToken::new());
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::auth::jwt_auth_layer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::cache::CacheGateway;
use taskboard_shared::services::{ServiceContext, Services};
use tokio_util::sync::CancellationToken;
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
    /// Database connection pool, used for health checks
    pub db: PgPool,

    /// Domain services
    pub services: Services,

    /// Cache the services read through, reported by health checks
    pub cache: CacheGateway,

    /// Application configuration
    pub config: Arc<Config>,

    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: PgPool, ctx: ServiceContext, config: Config, shutdown: CancellationToken) -> Self {
        Self {
            db,
            cache: ctx.cache.clone(),
            services: Services::new(ctx),
            config: Arc::new(config),
            shutdown,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Cancellation token for one request, cancelled on server shutdown
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/                                  (bearer token required)
///     ├── POST              /companies
///     ├── GET|PATCH|DELETE  /companies/:id
///     ├── GET|POST          /companies/:id/boards
///     ├── GET|POST          /companies/:id/task-types
///     ├── GET               /boards
///     ├── GET|PATCH|DELETE  /boards/:id
///     ├── GET               /boards/:id/users
///     ├── POST|DELETE       /boards/:id/users/:user_id
///     ├── GET|POST          /boards/:id/columns
///     ├── GET|POST          /boards/:id/tasks
///     ├── DELETE            /columns/:id
///     ├── GET|PATCH|DELETE  /tasks/:id
///     ├── POST              /memberships
///     └── DELETE            /memberships/:id
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let v1_routes = Router::new()
        .route("/companies", post(routes::companies::create_company))
        .route(
            "/companies/:id",
            get(routes::companies::get_company)
                .patch(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        )
        .route(
            "/companies/:id/boards",
            get(routes::companies::list_company_boards).post(routes::boards::create_board),
        )
        .route(
            "/companies/:id/task-types",
            get(routes::task_types::list_task_types).post(routes::task_types::create_task_type),
        )
        .route("/boards", get(routes::boards::list_my_boards))
        .route(
            "/boards/:id",
            get(routes::boards::get_board)
                .patch(routes::boards::update_board)
                .delete(routes::boards::delete_board),
        )
        .route("/boards/:id/users", get(routes::boards::list_board_users))
        .route(
            "/boards/:id/users/:user_id",
            post(routes::boards::add_board_user).delete(routes::boards::remove_board_user),
        )
        .route(
            "/boards/:id/columns",
            get(routes::columns::list_columns).post(routes::columns::create_column),
        )
        .route(
            "/boards/:id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/columns/:id", delete(routes::columns::delete_column))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/memberships", post(routes::memberships::grant_membership))
        .route("/memberships/:id", delete(routes::memberships::revoke_membership))
        .layer(axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
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
        .with_state(state)
}
