/// Common test utilities for API tests
///
/// The router runs over the in-memory store and cache, so these tests need
/// no external services. The database pool is lazy and never connected.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskboard_api::middleware::auth::{create_token, Claims};
use taskboard_shared::cache::{memory::MemoryCache, CacheConfig, CacheGateway};
use taskboard_shared::events::TracingPublisher;
use taskboard_shared::services::ServiceContext;
use taskboard_shared::store::memory::MemoryStore;
use tokio_util::sync::CancellationToken;
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing the router and its backing store
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub shutdown: CancellationToken,
    pub owner: Uuid,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://taskboard@127.0.0.1:1/unused".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
            },
            cache: CacheConfig::default(),
        };

        let db = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy(&config.database.url)?;

        let store = Arc::new(MemoryStore::new());
        let ctx = ServiceContext::new(
            store.clone(),
            CacheGateway::new(Arc::new(MemoryCache::new())),
            Arc::new(TracingPublisher),
        );
        let owner = store.seed_user("owner@example.com").await.id;

        let shutdown = CancellationToken::new();
        let app = build_router(AppState::new(db, ctx, config, shutdown.clone()));

        Ok(Self {
            app,
            store,
            shutdown,
            owner,
        })
    }

    /// Bearer header value for `user_id`
    pub fn auth_header(&self, user_id: Uuid) -> String {
        let token = create_token(&Claims::new(user_id), JWT_SECRET).expect("Failed to sign token");
        format!("Bearer {}", token)
    }

    /// Sends a request as `user_id` and returns the status and JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user_id: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("authorization", self.auth_header(user_id));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .call(request)
            .await
            .expect("Router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Creates a company and a board owned by `self.owner`, returning their ids
    pub async fn company_with_board(&self) -> (Uuid, Uuid) {
        let (status, company) = self
            .send(
                "POST",
                "/v1/companies",
                Some(self.owner),
                Some(serde_json::json!({ "name": "Acme" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", company);
        let company_id = id_of(&company);

        let (status, board) = self
            .send(
                "POST",
                &format!("/v1/companies/{}/boards", company_id),
                Some(self.owner),
                Some(serde_json::json!({ "name": "Roadmap" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", board);

        (company_id, id_of(&board))
    }
}

pub fn id_of(json: &Value) -> Uuid {
    json["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("response has an id")
}
