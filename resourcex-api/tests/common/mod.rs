/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and per-test user creation
/// - JWT token generation
/// - Request/response helpers
///
/// Integration tests need a PostgreSQL instance. Set `TEST_DATABASE_URL`
/// (or `DATABASE_URL`) to run them; without it every test skips.
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use resourcex_api::app::{build_router, AppState};
use resourcex_api::config::{ApiConfig, Config, DashboardConfig, DatabaseConfig, JwtConfig};
use resourcex_shared::auth::jwt::{create_token, Claims, TokenType};
use resourcex_shared::models::role::Role;
use resourcex_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub admin: User,
    pub admin_token: String,
    pub member: User,
    pub member_token: String,
}

impl TestContext {
    /// Creates a new test context against the test database
    ///
    /// Returns `None` when no test database is configured so the suite
    /// passes on machines without PostgreSQL.
    pub async fn new() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .ok()?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: url.clone(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_JWT_SECRET.to_string(),
            },
            dashboard: DashboardConfig {
                overdue_excludes_cancelled: false,
            },
        };

        let db = PgPool::connect(&url).await.expect("test database unreachable");

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../migrations")
            .run(&db)
            .await
            .expect("migrations failed");

        let admin = create_user_with_role(&db, "Administrator").await;
        let member = create_user_with_role(&db, "Regular User").await;

        let admin_token = token_for(&admin);
        let member_token = token_for(&member);

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Some(TestContext {
            db,
            app,
            config,
            admin,
            admin_token,
            member,
            member_token,
        })
    }

    /// Creates an additional regular user for multi-actor scenarios
    pub async fn another_member(&self) -> (User, String) {
        let user = create_user_with_role(&self.db, "Regular User").await;
        let token = token_for(&user);
        (user, token)
    }

    /// Cleans up this context's users
    ///
    /// Deletes by id so parallel tests sharing the database are unaffected;
    /// owned resources and role links go with them via cascades.
    pub async fn cleanup(&self) {
        self.delete_users(&[self.admin.id, self.member.id]).await;
    }

    /// Deletes specific users created during a test
    pub async fn delete_users(&self, ids: &[i64]) {
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.db)
            .await
            .expect("cleanup failed");
    }
}

/// Creates a user holding the named seeded role
async fn create_user_with_role(db: &PgPool, role_name: &str) -> User {
    let user = User::create(
        db,
        CreateUser {
            name: format!("Test {}", role_name),
            email: format!("itest-{}@example.com", Uuid::new_v4()),
            password_hash: "$argon2id$test-hash-not-used".to_string(),
        },
    )
    .await
    .expect("user creation failed");

    let role = Role::find_by_name(db, role_name)
        .await
        .expect("role lookup failed")
        .expect("role not seeded");
    Role::assign(db, role.id, user.id)
        .await
        .expect("role assignment failed");

    user
}

/// Issues an access token for a user
fn token_for(user: &User) -> String {
    let claims = Claims::new(user.uuid, TokenType::Access);
    create_token(&claims, TEST_JWT_SECRET).expect("token creation failed")
}

/// Sends a request through the router and returns status plus parsed JSON
///
/// The body is `Value::Null` for empty responses.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().call(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Helper to create a resource through the API, returning its JSON
pub async fn create_resource(
    ctx: &TestContext,
    token: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let (status, json) = send(&ctx.app, "POST", "/v1/resources", token, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
    json
}
