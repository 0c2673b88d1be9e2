//! HTTP test harness: a full router over an in-memory database

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};

use crate::api::{build_router, AppState};
use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::fixtures::migrated_pool;
use crate::db::repositories::{SqlxUserRepository, UserRepository};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::hash_password;

pub struct TestApp {
    pub server: TestServer,
    pub pool: DynDatabasePool,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let pool = migrated_pool().await;
        let cache = create_cache(&config.cache);
        let state = AppState::build(pool.clone(), cache, &config);
        let server = TestServer::new(build_router(state.clone(), &config.server.cors_origin)).unwrap();
        Self { server, pool, state }
    }

    /// Create a user, log in and return an `Authorization` header for it
    pub async fn bearer_for(&self, username: &str, is_staff: bool) -> (HeaderName, HeaderValue) {
        create_user(&self.pool, username, "correct-horse", is_staff).await;
        let token = login(&self.server, username, "correct-horse").await;
        (
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }
}

pub async fn create_user(pool: &DynDatabasePool, username: &str, password: &str, is_staff: bool) -> User {
    let hash = hash_password(password).unwrap();
    SqlxUserRepository::new(pool.clone())
        .create(username, &format!("{}@example.com", username), &hash, is_staff)
        .await
        .unwrap()
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": username, "password": password }))
        .await;
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}
