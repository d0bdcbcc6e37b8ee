#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chatter::{AppState, app, config::Config, store::Store, utils::TokenService};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// bcrypt 允许的最低成本
const TEST_COST: u32 = 4;

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        redis_url: None,
        jwt_secret: "integration-secret".to_string(),
        jwt_expiration_secs: 3600,
        refresh_token_expiration_secs: 7200,
        message_ttl_secs: 3600,
        page_limit: 2,
        bcrypt_cost: TEST_COST,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
    }
}

pub struct TestApp {
    router: Router,
    pub tokens: Arc<TokenService>,
}

pub struct Session {
    pub id: i64,
    pub token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Store::in_memory().await.unwrap();
        let state = AppState::new(store, test_config(), None);
        let tokens = state.tokens.clone();
        Self {
            router: app(state),
            tokens,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    pub async fn register(&self, login: &str, password: &str) -> Session {
        let (status, body) = self
            .request(
                Method::POST,
                "/registration",
                None,
                Some(serde_json::json!({
                    "login": login,
                    "password": password,
                    "reset_password": "secret word",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        self.session(&body)
    }

    pub fn session(&self, body: &Value) -> Session {
        let token = body["token"].as_str().unwrap().to_string();
        let refresh_token = body["refresh_token"].as_str().unwrap().to_string();
        let id = self.tokens.validate(&token).unwrap().sub;
        Session {
            id,
            token,
            refresh_token,
        }
    }
}
