use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use config::Config;
use middleware::{
    RateLimiter, auth_middleware, log_errors, rate_limit, refresh_auth_middleware,
};
use store::Store;
use utils::TokenService;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub redis: Option<Arc<redis::Client>>,
}

impl AppState {
    pub fn new(store: Store, config: Config, redis: Option<redis::Client>) -> Self {
        let tokens = TokenService::new(&config);
        Self {
            store,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            redis: redis.map(Arc::new),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(routes::user::login))
        .route("/registration", post(routes::user::register))
        .route("/reset-password", post(routes::user::reset_password));

    // 刷新令牌也可用于换取新令牌
    let refresh_routes = Router::new()
        .route("/users/{id}/refresh", post(routes::user::refresh_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            refresh_auth_middleware,
        ));

    let protected_routes = Router::new()
        // 用户
        .route(
            "/users/{id}",
            get(routes::user::get_user).put(routes::user::update_user),
        )
        .route("/users/login/{login}", get(routes::user::find_by_login))
        // 好友
        .route(
            "/users/{id}/friends",
            get(routes::friend::list_friends).post(routes::friend::add_friend),
        )
        .route(
            "/users/{id}/friends/{friend_id}",
            delete(routes::friend::remove_friend),
        )
        // 聊天
        .route(
            "/chats",
            get(routes::chat::list_chats).post(routes::chat::create_chat),
        )
        .route(
            "/chats/{id}",
            get(routes::chat::get_chat).delete(routes::chat::delete_chat),
        )
        .route("/chats/{id}/exit", delete(routes::chat::exit_chat))
        .route("/chats/{id}/clean", delete(routes::chat::clean_chat))
        // 消息
        .route("/chats/{id}/messages", get(routes::message::list_messages))
        .route(
            "/chats/{id}/messages/last",
            get(routes::message::last_message_id),
        )
        .route("/messages", post(routes::message::create_message))
        .route("/messages/{id}", delete(routes::message::delete_message))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .merge(public_routes)
        .merge(refresh_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(log_errors));

    let router = match &state.redis {
        Some(redis) => {
            let limiter = Arc::new(RateLimiter::new(redis.clone(), state.config.clone()));
            router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit))
        }
        None => {
            tracing::info!("REDIS_URL not set, rate limiting disabled");
            router
        }
    };

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
