use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{config::Config, utils::error_codes};

#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Arc<Config>) -> Self {
        Self { redis, config }
    }

    // x-real-ip 优先，其次 x-forwarded-for 第一个非空值，最后是连接地址
    fn client_ip(req: &Request<Body>) -> String {
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        req.headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .or_else(|| {
                req.headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .or(remote_ip.as_deref())
            .unwrap_or("unknown")
            .trim()
            .to_string()
    }

    // SET NX EX 与 INCR 在同一个 MULTI 中执行，计数键总是带过期时间
    fn window_pipeline(key: &str, window_secs: u64) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("NX")
            .arg("EX")
            .arg(window_secs)
            .ignore()
            .incr(key, 1);
        pipe
    }

    async fn hit(&self, ip: &str) -> redis::RedisResult<u32> {
        let key = format!("rate_limit:{}", ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (count,): (u32,) =
            Self::window_pipeline(&key, self.config.rate_limit_window().as_secs())
                .query_async(&mut conn)
                .await?;

        Ok(count)
    }

    pub async fn check_rate_limit(&self, req: Request<Body>, next: Next) -> Response {
        let ip = Self::client_ip(&req);

        let count = match self.hit(&ip).await {
            Ok(count) => count,
            Err(e) => {
                // Redis 不可用时放行
                tracing::error!("Rate limiter unavailable for {}: {}", ip, e);
                return next.run(req).await;
            }
        };

        if count > self.config.rate_limit_requests {
            tracing::warn!("Rate limit exceeded for {} ({} requests)", ip, count);
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "code": error_codes::RATE_LIMIT,
                    "error_message": format!(
                        "请求过于频繁，请在{}秒后重试",
                        self.config.rate_limit_window().as_secs()
                    ),
                })),
            )
                .into_response();
        }

        next.run(req).await
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
