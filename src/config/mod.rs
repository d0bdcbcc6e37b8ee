use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub refresh_token_expiration_secs: u64,
    pub message_ttl_secs: u64,
    pub page_limit: i64,
    pub bcrypt_cost: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = hours_var("JWT_EXPIRATION", 1);
        let refresh_expiration = hours_var("REFRESH_TOKEN_EXPIRATION", 24 * 14);
        let message_ttl = hours_var("MESSAGE_TTL", 24 * 30);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            refresh_token_expiration_secs: refresh_expiration * 3600,
            message_ttl_secs: message_ttl * 3600,
            page_limit: parsed_var("PAGE_LIMIT", 20),
            bcrypt_cost: parsed_var("BCRYPT_COST", bcrypt::DEFAULT_COST),
            rate_limit_window_secs: parsed_var("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: parsed_var("RATE_LIMIT_REQUESTS", 100),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".to_string()),
            server_port: parsed_var("SERVER_PORT", 3000),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn refresh_token_expiration(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiration_secs)
    }

    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

fn hours_var(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| parse_hours(&value))
        .unwrap_or(default)
}

// 允许 "24h" 或 "24" 两种写法
fn parse_hours(value: &str) -> Option<u64> {
    value.trim().trim_end_matches('h').parse::<u64>().ok()
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
