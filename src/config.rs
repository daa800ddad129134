// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

/// Number of answer options an authored objective question must carry.
pub const OBJECTIVE_OPTION_COUNT: usize = 4;

/// Upper bound for an exam's duration, in minutes.
pub const MAX_EXAM_DURATION_MINUTES: u32 = 600;

/// How many times the countdown retries a failed auto-submit before giving up.
pub const AUTO_SUBMIT_ATTEMPTS: u32 = 3;

/// Pause between auto-submit attempts.
pub const AUTO_SUBMIT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Countdown period used when `EXAM_TICK_MILLIS` is unset, zero or not a number.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_JWT_EXPIRATION: u64 = 3600;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Countdown period of a running exam session.
    pub tick_interval: Duration,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());


        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            tick_interval: parse_tick_interval(env::var("EXAM_TICK_MILLIS").ok().as_deref()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}

fn parse_tick_interval(raw: Option<&str>) -> Duration {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TICK_INTERVAL)
}
