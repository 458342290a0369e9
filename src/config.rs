use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown APP_ENV: {other}"),
        }
    }

    /// Raw error text is only exposed to clients outside production.
    pub fn exposes_error_details(self) -> bool {
        self != Self::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let env = match std::env::var("APP_ENV") {
            Ok(v) => Environment::parse(&v)?,
            Err(_) => Environment::Development,
        };
        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(env == Environment::Development);
        let rate_limit = RateLimitConfig {
            max_requests: parse_or("RATE_LIMIT_MAX", 100),
            window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 15 * 60),
        };
        Ok(Self {
            database_url,
            env,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 3000),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            run_migrations,
            rate_limit,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
