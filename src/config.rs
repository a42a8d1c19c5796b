use dotenvy::dotenv;
use std::env;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub fcm_api_key: Option<String>,
    /// Number of messages replayed to a session right after it joins.
    pub history_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8002);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;

        let fcm_api_key = match env::var("FCM_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(key),
            _ => None,
        };

        let history_limit = env::var("CHAT_HISTORY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
            fcm_api_key,
            history_limit,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 8002,
            jwt_secret: "test-secret".into(),
            fcm_api_key: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_history_limit() {
        let cfg = Config::test_defaults();
        assert_eq!(cfg.history_limit, 50);
        assert!(cfg.fcm_api_key.is_none());
    }
}
