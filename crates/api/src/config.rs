//! Process configuration from the environment.

use orgdesk_crud::export::DEFAULT_CHUNK_SIZE;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// In-memory backend when absent.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub export_chunk_size: u64,
    pub token_ttl_minutes: i64,
    /// Prefix for links sent by e-mail, e.g. verification links.
    pub public_base_url: String,
}

pub const DEV_JWT_SECRET: &str = "dev-secret";

impl AppConfig {
    /// Load `.env` (if any), then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            jwt_secret,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_positive(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10)?,
            export_chunk_size: parse_positive(get("EXPORT_CHUNK_SIZE"), "EXPORT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            token_ttl_minutes: parse_positive(get("TOKEN_TTL_MINUTES"), "TOKEN_TTL_MINUTES", 60)?,
            public_base_url: get("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
        })
    }
}

fn parse_positive<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::Invalid {
            key,
            expected: "a positive integer",
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.export_chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.token_ttl_minutes, 60);
        assert_eq!(cfg.public_base_url, "http://localhost:8080");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.jwt_secret, "s3cret");
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = config(&[("EXPORT_CHUNK_SIZE", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "EXPORT_CHUNK_SIZE", .. }));
        assert!(config(&[("TOKEN_TTL_MINUTES", "0")]).is_err());
    }
}
