use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::env;
use std::fmt;

/// Default bind port, matching the storefront's historical deployment
const DEFAULT_PORT: u16 = 5001;

/// Default request body cap (10 MB)
const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: Option<MediaConfig>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub body_limit_bytes: usize,
    pub shutdown_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
}

/// Image-host credentials. All three values must be present for the
/// media client to be constructed; otherwise the server runs without
/// upload support.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Explicit allow-list; empty means wildcard
    pub allowed_origins: Vec<String>,
}

/// Deployment environment, reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let server_host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid PORT".to_string()))?;

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let body_limit_bytes = env::var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|_| DEFAULT_BODY_LIMIT_BYTES.to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid BODY_LIMIT_BYTES".to_string()))?;
        let shutdown_timeout_seconds = env::var("SHUTDOWN_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                AppError::Configuration("Invalid SHUTDOWN_TIMEOUT_SECONDS".to_string())
            })?;

        let database_uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let database_name = env::var("MONGODB_DB").unwrap_or_else(|_| "savora".to_string());

        // Image-host credentials are optional as a trio
        let media = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(MediaConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        // Authentication config
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::MissingEnvVar("JWT_SECRET".to_string()))?;
        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid JWT_EXPIRATION_HOURS".to_string()))?;

        // Rate limit config
        let requests_per_minute = env::var("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid RATE_LIMIT_PER_MINUTE".to_string()))?;
        let burst_size = env::var("RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid RATE_LIMIT_BURST".to_string()))?;

        // CORS allow-list comes from the storefront URL(s); empty entries
        // are filtered out and an empty list falls back to wildcard
        let allowed_origins = parse_allowed_origins(env::var("FRONTEND_URL").ok().as_deref())?;

        let config = Config {
            server: ServerConfig {
                host: server_host,
                port: server_port,
                environment,
                body_limit_bytes,
                shutdown_timeout_seconds,
            },
            database: DatabaseConfig {
                uri: database_uri,
                name: database_name,
            },
            media,
            auth: AuthConfig {
                jwt_secret,
                jwt_expiration_hours,
            },
            rate_limit: RateLimitConfig {
                requests_per_minute,
                burst_size,
            },
            cors: CorsConfig { allowed_origins },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        if self.database.name.is_empty() {
            return Err(AppError::Configuration(
                "MONGODB_DB cannot be empty".to_string(),
            ));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(AppError::Configuration(
                "BODY_LIMIT_BYTES must be greater than 0".to_string(),
            ));
        }

        if self.server.shutdown_timeout_seconds == 0 {
            return Err(AppError::Configuration(
                "SHUTDOWN_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        // Validate JWT settings
        if self.auth.jwt_secret.len() < 32 {
            return Err(AppError::Configuration(
                "JWT_SECRET must be at least 32 characters for security".to_string(),
            ));
        }

        if self.auth.jwt_expiration_hours < 1 {
            return Err(AppError::Configuration(
                "JWT_EXPIRATION_HOURS must be at least 1".to_string(),
            ));
        }

        // Validate rate limiting settings
        if self.rate_limit.requests_per_minute == 0 {
            return Err(AppError::Configuration(
                "RATE_LIMIT_PER_MINUTE must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.burst_size == 0 {
            return Err(AppError::Configuration(
                "RATE_LIMIT_BURST must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Split the comma-separated origin list, dropping empty entries.
/// `*` (or no value at all) selects the wildcard policy.
fn parse_allowed_origins(raw: Option<&str>) -> AppResult<Vec<String>> {
    let raw = match raw {
        Some(s) if s.trim() != "*" => s,
        _ => return Ok(Vec::new()),
    };

    let mut origins = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        url::Url::parse(entry)
            .map_err(|e| AppError::Configuration(format!("Invalid origin '{}': {}", entry, e)))?;
        origins.push(entry.to_string());
    }
    Ok(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5001,
                environment: Environment::Development,
                body_limit_bytes: 10 * 1024 * 1024,
                shutdown_timeout_seconds: 30,
            },
            database: DatabaseConfig {
                uri: "mongodb://localhost:27017".to_string(),
                name: "savora_test".to_string(),
            },
            media: None,
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                jwt_expiration_hours: 24,
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 120,
                burst_size: 20,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
            },
        }
    }

    #[test]
    fn test_config_creation() {
        let config = base_config();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = base_config();
        config.auth.jwt_secret = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let mut config = base_config();
        config.server.body_limit_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_allowed_origins_filters_empties() {
        let origins =
            parse_allowed_origins(Some("https://shop.example.com,, https://admin.example.com ,"))
                .unwrap();
        assert_eq!(
            origins,
            vec![
                "https://shop.example.com".to_string(),
                "https://admin.example.com".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_allowed_origins_wildcard() {
        assert!(parse_allowed_origins(Some("*")).unwrap().is_empty());
        assert!(parse_allowed_origins(None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_allowed_origins_invalid() {
        assert!(parse_allowed_origins(Some("not a url")).is_err());
    }

    #[test]
    fn test_environment_labels() {
        assert_eq!(Environment::Development.as_str(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
