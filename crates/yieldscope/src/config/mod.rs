use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::pipeline::{PipelineConfig, RentSource};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
///
/// Everything the pipeline needs is loaded here once and passed in
/// explicitly; no stage reads ambient process state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub upstream: UpstreamConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upstream = UpstreamConfig::load()?;

        let rent_source = RentSource::from_str(
            &env::var("RENT_SOURCE").unwrap_or_else(|_| "market".to_string()),
        );
        let max_listings = env::var("MAX_LISTINGS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidMaxListings)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            upstream,
            pipeline: PipelineConfig {
                rent_source,
                max_listings,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials and endpoints for the two generation services.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub search_api_key: String,
    pub search_base_url: String,
    pub search_model: String,
    pub parser_api_key: String,
    pub parser_base_url: String,
    pub parser_model: String,
    pub request_timeout: Duration,
}

impl UpstreamConfig {
    fn load() -> Result<Self, ConfigError> {
        let search_api_key = require_key("PERPLEXITY_API_KEY")?;
        let parser_api_key = require_key("OPENAI_API_KEY")?;

        let search_base_url =
            env::var("SEARCH_BASE_URL").unwrap_or_else(|_| "https://api.perplexity.ai".to_string());
        let search_model = env::var("SEARCH_MODEL").unwrap_or_else(|_| "sonar-pro".to_string());
        let parser_base_url =
            env::var("PARSER_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let parser_model = env::var("PARSER_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());

        let timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "90".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        Ok(Self {
            search_api_key,
            search_base_url,
            search_model,
            parser_api_key,
            parser_base_url,
            parser_model,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn require_key(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingKey { name }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidMaxListings,
    MissingKey { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidMaxListings => {
                write!(f, "MAX_LISTINGS must be a non-negative integer")
            }
            ConfigError::MissingKey { name } => {
                write!(f, "{name} is missing from the environment")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PERPLEXITY_API_KEY",
            "OPENAI_API_KEY",
            "SEARCH_BASE_URL",
            "SEARCH_MODEL",
            "PARSER_BASE_URL",
            "PARSER_MODEL",
            "UPSTREAM_TIMEOUT_SECS",
            "RENT_SOURCE",
            "MAX_LISTINGS",
        ] {
            env::remove_var(name);
        }
    }

    fn set_required_keys() {
        env::set_var("PERPLEXITY_API_KEY", "pplx-test");
        env::set_var("OPENAI_API_KEY", "sk-test");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_keys();

        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.upstream.search_model, "sonar-pro");
        assert_eq!(config.upstream.request_timeout, Duration::from_secs(90));
        assert_eq!(config.pipeline.rent_source, RentSource::MarketScalar);
        assert_eq!(config.pipeline.max_listings, 10);
    }

    #[test]
    fn load_fails_without_api_keys() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        let error = AppConfig::load().expect_err("missing keys must fail");
        assert!(matches!(
            error,
            ConfigError::MissingKey {
                name: "PERPLEXITY_API_KEY"
            }
        ));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_keys();
        env::set_var("APP_HOST", "localhost");

        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rent_source_env_selects_the_variant() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_keys();
        env::set_var("RENT_SOURCE", "per-listing");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.pipeline.rent_source, RentSource::PerListing);
    }
}
