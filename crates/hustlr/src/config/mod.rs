use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// bcrypt refuses costs outside this window.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

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
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
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

        let fixture_path = env::var("APP_FIXTURE_PATH")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let bcrypt_cost = match env::var("APP_BCRYPT_COST") {
            Ok(raw) => parse_bcrypt_cost(&raw)?,
            Err(_) => DEFAULT_BCRYPT_COST,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                include_targets: environment == AppEnvironment::Development,
            },
            storage: StorageConfig { fixture_path },
            security: SecurityConfig { bcrypt_cost },
        })
    }
}

fn parse_bcrypt_cost(raw: &str) -> Result<u32, ConfigError> {
    let cost = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidBcryptCost {
            value: raw.to_string(),
        })?;
    if (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        Ok(cost)
    } else {
        Err(ConfigError::InvalidBcryptCost {
            value: raw.to_string(),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub include_targets: bool,
}

/// Where the in-memory store is seeded from at startup.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub fixture_path: Option<PathBuf>,
}

/// Password hashing work factor.
#[derive(Debug, Clone, Copy)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBcryptCost { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBcryptCost { value } => write!(
                f,
                "APP_BCRYPT_COST must be an integer between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST} (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidBcryptCost { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_FIXTURE_PATH");
        env::remove_var("APP_BCRYPT_COST");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.storage.fixture_path.is_none());
        assert_eq!(config.security.bcrypt_cost, DEFAULT_BCRYPT_COST);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_fixture_path_and_cost() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_FIXTURE_PATH", "demos/marketplace.json");
        env::set_var("APP_BCRYPT_COST", "4");
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.storage.fixture_path,
            Some(PathBuf::from("demos/marketplace.json"))
        );
        assert_eq!(config.security.bcrypt_cost, 4);
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(!config.telemetry.include_targets);
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_bcrypt_cost() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_BCRYPT_COST", "3");
        match AppConfig::load() {
            Err(ConfigError::InvalidBcryptCost { value }) => assert_eq!(value, "3"),
            other => panic!("expected invalid cost, got {other:?}"),
        }
        reset_env();
    }
}
