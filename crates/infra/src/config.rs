//! Process configuration, read from environment variables (and a `.env`
//! file when one is present).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use stockroom_observability::LogFormat;
use thiserror::Error;

const DEV_COOKIE_SECRET: &str = "stockroom-dev-cookie-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub use_persistent_stores: bool,
    pub cookie_secret: String,
    /// Accept a correctly signed session without loading its user.
    pub trust_cookie: bool,
    pub client_origin: Option<String>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("use_persistent_stores", &self.use_persistent_stores)
            .field("cookie_secret", &"<redacted>")
            .field("trust_cookie", &self.trust_cookie)
            .field("client_origin", &self.client_origin)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            database_url: None,
            use_persistent_stores: false,
            cookie_secret: DEV_COOKIE_SECRET.to_string(),
            trust_cookie: false,
            client_origin: None,
            log_format: LogFormat::default(),
        }
    }
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(name, value, "expected true or false")),
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("PORT") {
            config.port = value.trim().parse().map_err(|e| invalid("PORT", &value, e))?;
        }
        if let Some(value) = get("BIND_ADDR") {
            config.bind_addr = value.trim().parse().map_err(|e| invalid("BIND_ADDR", &value, e))?;
        }
        if let Some(value) = get("USE_PERSISTENT_STORES") {
            config.use_persistent_stores = parse_bool("USE_PERSISTENT_STORES", &value)?;
        }
        if let Some(value) = get("AUTH_TRUST_COOKIE") {
            config.trust_cookie = parse_bool("AUTH_TRUST_COOKIE", &value)?;
        }
        if let Some(value) = get("LOG_FORMAT") {
            config.log_format = value.parse().map_err(|e: String| invalid("LOG_FORMAT", &value, e))?;
        }
        config.database_url = get("DATABASE_URL");
        config.client_origin = get("CLIENT_ORIGIN");

        if let Some(secret) = get("COOKIE_SECRET") {
            config.cookie_secret = secret;
        }

        if config.use_persistent_stores && config.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(config)
    }

    /// True when sessions are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.cookie_secret == DEV_COOKIE_SECRET
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert!(!config.use_persistent_stores);
        assert!(!config.trust_cookie);
        assert!(config.uses_dev_secret());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn variables_override_defaults() {
        let config = load(&[
            ("PORT", "8081"),
            ("BIND_ADDR", "127.0.0.1"),
            ("AUTH_TRUST_COOKIE", "TRUE"),
            ("COOKIE_SECRET", "s3cret"),
            ("CLIENT_ORIGIN", "http://localhost:5173"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8081");
        assert!(config.trust_cookie);
        assert_eq!(config.cookie_secret, "s3cret");
        assert_eq!(config.client_origin.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn bad_values_are_reported_by_name() {
        match load(&[("PORT", "eighty")]).unwrap_err() {
            ConfigError::Invalid { name, .. } => assert_eq!(name, "PORT"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(load(&[("AUTH_TRUST_COOKIE", "maybe")]).is_err());
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        assert_eq!(
            load(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        let config = load(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/stockroom"),
        ])
        .unwrap();
        assert!(config.use_persistent_stores);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = load(&[("COOKIE_SECRET", "hunter2")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
