//! Configuration loading from environment.

use std::env;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Enables the outbox worker when set.
    pub event_webhook_url: Option<String>,
    pub log_format: LogFormat,
    /// Enables OTLP trace export when set.
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = non_empty("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?;

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let log_format = match non_empty("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            port,
            database_url,
            event_webhook_url: non_empty("EVENT_WEBHOOK_URL"),
            log_format,
            otlp_endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "memory://")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "memory://");
        assert_eq!(config.event_webhook_url, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_database_url_is_required() {
        let err = load(&[("PORT", "8080")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_all_settings() {
        let config = load(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "sqlite://payments.db?mode=rwc"),
            ("EVENT_WEBHOOK_URL", "http://127.0.0.1:4000/webhook"),
            ("LOG_FORMAT", "json"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.event_webhook_url.as_deref(),
            Some("http://127.0.0.1:4000/webhook")
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[("DATABASE_URL", "memory://"), ("EVENT_WEBHOOK_URL", "  ")]).unwrap();
        assert_eq!(config.event_webhook_url, None);
    }

    #[test]
    fn test_invalid_port() {
        assert!(load(&[("DATABASE_URL", "memory://"), ("PORT", "http")]).is_err());
    }
}
