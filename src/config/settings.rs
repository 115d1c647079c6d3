//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::protocol::SERVER_NAME;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting settings.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Tool execution timeout settings.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.rate <= 0.0 {
            return Err(ConfigError::ValidationError {
                message: format!("Tool rate limit must be positive, got {}", self.limits.rate),
            });
        }
        if self.limits.burst <= 0.0 {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Tool burst capacity must be positive, got {}",
                    self.limits.burst
                ),
            });
        }

        // The global bucket is configured as a pair or not at all.
        match (self.limits.global_rate, self.limits.global_burst) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::ValidationError {
                    message: "global_rate and global_burst must be set together".to_string(),
                });
            }
            (Some(rate), Some(burst)) => {
                if rate <= 0.0 {
                    return Err(ConfigError::ValidationError {
                        message: format!("Global rate limit must be positive, got {rate}"),
                    });
                }
                if burst <= 0.0 {
                    return Err(ConfigError::ValidationError {
                        message: format!("Global burst capacity must be positive, got {burst}"),
                    });
                }
            }
            (None, None) => {}
        }

        if self.timeouts.default_seconds < 0.0 {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Default timeout must be zero or positive, got {}",
                    self.timeouts.default_seconds
                ),
            });
        }
        for (tool, seconds) in &self.timeouts.per_tool {
            if *seconds < 0.0 {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Timeout for tool '{tool}' must be zero or positive, got {seconds}"
                    ),
                });
            }
        }

        if self.http.bind.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "HTTP bind address cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported by initialize and the health endpoint.
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

fn default_server_name() -> String {
    SERVER_NAME.to_string()
}

/// Rate limiting configuration.
///
/// Each tool gets its own token bucket with `rate`/`burst`. The optional
/// pair `global_rate`/`global_burst` adds one bucket shared across every
/// tool on top.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Tokens added per second to each per-tool bucket.
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Maximum tokens a per-tool bucket can hold.
    #[serde(default = "default_burst")]
    pub burst: f64,

    /// Tokens added per second to the shared bucket, when enabled.
    #[serde(default)]
    pub global_rate: Option<f64>,

    /// Maximum tokens the shared bucket can hold, when enabled.
    #[serde(default)]
    pub global_burst: Option<f64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            burst: default_burst(),
            global_rate: None,
            global_burst: None,
        }
    }
}

fn default_rate() -> f64 {
    5.0
}

fn default_burst() -> f64 {
    10.0
}

/// Tool execution timeout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutsConfig {
    /// Budget in seconds for tools without an override. Zero disables the
    /// deadline.
    #[serde(default = "default_timeout_seconds")]
    pub default_seconds: f64,

    /// Per-tool overrides, keyed by tool name.
    #[serde(default)]
    pub per_tool: HashMap<String, f64>,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_seconds: default_timeout_seconds(),
            per_tool: HashMap::new(),
        }
    }
}

fn default_timeout_seconds() -> f64 {
    30.0
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Socket address the HTTP transport binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": {
                "name": "staging-toolhost"
            },
            "limits": {
                "rate": 2.0,
                "burst": 4.0,
                "global_rate": 20.0,
                "global_burst": 40.0
            },
            "timeouts": {
                "default_seconds": 10.0,
                "per_tool": {
                    "slow_tool": 120.0,
                    "streaming_tool": 0.0
                }
            },
            "http": {
                "bind": "0.0.0.0:9090"
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.name, "staging-toolhost");
        assert!((config.limits.rate - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.limits.global_burst, Some(40.0));
        assert!((config.timeouts.default_seconds - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.timeouts.per_tool.get("slow_tool"), Some(&120.0));
        assert_eq!(config.http.bind, "0.0.0.0:9090");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn limits_config_defaults() {
        let config = LimitsConfig::default();
        assert!((config.rate - 5.0).abs() < f64::EPSILON);
        assert!((config.burst - 10.0).abs() < f64::EPSILON);
        assert!(config.global_rate.is_none());
        assert!(config.global_burst.is_none());
    }

    #[test]
    fn timeouts_config_defaults() {
        let config = TimeoutsConfig::default();
        assert!((config.default_seconds - 30.0).abs() < f64::EPSILON);
        assert!(config.per_tool.is_empty());
    }

    #[test]
    fn http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.bind, "127.0.0.1:8080");
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_non_positive_rate() {
        let json = r#"{ "limits": { "rate": -1.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());

        let json = r#"{ "limits": { "rate": 0.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_lone_global_setting() {
        let json = r#"{ "limits": { "global_rate": 10.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("set together"));
    }

    #[test]
    fn reject_negative_timeout() {
        let json = r#"{ "timeouts": { "default_seconds": -5.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_negative_per_tool_timeout() {
        let json = r#"{ "timeouts": { "per_tool": { "bad": -1.0 } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_allowed() {
        let json = r#"{ "timeouts": { "default_seconds": 0.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
    }
}
