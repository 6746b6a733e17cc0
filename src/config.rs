use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{BROWSER_USER_AGENT, DEFAULT_BATCH_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web Server
    pub web_host: String,
    pub web_port: u16,

    // Fetching
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub like_delay: Duration,

    // Upstream HTTP client
    pub http: HttpSettings,

    // Layout canvas
    pub canvas_width: f64,
    pub canvas_height: f64,

    // Summaries
    pub personas_path: Option<PathBuf>,
}

/// Network settings for the upstream HTTP client.
///
/// Built once at startup and handed to every client constructor; nothing
/// mutates process-wide network state at runtime.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
    /// Optional proxy URL all upstream traffic is routed through.
    pub upstream_proxy: Option<String>,
    /// Bind outgoing sockets to IPv4 so name resolution never picks IPv6.
    pub prefer_ipv4: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: BROWSER_USER_AGENT.to_string(),
            upstream_proxy: None,
            prefer_ipv4: false,
        }
    }
}

impl HttpSettings {
    /// Build a `reqwest` client from these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the TLS backend
    /// cannot be initialized.
    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone());

        if let Some(proxy) = &self.upstream_proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        if self.prefer_ipv4 {
            builder = builder.local_address(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
        }

        builder.build()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,

            // Fetching
            batch_size: parse_env_usize("FETCH_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            batch_delay: Duration::from_millis(parse_env_u64("BATCH_DELAY_MS", 200)?),
            like_delay: Duration::from_millis(parse_env_u64("LIKE_DELAY_MS", 50)?),

            // Upstream HTTP client
            http: HttpSettings {
                timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
                user_agent: BROWSER_USER_AGENT.to_string(),
                upstream_proxy: optional_env("UPSTREAM_PROXY"),
                prefer_ipv4: parse_env_bool("PREFER_IPV4", false)?,
            },

            // Layout canvas
            canvas_width: f64::from(parse_env_u32("CANVAS_WIDTH", 800)?),
            canvas_height: f64::from(parse_env_u32("CANVAS_HEIGHT", 500)?),

            // Summaries
            personas_path: optional_env("PERSONAS_PATH").map(PathBuf::from),
        })
    }

    /// Defaults without touching the environment.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::ZERO,
            like_delay: Duration::ZERO,
            http: HttpSettings {
                timeout: Duration::from_secs(10),
                ..HttpSettings::default()
            },
            canvas_width: 800.0,
            canvas_height: 500.0,
            personas_path: None,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_BATCH_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        // The layout keeps a 20 unit margin on every side.
        if self.canvas_width < 100.0 || self.canvas_height < 100.0 {
            return Err(ConfigError::InvalidValue {
                name: "CANVAS_WIDTH/CANVAS_HEIGHT".to_string(),
                message: "must both be at least 100".to_string(),
            });
        }
        if let Some(proxy) = &self.http.upstream_proxy {
            if url::Url::parse(proxy).is_err() {
                return Err(ConfigError::InvalidValue {
                    name: "UPSTREAM_PROXY".to_string(),
                    message: format!("not a valid URL: '{proxy}'"),
                });
            }
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
