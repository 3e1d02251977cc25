//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `HALLUX_*` environment variables.
//! Each subsystem owns its own section ([`PipelineConfig`], [`AggregationPolicy`],
//! [`JudgeConfig`], [`LookupConfig`]); [`Config`] loads them all plus the
//! listener address.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::str::FromStr;

use crate::aggregate::AggregationPolicy;
use crate::judge::JudgeConfig;
use crate::pipeline::PipelineConfig;
use crate::sources::LookupConfig;

/// Service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `HALLUX_*` overrides on top of defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP listener. Default: `127.0.0.1:8000`.
    pub server: ServerConfig,

    pub pipeline: PipelineConfig,

    pub policy: AggregationPolicy,

    pub judges: JudgeConfig,

    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_addr: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        }
    }
}

impl ServerConfig {
    const ENV_PORT: &'static str = "HALLUX_PORT";
    const ENV_BIND_ADDR: &'static str = "HALLUX_BIND_ADDR";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
        })
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }
}

impl Config {
    /// Loads every section from the environment and validates it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pipeline = PipelineConfig::from_env()?;
        let mut lookup = LookupConfig::from_env()?;
        lookup.timeout = pipeline.lookup_attempt_timeout();

        let config = Self {
            server: ServerConfig::from_env()?,
            pipeline,
            policy: AggregationPolicy::from_env()?,
            judges: JudgeConfig::from_env()?,
            lookup,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.policy.validate()?;
        self.lookup.validate()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }
}

/// Parses `key` as `T` if it is set and non-blank.
pub(crate) fn parse_from_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

pub(crate) fn parse_u64_from_env(key: &str) -> Result<Option<u64>, ConfigError> {
    parse_from_env(key)
}

pub(crate) fn parse_f64_from_env(key: &str) -> Result<Option<f64>, ConfigError> {
    let value: Option<f64> = parse_from_env(key)?;
    match value {
        Some(v) if !v.is_finite() => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: v.to_string(),
            reason: "must be a finite number".to_string(),
        }),
        other => Ok(other),
    }
}

pub(crate) fn parse_millis_from_env(
    key: &str,
) -> Result<Option<std::time::Duration>, ConfigError> {
    Ok(parse_u64_from_env(key)?.map(std::time::Duration::from_millis))
}

/// Non-blank string value of `key`, trimmed.
pub(crate) fn string_from_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
