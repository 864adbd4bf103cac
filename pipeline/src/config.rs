//! Service configuration.
//!
//! Every service config carries an `enable` switch and the server's base
//! address. Values come from serde (config files) or from the environment
//! through [`env_or`] and friends.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the dispatch core needs to know about a service config.
pub trait ServiceConfig {
    fn enabled(&self) -> bool;
    fn server_url(&self) -> &str;
    /// Credential passed through to the server, if any.
    fn api_key(&self) -> Option<&str> {
        None
    }
}

pub fn enabled_by_default() -> bool {
    true
}

/// Minimal config for services with no tuning fields of their own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "enabled_by_default")]
    pub enable: bool,
    pub server_url: String,
}

impl PipelineConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            enable: true,
            server_url: server_url.into(),
        }
    }

    /// Read `<PREFIX>_URL` and `<PREFIX>_ENABLE`, falling back to
    /// `default_url` and `true`.
    pub fn from_env(prefix: &str, default_url: &str) -> Self {
        Self {
            enable: env_flag(&format!("{prefix}_ENABLE"), true),
            server_url: env_or(&format!("{prefix}_URL"), default_url),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enable = false;
        self
    }
}

impl ServiceConfig for PipelineConfig {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }
}

/// `key` from the environment, or `default`.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

/// `key` from the environment when set and non-empty.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// `key` parsed as `T`; unset or unparsable values give `default`.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean switch: `1`, `true`, `yes`, `on` enable; `0`, `false`, `no`,
/// `off` disable; anything else gives `default`.
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Ok(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
