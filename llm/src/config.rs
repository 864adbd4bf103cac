use pipeline::config::{enabled_by_default, env_flag, env_opt, env_or};
use pipeline::ServiceConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_URL: &str = "http://127.0.0.1:11002";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "enabled_by_default")]
    pub enable: bool,
    /// Hosted model name, e.g. `moonshot-v1-8k` or `deepseek-chat`. Leave
    /// unset to use the local model server.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    pub server_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enable: true,
            model: None,
            api_key: None,
            temperature: None,
            server_url: DEFAULT_URL.into(),
        }
    }
}

impl LlmConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Target a hosted OpenAI-compatible API.
    pub fn hosted(
        server_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            model: Some(model.into()),
            api_key: Some(api_key.into()),
            ..Self::new(server_url)
        }
    }

    /// Any configured model selects the hosted backend; `server_url` must
    /// then point at an OpenAI-compatible API.
    pub fn is_hosted(&self) -> bool {
        self.model.is_some()
    }

    /// The sampling temperature to send. Moonshot models default to 0.3,
    /// the value their guide recommends.
    pub fn temperature(&self) -> Option<f64> {
        self.temperature.or_else(|| {
            self.model
                .as_deref()
                .filter(|m| m.starts_with("moonshot"))
                .map(|_| 0.3)
        })
    }

    /// Read `LLM_URL`, `LLM_ENABLE`, `LLM_MODEL`, `LLM_API_KEY` and
    /// `LLM_TEMPERATURE`.
    pub fn from_env() -> Self {
        Self {
            enable: env_flag("LLM_ENABLE", true),
            model: env_opt("LLM_MODEL"),
            api_key: env_opt("LLM_API_KEY"),
            temperature: env_opt("LLM_TEMPERATURE").and_then(|t| t.parse().ok()),
            server_url: env_or("LLM_URL", DEFAULT_URL),
        }
    }
}

impl ServiceConfig for LlmConfig {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}
