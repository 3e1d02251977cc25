use std::str::FromStr;
use std::time::Duration;

use crate::config::{ConfigError, parse_millis_from_env, string_from_env};
use crate::constants::DEFAULT_JUDGE_TIMEOUT;

const ENV_JUDGE_ORDER: &str = "HALLUX_JUDGE_ORDER";
const ENV_JUDGE_TIMEOUT_MS: &str = "HALLUX_JUDGE_TIMEOUT_MS";
const ENV_OPENAI_API_KEY: &str = "HALLUX_OPENAI_API_KEY";
const ENV_OPENAI_API_KEY_FALLBACK: &str = "OPENAI_API_KEY";
const ENV_OPENAI_BASE_URL: &str = "HALLUX_OPENAI_BASE_URL";
const ENV_OPENAI_MODEL: &str = "HALLUX_OPENAI_MODEL";
const ENV_GENAI_MODEL: &str = "HALLUX_GENAI_MODEL";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GENAI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgeBackend {
    /// OpenAI-compatible `/chat/completions` endpoint.
    OpenAi,
    /// Any provider `genai` resolves from the model name (Gemini by default).
    Genai,
}

impl FromStr for JudgeBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "genai" | "gemini" => Ok(Self::Genai),
            other => Err(format!("unknown judge backend: {}", other)),
        }
    }
}

/// Judge backends, their order, and their credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct JudgeConfig {
    pub order: Vec<JudgeBackend>,
    /// Per-judge timeout; a slow judge hands over to the next one.
    pub timeout: Duration,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub genai_model: String,
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeConfig")
            .field("order", &self.order)
            .field("timeout", &self.timeout)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("genai_model", &self.genai_model)
            .finish()
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            order: vec![JudgeBackend::OpenAi, JudgeBackend::Genai],
            timeout: DEFAULT_JUDGE_TIMEOUT,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            genai_model: DEFAULT_GENAI_MODEL.to_string(),
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let order = match string_from_env(ENV_JUDGE_ORDER) {
            Some(raw) => Self::parse_order(&raw)?,
            None => defaults.order,
        };

        let config = Self {
            order,
            timeout: parse_millis_from_env(ENV_JUDGE_TIMEOUT_MS)?.unwrap_or(defaults.timeout),
            openai_api_key: string_from_env(ENV_OPENAI_API_KEY)
                .or_else(|| string_from_env(ENV_OPENAI_API_KEY_FALLBACK)),
            openai_base_url: string_from_env(ENV_OPENAI_BASE_URL)
                .unwrap_or(defaults.openai_base_url),
            openai_model: string_from_env(ENV_OPENAI_MODEL).unwrap_or(defaults.openai_model),
            genai_model: string_from_env(ENV_GENAI_MODEL).unwrap_or(defaults.genai_model),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: ENV_JUDGE_TIMEOUT_MS.to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Comma-separated backend names; duplicates keep their first position.
    /// An empty list (`HALLUX_JUDGE_ORDER=none`) disables AI judging.
    fn parse_order(raw: &str) -> Result<Vec<JudgeBackend>, ConfigError> {
        if raw.trim().eq_ignore_ascii_case("none") {
            return Ok(Vec::new());
        }
        let mut order = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let backend: JudgeBackend = name.parse().map_err(|reason| ConfigError::InvalidValue {
                key: ENV_JUDGE_ORDER.to_string(),
                value: raw.to_string(),
                reason,
            })?;
            if !order.contains(&backend) {
                order.push(backend);
            }
        }
        Ok(order)
    }
}
