//! Multi-provider judge on `genai`.

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use tracing::instrument;

use super::{Judge, JudgeConfig, JudgeError, JudgePrompt};

/// `genai` picks the provider from the model name and reads that provider's
/// API key from its usual environment variable.
pub struct GenaiJudge {
    client: Client,
    model: String,
    name: String,
    configured: bool,
}

impl std::fmt::Debug for GenaiJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiJudge")
            .field("model", &self.model)
            .field("configured", &self.configured)
            .finish()
    }
}

impl GenaiJudge {
    pub fn new(config: &JudgeConfig) -> Self {
        let model = config.genai_model.clone();
        let configured = provider_key_env(&model)
            .map(|keys| {
                keys.iter()
                    .any(|k| std::env::var(k).is_ok_and(|v| !v.trim().is_empty()))
            })
            .unwrap_or(true);
        Self {
            client: Client::default(),
            name: format!("genai:{}", model),
            model,
            configured,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Environment variables holding the API key for the provider `model` maps to.
///
/// `None` for providers that need no key (local Ollama models).
pub fn provider_key_env(model: &str) -> Option<&'static [&'static str]> {
    let model = model.to_lowercase();
    if model.starts_with("gemini") {
        Some(&["GEMINI_API_KEY", "GOOGLE_API_KEY"])
    } else if model.starts_with("claude") {
        Some(&["ANTHROPIC_API_KEY"])
    } else if model.starts_with("gpt") || model.starts_with("o1") || model.starts_with("o3") {
        Some(&["OPENAI_API_KEY"])
    } else if model.starts_with("command") {
        Some(&["COHERE_API_KEY"])
    } else if model.starts_with("grok") {
        Some(&["XAI_API_KEY"])
    } else if model.starts_with("deepseek") {
        Some(&["DEEPSEEK_API_KEY"])
    } else {
        None
    }
}

#[async_trait]
impl Judge for GenaiJudge {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    #[instrument(skip_all, fields(backend = %self.name))]
    async fn complete(&self, prompt: &JudgePrompt) -> Result<String, JudgeError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(prompt.system.clone()),
            ChatMessage::user(prompt.user.clone()),
        ]);

        let response = self
            .client
            .exec_chat(&self.model, request, None)
            .await
            .map_err(|e| JudgeError::request(&self.name, e))?;

        response
            .first_text()
            .map(str::to_string)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| JudgeError::request(&self.name, "empty completion"))
    }
}
