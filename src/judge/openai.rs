//! OpenAI-compatible chat-completions judge.

use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Judge, JudgeConfig, JudgeError, JudgePrompt};
use crate::constants::USER_AGENT;

const BACKEND: &str = "openai";

/// Talks to `{base_url}/chat/completions` with a bearer key.
///
/// Works against OpenAI itself and any server that speaks the same wire
/// format. Without an API key the judge reports itself unconfigured.
#[derive(Clone)]
pub struct OpenAiJudge {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl std::fmt::Debug for OpenAiJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiJudge")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiJudge {
    pub fn new(config: &JudgeConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.openai_base_url.trim_end_matches('/')
            ),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The request body for `prompt`.
    pub fn request_for(&self, prompt: &JudgePrompt) -> Result<CreateChatCompletionRequest, JudgeError> {
        let value = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": 0.0,
            "max_tokens": 500,
        });
        serde_json::from_value(value).map_err(|e| JudgeError::request(BACKEND, e))
    }
}

/// Text of the first choice, if any.
pub fn reply_text(response: &CreateChatCompletionResponse) -> Option<String> {
    response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .filter(|t| !t.trim().is_empty())
}

#[async_trait]
impl Judge for OpenAiJudge {
    fn name(&self) -> &str {
        BACKEND
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip_all, fields(backend = BACKEND, model = %self.model))]
    async fn complete(&self, prompt: &JudgePrompt) -> Result<String, JudgeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(JudgeError::NotConfigured {
                backend: BACKEND.to_string(),
            });
        };

        let request = self.request_for(prompt)?;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| JudgeError::request(BACKEND, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::request(
                BACKEND,
                format!("upstream returned {}", status.as_u16()),
            ));
        }

        let body: CreateChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::request(BACKEND, e))?;
        debug!(choices = body.choices.len(), "Chat completion received");

        reply_text(&body).ok_or_else(|| JudgeError::request(BACKEND, "empty completion"))
    }
}
