//! DeepSeek chat-completion backend
//!
//! Requires the `deepseek` feature for network access; without it every
//! request fails with a descriptive error.

use serde::{Deserialize, Serialize};
#[cfg(feature = "deepseek")]
use tracing::debug;

use super::model::ComposerModel;
use crate::config::{LlmSettings, API_KEY_VAR};
use crate::error::{Result, WhitenoiseError};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

/// DeepSeek (OpenAI-compatible) chat completions over HTTPS
pub struct DeepSeekComposer {
    settings: LlmSettings,
}

impl DeepSeekComposer {
    pub fn new(settings: LlmSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn api_key(&self) -> Result<&str> {
        self.settings
            .api_key
            .as_deref()
            .ok_or_else(|| WhitenoiseError::ApiKeyMissing {
                env_var: API_KEY_VAR.to_string(),
            })
    }

    fn build_request<'a>(&'a self, system_prompt: &'a str, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Send request to the API
    #[cfg(feature = "deepseek")]
    fn send_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let api_key = self.api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.settings.timeout_secs))
            .build()
            .map_err(|e| WhitenoiseError::LlmRequestFailed {
                reason: e.to_string(),
            })?;

        debug!(url = %self.settings.api_url, model = %self.settings.model, "Sending chat request");

        let response = client
            .post(&self.settings.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    WhitenoiseError::LlmTimeout {
                        timeout_secs: self.settings.timeout_secs,
                    }
                } else {
                    WhitenoiseError::LlmRequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(WhitenoiseError::LlmRequestFailed {
                reason: format!("API returned {}: {}", status, body),
            });
        }

        response
            .json::<ChatResponse>()
            .map_err(|e| WhitenoiseError::LlmRequestFailed {
                reason: format!("Invalid response from API: {}", e),
            })
    }

    #[cfg(not(feature = "deepseek"))]
    fn send_request(&self, _request: &ChatRequest<'_>) -> Result<ChatResponse> {
        self.api_key()?;
        Err(WhitenoiseError::LlmRequestFailed {
            reason: "DeepSeek support not compiled. Build with --features deepseek".to_string(),
        })
    }
}

impl ComposerModel for DeepSeekComposer {
    fn name(&self) -> &str {
        &self.settings.model
    }

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self.build_request(system_prompt, user_prompt);
        let response = self.send_request(&request)?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| WhitenoiseError::LlmRequestFailed {
                reason: "API response has no choices".to_string(),
            })
    }
}
