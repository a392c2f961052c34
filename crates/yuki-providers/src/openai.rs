//! OpenAI-compatible chat completions provider.
//!
//! Works with OpenAI's API and any endpoint speaking the same protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};
use yuki_core::{
    context::{ApiMessage, Context},
    error::YukiError,
    message::{MessageMetadata, OutgoingMessage},
    traits::Provider,
};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

/// Build OpenAI-format messages from context (system as a message role).
fn build_openai_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let system_msg = (!system.is_empty()).then(|| ChatMessage {
        role: "system".to_string(),
        content: system.to_string(),
    });
    system_msg
        .into_iter()
        .chain(api_messages.iter().map(|m| ChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        }))
        .collect()
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

fn first_choice_text(parsed: &ChatCompletionResponse) -> Option<String> {
    parsed
        .choices
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .map(|m| m.content.clone())
        .filter(|t| !t.trim().is_empty())
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, YukiError> {
        let (system, api_messages) = context.to_api_messages();
        let effective_model = context.model.as_deref().unwrap_or(&self.model);
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: effective_model.to_string(),
            messages: build_openai_messages(&system, &api_messages),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={effective_model}");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| YukiError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(YukiError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| YukiError::Provider(format!("openai: failed to parse response: {e}")))?;

        let text = first_choice_text(&parsed)
            .ok_or_else(|| YukiError::Provider("openai returned no text".into()))?;

        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata {
                provider_used: "openai".to_string(),
                tokens_used: parsed.usage.as_ref().and_then(|u| u.total_tokens),
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: parsed.model,
            },
            reply_target: None,
            reply_to_message_id: None,
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_openai_messages() {
        let api_msgs = vec![
            ApiMessage {
                role: "user".into(),
                content: "Hi".into(),
            },
            ApiMessage {
                role: "assistant".into(),
                content: "Hey!".into(),
            },
        ];
        let messages = build_openai_messages("Be Yuki.", &api_msgs);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[2].role, "assistant");
    }

    #[test]
    fn test_build_openai_messages_empty_system() {
        let api_msgs = vec![ApiMessage {
            role: "user".into(),
            content: "Hi".into(),
        }];
        let messages = build_openai_messages("", &api_msgs);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_openai_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Yo!"},"finish_reason":"stop"}],"model":"gpt-4o-mini","usage":{"total_tokens":12}}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_choice_text(&resp), Some("Yo!".into()));
        assert_eq!(resp.usage.as_ref().and_then(|u| u.total_tokens), Some(12));
    }

    #[test]
    fn test_openai_blank_choice_is_none() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert!(first_choice_text(&resp).is_none());
    }
}
