//! Google Gemini API provider.
//!
//! Calls the Gemini `generateContent` endpoint. Auth via URL query param.

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

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sampling temperature for chat lines; a little looser than the API default.
const CHAT_TEMPERATURE: f32 = 0.9;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create from config values.
    pub fn from_config(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    total_token_count: u64,
}

/// Gemini calls the assistant role "model".
fn to_gemini_contents(api_messages: &[ApiMessage]) -> Vec<GeminiContent> {
    api_messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(if m.role == "assistant" { "model" } else { "user" }.to_string()),
            parts: vec![GeminiPart {
                text: m.content.clone(),
            }],
        })
        .collect()
}

/// Concatenate the text parts of the first candidate.
fn extract_text(parsed: &GeminiResponse) -> Result<String, YukiError> {
    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(YukiError::Provider(format!("gemini blocked prompt: {reason}")));
    }
    let text: String = parsed
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(YukiError::Provider("gemini returned no text".into()));
    }
    Ok(text)
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, YukiError> {
        let (system, api_messages) = context.to_api_messages();
        let effective_model = context.model.as_deref().unwrap_or(&self.model);
        let start = Instant::now();

        let system_instruction = (!system.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: system }],
        });

        let body = GeminiRequest {
            contents: to_gemini_contents(&api_messages),
            system_instruction,
            generation_config: GenerationConfig {
                temperature: CHAT_TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let url = format!(
            "{GEMINI_BASE_URL}/models/{effective_model}:generateContent?key={}",
            self.api_key
        );
        debug!("gemini: POST models/{effective_model}:generateContent");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| YukiError::Provider(format!("gemini request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(YukiError::Provider(format!(
                "gemini returned {status}: {text}"
            )));
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| YukiError::Provider(format!("gemini: failed to parse response: {e}")))?;

        let text = extract_text(&parsed)?;
        let tokens = parsed.usage_metadata.as_ref().map(|u| u.total_token_count);

        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata {
                provider_used: "gemini".to_string(),
                tokens_used: tokens,
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: Some(effective_model.to_string()),
            },
            reply_target: None,
            reply_to_message_id: None,
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("gemini: no API key configured");
            return false;
        }
        let url = format!("{GEMINI_BASE_URL}/models?key={}", self.api_key);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("gemini not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_provider_name() {
        let p = GeminiProvider::from_config("AIza-test".into(), "gemini-2.0-flash".into());
        assert_eq!(p.name(), "gemini");
        assert!(p.requires_api_key());
    }

    #[test]
    fn test_gemini_request_serialization() {
        let body = GeminiRequest {
            contents: to_gemini_contents(&[ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }]),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: "Be Yuki.".into(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: CHAT_TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("systemInstruction").is_some());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_gemini_role_mapping() {
        let contents = to_gemini_contents(&[
            ApiMessage {
                role: "user".into(),
                content: "Hi".into(),
            },
            ApiMessage {
                role: "assistant".into(),
                content: "Hello!".into(),
            },
        ]);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_gemini_response_joins_parts() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi "},{"text":"there!"}]}}],"usageMetadata":{"totalTokenCount":25}}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(&resp).unwrap(), "Hi there!");
        assert_eq!(
            resp.usage_metadata.as_ref().map(|u| u.total_token_count),
            Some(25)
        );
    }

    #[test]
    fn test_gemini_blocked_prompt_is_error() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_text(&resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_gemini_empty_candidates_is_error() {
        let resp: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(&resp).is_err());
    }
}
