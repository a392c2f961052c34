use serde::{Deserialize, Serialize};

/// A single entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// "user" or "assistant".
    pub role: String,
    /// The message content.
    pub content: String,
}

/// Conversation context passed to an AI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// System prompt prepended to every request.
    pub system_prompt: String,
    /// Conversation history (oldest first).
    pub history: Vec<ContextEntry>,
    /// The current user message.
    pub current_message: String,
    /// Override the provider's default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A structured message for API-based providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    /// The message content.
    pub content: String,
}

impl Context {
    /// Create a new context with just a current message and default system prompt.
    pub fn new(message: &str) -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history: Vec::new(),
            current_message: message.to_string(),
            model: None,
        }
    }

    /// Create a context with an explicit system prompt.
    pub fn with_system(system_prompt: &str, message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            ..Self::new(message)
        }
    }

    /// Convert context to structured API messages.
    ///
    /// Returns `(system_prompt, messages)`; the system prompt is separated
    /// because Gemini requires it outside the messages array.
    pub fn to_api_messages(&self) -> (String, Vec<ApiMessage>) {
        let mut messages = Vec::with_capacity(self.history.len() + 1);

        for entry in &self.history {
            messages.push(ApiMessage {
                role: entry.role.clone(),
                content: entry.content.clone(),
            });
        }

        messages.push(ApiMessage {
            role: "user".to_string(),
            content: self.current_message.clone(),
        });

        (self.system_prompt.clone(), messages)
    }
}

/// Default system prompt for Yuki.
fn default_system_prompt() -> String {
    "You are Yuki, a friendly member of a Telegram group chat. \
     You are casual, warm, and brief."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_api_messages_basic() {
        let ctx = Context::new("hello");
        let (system, messages) = ctx.to_api_messages();
        assert!(system.contains("Yuki"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn test_to_api_messages_with_history() {
        let ctx = Context {
            system_prompt: "Be nice.".into(),
            history: vec![
                ContextEntry {
                    role: "user".into(),
                    content: "Hi".into(),
                },
                ContextEntry {
                    role: "assistant".into(),
                    content: "Hey!".into(),
                },
            ],
            current_message: "What's up?".into(),
            model: None,
        };
        let (system, messages) = ctx.to_api_messages();
        assert_eq!(system, "Be nice.");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].content, "What's up?");
    }

    #[test]
    fn test_with_system_overrides_prompt() {
        let ctx = Context::with_system("custom", "msg");
        assert_eq!(ctx.system_prompt, "custom");
        assert_eq!(ctx.current_message, "msg");
        assert!(ctx.model.is_none());
    }

    #[test]
    fn test_context_deserialize_without_model() {
        let json = r#"{"system_prompt":"s","history":[],"current_message":"hi"}"#;
        let ctx: Context = serde_json::from_str(json).unwrap();
        assert!(ctx.model.is_none());
    }
}
