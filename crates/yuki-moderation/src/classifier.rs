//! AI content classification.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use yuki_core::{context::Context, traits::Provider};

const CLASSIFIER_PROMPT: &str = "You are a content moderator for a friendly group chat. \
Classify the user's message. Answer with exactly one line: SAFE, or UNSAFE: <short reason>. \
Flag harassment, hate, threats, sexual content involving minors, and doxxing. \
Banter, mild swearing and disagreement are SAFE.";

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe(String),
    /// The classifier failed or answered nonsense.
    Unknown,
}

#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, content: &str) -> Verdict;
}

/// Classifier backed by a text-generation provider.
pub struct ProviderClassifier {
    provider: Arc<dyn Provider>,
}

impl ProviderClassifier {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ContentClassifier for ProviderClassifier {
    async fn classify(&self, content: &str) -> Verdict {
        let context = Context::with_system(CLASSIFIER_PROMPT, content);
        match self.provider.complete(&context).await {
            Ok(resp) => parse_verdict(&resp.text),
            Err(e) => {
                warn!("moderation: classifier call failed: {e}");
                Verdict::Unknown
            }
        }
    }
}

/// Read the first non-empty line as `SAFE` or `UNSAFE: reason`.
pub fn parse_verdict(answer: &str) -> Verdict {
    let Some(line) = answer.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Verdict::Unknown;
    };
    let line = line.trim_matches(|c: char| c == '*' || c == '`' || c == '"');
    let upper = line.to_uppercase();

    if upper.starts_with("UNSAFE") {
        let reason = line
            .get("UNSAFE".len()..)
            .unwrap_or_default()
            .trim_start_matches([':', '-', ' '])
            .trim();
        let reason = if reason.is_empty() {
            "flagged by classifier"
        } else {
            reason
        };
        Verdict::Unsafe(reason.to_string())
    } else if upper.starts_with("SAFE") {
        Verdict::Safe
    } else {
        Verdict::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yuki_core::{error::YukiError, message::OutgoingMessage};

    struct Canned(Result<&'static str, ()>);

    #[async_trait]
    impl Provider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn requires_api_key(&self) -> bool {
            false
        }

        async fn complete(&self, _context: &Context) -> Result<OutgoingMessage, YukiError> {
            match self.0 {
                Ok(text) => Ok(OutgoingMessage {
                    text: text.to_string(),
                    ..Default::default()
                }),
                Err(()) => Err(YukiError::Provider("offline".into())),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("SAFE"), Verdict::Safe);
        assert_eq!(parse_verdict("  safe.\nextra"), Verdict::Safe);
        assert_eq!(
            parse_verdict("UNSAFE: targeted harassment"),
            Verdict::Unsafe("targeted harassment".into())
        );
        assert_eq!(parse_verdict("**UNSAFE**"), Verdict::Unsafe("flagged by classifier".into()));
        assert_eq!(parse_verdict("I think it's fine"), Verdict::Unknown);
        assert_eq!(parse_verdict(""), Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_provider_classifier() {
        let c = ProviderClassifier::new(Arc::new(Canned(Ok("UNSAFE - threat"))));
        assert_eq!(c.classify("...").await, Verdict::Unsafe("threat".into()));

        let c = ProviderClassifier::new(Arc::new(Canned(Err(()))));
        assert_eq!(c.classify("...").await, Verdict::Unknown);
    }
}
