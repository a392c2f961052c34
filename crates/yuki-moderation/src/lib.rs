//! # yuki-moderation
//!
//! Decides whether a group message should be removed: a fast word-list
//! check first, then an optional AI classification.

pub mod classifier;
pub mod profanity;

pub use classifier::{ContentClassifier, ProviderClassifier, Verdict};
pub use profanity::ProfanityFilter;

use std::sync::Arc;
use tracing::debug;
use yuki_core::{config::ModerationConfig, error::YukiError};

/// Outcome of moderating one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Remove the message; the reason is for logs only.
    Remove(String),
}

/// Word filter plus optional classifier, as configured.
pub struct Moderator {
    enabled: bool,
    filter: ProfanityFilter,
    classifier: Option<Arc<dyn ContentClassifier>>,
}

impl Moderator {
    pub fn new(
        config: &ModerationConfig,
        classifier: Option<Arc<dyn ContentClassifier>>,
    ) -> Result<Self, YukiError> {
        Ok(Self {
            enabled: config.enabled,
            filter: ProfanityFilter::new(&config.extra_words)?,
            classifier: if config.ai_classification {
                classifier
            } else {
                None
            },
        })
    }

    pub async fn check(&self, text: &str) -> Decision {
        if !self.enabled || text.trim().is_empty() {
            return Decision::Allow;
        }
        if let Some(word) = self.filter.first_match(text) {
            return Decision::Remove(format!("banned word '{word}'"));
        }
        let Some(ref classifier) = self.classifier else {
            return Decision::Allow;
        };
        match classifier.classify(text).await {
            Verdict::Unsafe(reason) => Decision::Remove(reason),
            Verdict::Safe => Decision::Allow,
            Verdict::Unknown => {
                debug!("moderation: classifier undecided, allowing");
                Decision::Allow
            }
        }
    }
}
