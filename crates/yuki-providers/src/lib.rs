//! # yuki-providers
//!
//! Generative AI providers for Yuki.

pub mod gemini;
pub mod openai;

use std::sync::Arc;
use yuki_core::{config::ProviderConfig, error::YukiError, traits::Provider};

/// Build the provider named by `config.default`.
pub fn build(config: &ProviderConfig) -> Result<Arc<dyn Provider>, YukiError> {
    match config.default.as_str() {
        "gemini" => {
            let g = config.gemini.clone().unwrap_or_default();
            Ok(Arc::new(gemini::GeminiProvider::from_config(
                g.api_key, g.model,
            )))
        }
        "openai" => {
            let o = config.openai.clone().unwrap_or_default();
            Ok(Arc::new(openai::OpenAiProvider::from_config(
                o.base_url, o.api_key, o.model,
            )))
        }
        other => Err(YukiError::Config(format!("unsupported provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_known_providers() {
        let mut cfg = ProviderConfig::default();
        assert_eq!(build(&cfg).unwrap().name(), "gemini");
        cfg.default = "openai".into();
        assert_eq!(build(&cfg).unwrap().name(), "openai");
    }

    #[test]
    fn test_build_unknown_provider_fails() {
        let cfg = ProviderConfig {
            default: "parrot".into(),
            ..Default::default()
        };
        let err = build(&cfg).err().unwrap();
        assert!(err.to_string().contains("unsupported provider: parrot"));
    }
}
