use std::sync::Arc;

use tracing::info;

use super::{CompletionClient, GeminiClient, GroqClient, LlmError};
use crate::config::{LlmSettings, ProviderPreference};

/// Pick the completion backend for the configured preference.
///
/// `Auto` prefers the quality provider and falls back to the fast one.
/// An explicit preference never falls back.
pub fn select_client(settings: &LlmSettings) -> Result<Arc<dyn CompletionClient>, LlmError> {
    let gemini = || {
        settings.gemini_api_key.as_deref().map(|key| {
            Arc::new(GeminiClient::from_settings(key, settings)) as Arc<dyn CompletionClient>
        })
    };
    let groq = || {
        settings.groq_api_key.as_deref().map(|key| {
            Arc::new(GroqClient::from_settings(key, settings)) as Arc<dyn CompletionClient>
        })
    };

    let chosen = match settings.preference {
        ProviderPreference::Quality => gemini(),
        ProviderPreference::Fast => groq(),
        ProviderPreference::Auto => gemini().or_else(groq),
    };

    let client = chosen.ok_or(LlmError::NotConfigured)?;
    info!(
        provider = client.provider(),
        model = client.model(),
        "llm backend selected"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(gemini: Option<&str>, groq: Option<&str>, preference: ProviderPreference) -> LlmSettings {
        LlmSettings {
            preference,
            gemini_api_key: gemini.map(String::from),
            groq_api_key: groq.map(String::from),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_auto_prefers_gemini() {
        let client = select_client(&settings(Some("g"), Some("q"), ProviderPreference::Auto)).unwrap();
        assert_eq!(client.provider(), "gemini");
    }

    #[test]
    fn test_auto_falls_back_to_groq() {
        let client = select_client(&settings(None, Some("q"), ProviderPreference::Auto)).unwrap();
        assert_eq!(client.provider(), "groq");
    }

    #[test]
    fn test_explicit_preference_does_not_fall_back() {
        let err = select_client(&settings(Some("g"), None, ProviderPreference::Fast)).err();
        assert!(matches!(err, Some(LlmError::NotConfigured)));
    }

    #[test]
    fn test_no_keys() {
        assert!(select_client(&settings(None, None, ProviderPreference::Auto)).is_err());
    }
}
