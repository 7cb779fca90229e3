use std::collections::HashMap;
use std::sync::Arc;

use murmur_common::{Error, Result};
use murmur_config::AppConfig;
use tracing::debug;

use crate::azure::AzureChatProvider;
use crate::azure_flux::AzureFluxProvider;
use crate::azure_whisper::AzureWhisperProvider;
use crate::chat::ChatProvider;
use crate::image::ImageProvider;
use crate::openai::OpenAiChatProvider;
use crate::speech::SpeechProvider;

type Constructor<P> = Box<dyn Fn(&AppConfig) -> Result<Arc<P>> + Send + Sync>;

/// Name-keyed table of provider constructors.
///
/// Built once at process start and passed by reference wherever providers are
/// resolved, so tests can install isolated registries. Names are
/// case-insensitive; the last registration for a name wins. Resolution runs
/// the constructor every time; instances are never cached.
pub struct ProviderRegistry<P: ?Sized> {
    kind: &'static str,
    env_hint: &'static str,
    entries: HashMap<String, Constructor<P>>,
}

impl<P: ?Sized> ProviderRegistry<P> {
    pub fn new(kind: &'static str, env_hint: &'static str) -> Self {
        Self {
            kind,
            env_hint,
            entries: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&AppConfig) -> Result<Arc<P>> + Send + Sync + 'static,
    {
        debug!("registered {} provider: {}", self.kind, name);
        self.entries
            .insert(name.to_lowercase(), Box::new(constructor));
    }

    /// Names currently registered, sorted for stable error messages.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Construct a fresh provider instance for `name`.
    pub fn resolve(&self, name: Option<&str>, config: &AppConfig) -> Result<Arc<P>> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let Some(name) = name else {
            return Err(Error::Config(format!(
                "No {} provider specified. Available: {:?}. Please set the {} environment variable.",
                self.kind,
                self.registered_names(),
                self.env_hint
            )));
        };

        let constructor = self.entries.get(&name.to_lowercase()).ok_or_else(|| {
            Error::Config(format!(
                "{} provider '{}' not found. Available: {:?}",
                self.kind,
                name,
                self.registered_names()
            ))
        })?;

        constructor(config)
    }
}

/// Chat registry preloaded with the built-in backends.
pub fn builtin_chat_registry() -> ProviderRegistry<dyn ChatProvider> {
    let mut registry: ProviderRegistry<dyn ChatProvider> =
        ProviderRegistry::new("chat", "CHAT_MODEL_PROVIDER");
    registry.register("azure", |config| {
        Ok(Arc::new(AzureChatProvider::from_config(config)?) as Arc<dyn ChatProvider>)
    });
    registry.register("openai", |config| {
        Ok(Arc::new(OpenAiChatProvider::from_config(config)?) as Arc<dyn ChatProvider>)
    });
    registry
}

pub fn builtin_speech_registry() -> ProviderRegistry<dyn SpeechProvider> {
    let mut registry: ProviderRegistry<dyn SpeechProvider> =
        ProviderRegistry::new("audio", "AUDIO_MODEL_PROVIDER");
    registry.register("azure-whisper", |config| {
        Ok(Arc::new(AzureWhisperProvider::from_config(config)?) as Arc<dyn SpeechProvider>)
    });
    registry
}

pub fn builtin_image_registry() -> ProviderRegistry<dyn ImageProvider> {
    let mut registry: ProviderRegistry<dyn ImageProvider> =
        ProviderRegistry::new("image", "IMAGE_MODEL_PROVIDER");
    registry.register("azure-flux", |config| {
        Ok(Arc::new(AzureFluxProvider::from_config(config)?) as Arc<dyn ImageProvider>)
    });
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use murmur_common::{ChatMessage, ToolDefinition};

    #[derive(Debug)]
    struct StaticProvider {
        id: &'static str,
    }

    #[async_trait]
    impl ChatProvider for StaticProvider {
        fn provider_id(&self) -> &str {
            self.id
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatMessage> {
            Ok(ChatMessage::assistant("ok"))
        }
    }

    fn test_registry() -> ProviderRegistry<dyn ChatProvider> {
        let mut registry: ProviderRegistry<dyn ChatProvider> =
            ProviderRegistry::new("chat", "CHAT_MODEL_PROVIDER");
        registry.register("stub", |_| {
            Ok(Arc::new(StaticProvider { id: "stub" }) as Arc<dyn ChatProvider>)
        });
        registry
    }

    #[test]
    fn test_resolve_registered_name() {
        let registry = test_registry();
        let provider = registry.resolve(Some("stub"), &AppConfig::default()).unwrap();
        assert_eq!(provider.provider_id(), "stub");
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let registry = test_registry();
        assert!(registry.resolve(Some("STUB"), &AppConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_name_lists_available() {
        let registry = test_registry();
        let err = registry.resolve(None, &AppConfig::default()).unwrap_err();
        match err {
            Error::Config(msg) => {
                assert!(msg.contains("No chat provider specified"), "{msg}");
                assert!(msg.contains("stub"), "{msg}");
                assert!(msg.contains("CHAT_MODEL_PROVIDER"), "{msg}");
            }
            other => panic!("expected Config error, got {other:?}"),
        }

        // An empty string behaves the same as an absent name.
        let err = registry.resolve(Some("  "), &AppConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let registry = test_registry();
        let err = registry
            .resolve(Some("nonexistent"), &AppConfig::default())
            .unwrap_err();
        match err {
            Error::Config(msg) => {
                assert!(msg.contains("'nonexistent' not found"), "{msg}");
                assert!(msg.contains("stub"), "{msg}");
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = test_registry();
        registry.register("stub", |_| {
            Ok(Arc::new(StaticProvider { id: "stub-v2" }) as Arc<dyn ChatProvider>)
        });
        let provider = registry.resolve(Some("stub"), &AppConfig::default()).unwrap();
        assert_eq!(provider.provider_id(), "stub-v2");
        assert_eq!(registry.registered_names().len(), 1);
    }

    #[test]
    fn test_resolution_builds_fresh_instances() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut registry: ProviderRegistry<dyn ChatProvider> =
            ProviderRegistry::new("chat", "CHAT_MODEL_PROVIDER");
        registry.register("counted", |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StaticProvider { id: "counted" }) as Arc<dyn ChatProvider>)
        });

        let config = AppConfig::default();
        registry.resolve(Some("counted"), &config).unwrap();
        registry.resolve(Some("counted"), &config).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builtin_registries_report_config_errors() {
        // Default config carries no credentials, so construction must fail
        // with a configuration error rather than at call time.
        let config = AppConfig::default();
        let err = builtin_chat_registry()
            .resolve(Some("azure"), &config)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = builtin_image_registry()
            .resolve(Some("azure-flux"), &config)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
