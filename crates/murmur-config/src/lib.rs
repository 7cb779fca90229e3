use std::path::PathBuf;

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Process configuration, read once at startup and passed by reference into
/// every component that needs it. Values are collected as-is here; required
/// settings are validated where they are consumed (provider construction),
/// so a missing image credential never blocks the chat path.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Display name substituted into the knowledge document.
    pub app_name: String,
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL used to build absolute media links.
    pub base_url: Option<String>,
    pub data_dir: PathBuf,
    pub images_dir: PathBuf,
    pub knowledge_path: PathBuf,
    /// Provider selection names. `None` falls back per `*_provider_name()`.
    pub chat_provider: Option<String>,
    pub speech_provider: Option<String>,
    pub image_provider: Option<String>,
    /// Cap on model/tool round-trips per conversational request.
    pub max_tool_rounds: usize,
    /// Generated images older than this many hours are pruned.
    pub image_retention_hours: u64,
    pub azure: AzureConfig,
    pub openai: OpenAiConfig,
    pub twilio: TwilioConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub deployment: Option<String>,
    pub whisper_deployment: Option<String>,
    pub flux_deployment: Option<String>,
    /// Full image-generation URL override; derived from `endpoint` when unset.
    pub flux_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Murmur".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            base_url: None,
            data_dir: PathBuf::from("data"),
            images_dir: PathBuf::from("static/generated_images"),
            knowledge_path: PathBuf::from("training/knowledge_base.md"),
            chat_provider: None,
            speech_provider: None,
            image_provider: None,
            max_tool_rounds: 10,
            image_retention_hours: 24,
            azure: AzureConfig {
                api_version: DEFAULT_API_VERSION.to_string(),
                ..AzureConfig::default()
            },
            openai: OpenAiConfig {
                model: "gpt-4o".to_string(),
                ..OpenAiConfig::default()
            },
            twilio: TwilioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment. Never fails: absent
    /// values stay `None` and are reported by the component that requires them.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            app_name: env_var("APP_NAME").unwrap_or(defaults.app_name),
            host: env_var("HOST").unwrap_or(defaults.host),
            port: env_var("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            base_url: env_var("BASE_URL"),
            data_dir: env_var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            images_dir: env_var("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.images_dir),
            knowledge_path: env_var("KNOWLEDGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.knowledge_path),
            chat_provider: env_var("CHAT_MODEL_PROVIDER"),
            speech_provider: env_var("AUDIO_MODEL_PROVIDER"),
            image_provider: env_var("IMAGE_MODEL_PROVIDER"),
            max_tool_rounds: env_var("MAX_TOOL_ROUNDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tool_rounds),
            image_retention_hours: env_var("IMAGE_RETENTION_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.image_retention_hours),
            azure: AzureConfig {
                endpoint: env_var("AZURE_OPENAI_ENDPOINT"),
                api_key: env_var("AZURE_OPENAI_API_KEY"),
                api_version: env_var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                deployment: env_var("AZURE_OPENAI_DEPLOYMENT_NAME"),
                whisper_deployment: env_var("AZURE_OPENAI_WHISPER_DEPLOYMENT"),
                flux_deployment: env_var("AZURE_OPENAI_FLUX_DEPLOYMENT"),
                flux_url: env_var("AZURE_OPENAI_FLUX_URL"),
            },
            openai: OpenAiConfig {
                api_key: env_var("OPENAI_API_KEY"),
                model: env_var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            },
            twilio: TwilioConfig {
                account_sid: env_var("TWILIO_ACCOUNT_SID"),
                auth_token: env_var("TWILIO_AUTH_TOKEN"),
                from_number: env_var("TWILIO_FROM_NUMBER"),
            },
        }
    }

    /// Effective chat provider name. When unset, falls back to `azure` if an
    /// Azure key is configured, else `openai`.
    pub fn chat_provider_name(&self) -> Option<String> {
        self.chat_provider.clone().or_else(|| {
            if self.azure.api_key.is_some() {
                Some("azure".to_string())
            } else {
                Some("openai".to_string())
            }
        })
    }

    pub fn speech_provider_name(&self) -> Option<String> {
        self.speech_provider
            .clone()
            .or_else(|| Some("azure-whisper".to_string()))
    }

    pub fn image_provider_name(&self) -> Option<String> {
        self.image_provider
            .clone()
            .or_else(|| Some("azure-flux".to_string()))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("chat_history.sqlite")
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
