pub mod chat;
pub mod image;
pub mod registry;
pub mod speech;
pub mod wire;

pub mod azure;
pub mod azure_flux;
pub mod azure_whisper;
pub mod openai;

pub use azure::AzureChatProvider;
pub use azure_flux::AzureFluxProvider;
pub use azure_whisper::AzureWhisperProvider;
pub use chat::ChatProvider;
pub use image::ImageProvider;
pub use openai::OpenAiChatProvider;
pub use registry::{
    ProviderRegistry, builtin_chat_registry, builtin_image_registry, builtin_speech_registry,
};
pub use speech::SpeechProvider;
