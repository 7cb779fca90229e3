use std::sync::Arc;

use axum::Router;
use futures::future::BoxFuture;
use murmur_agent::tools::{GenerateImageTool, SendMessageTool};
use murmur_agent::{AgentRuntime, Knowledge, Tool};
use murmur_channels::{OnMessageFn, TwilioSender, TwilioState, twilio};
use murmur_common::{Error, Result};
use murmur_config::AppConfig;
use murmur_providers::{
    ImageProvider, SpeechProvider, builtin_chat_registry, builtin_image_registry,
    builtin_speech_registry,
};
use murmur_store::ThreadStore;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::state::{AppState, SharedState};

/// Wire the whole application together: registries, providers, store,
/// knowledge, agent, and channel routes.
///
/// Provider failures are isolated: a missing image or speech credential only
/// disables that capability, and a failed chat provider (or store) leaves the
/// process up with the conversational endpoint answering 503.
pub async fn build(config: AppConfig) -> (SharedState, Option<Router>) {
    let speech = resolve_speech(&config);
    let image = resolve_image(&config);
    let twilio_sender = resolve_twilio(&config);

    let agent = match build_agent(&config, image, twilio_sender.clone()).await {
        Ok(agent) => {
            info!("agent runtime initialized");
            Some(Arc::new(agent))
        }
        Err(e) => {
            error!("failed to initialize agent runtime: {e}");
            None
        }
    };

    let twilio_routes = Some(twilio::routes(TwilioState {
        on_message: on_message_fn(agent.clone()),
        speech,
        sender: twilio_sender,
        http: reqwest::Client::new(),
    }));

    let state = Arc::new(AppState { config, agent });
    (state, twilio_routes)
}

async fn build_agent(
    config: &AppConfig,
    image: Option<Arc<dyn ImageProvider>>,
    twilio_sender: Option<Arc<TwilioSender>>,
) -> Result<AgentRuntime> {
    let chat_registry = builtin_chat_registry();
    let provider = chat_registry.resolve(config.chat_provider_name().as_deref(), config)?;
    info!("chat provider resolved: {}", provider.provider_id());

    let store = {
        let db_path = config.db_path();
        tokio::task::spawn_blocking(move || ThreadStore::open(&db_path))
            .await
            .map_err(|e| Error::Database(format!("store open task panicked: {e}")))??
    };

    let mut tools: Vec<Box<dyn Tool>> = Vec::new();
    if let Some(image) = image {
        tools.push(Box::new(GenerateImageTool::new(
            image,
            config.images_dir.clone(),
            config.base_url.clone(),
        )));
    }
    if let Some(sender) = twilio_sender {
        tools.push(Box::new(SendMessageTool::new(sender)));
    }

    let knowledge = Knowledge::load(&config.app_name, &config.knowledge_path);

    Ok(AgentRuntime::new(
        provider,
        tools,
        Arc::new(Mutex::new(store)),
        knowledge,
        config.max_tool_rounds,
    ))
}

fn resolve_speech(config: &AppConfig) -> Option<Arc<dyn SpeechProvider>> {
    let registry = builtin_speech_registry();
    match registry.resolve(config.speech_provider_name().as_deref(), config) {
        Ok(provider) => {
            info!("audio provider resolved: {}", provider.provider_id());
            Some(provider)
        }
        Err(e) => {
            warn!("audio transcription disabled: {e}");
            None
        }
    }
}

fn resolve_image(config: &AppConfig) -> Option<Arc<dyn ImageProvider>> {
    let registry = builtin_image_registry();
    match registry.resolve(config.image_provider_name().as_deref(), config) {
        Ok(provider) => {
            info!("image provider resolved: {}", provider.provider_id());
            Some(provider)
        }
        Err(e) => {
            warn!("image generation disabled: {e}");
            None
        }
    }
}

fn resolve_twilio(config: &AppConfig) -> Option<Arc<TwilioSender>> {
    match TwilioSender::from_config(config) {
        Ok(sender) => Some(Arc::new(sender)),
        Err(e) => {
            warn!("outbound messaging disabled: {e}");
            None
        }
    }
}

/// Bridge the webhook adapter to the agent runtime without coupling the
/// channels crate to it.
fn on_message_fn(agent: Option<Arc<AgentRuntime>>) -> OnMessageFn {
    Arc::new(move |thread_id: String, text: String| -> BoxFuture<'static, Result<String>> {
        let agent = agent.clone();
        Box::pin(async move {
            match agent {
                Some(agent) => agent.process_message(&thread_id, &text).await,
                None => Err(Error::Agent("conversational agent unavailable".to_string())),
            }
        })
    })
}
