use std::sync::Arc;

use murmur_agent::AgentRuntime;
use murmur_config::AppConfig;

/// Shared application state handed to every route handler.
pub struct AppState {
    pub config: AppConfig,
    /// `None` when the chat provider failed to construct; the conversational
    /// endpoint then answers 503 while the other routes keep working.
    pub agent: Option<Arc<AgentRuntime>>,
}

pub type SharedState = Arc<AppState>;
