use std::path::Path;

use tracing::{info, warn};

/// The system instruction injected at the head of every conversation:
/// an identity statement plus an optional domain knowledge document.
///
/// Computed once at startup; later edits to the document apply on restart.
#[derive(Debug, Clone)]
pub struct Knowledge {
    system_message: String,
}

impl Knowledge {
    /// Load the knowledge document from `path`, substituting the
    /// `{{APP_NAME}}` / `{{APP_NAME_LOWER}}` placeholders. Falls back to the
    /// minimal identity statement when the document is absent or unreadable.
    pub fn load(app_name: &str, path: &Path) -> Self {
        let base_message = format!("You are {app_name}, a helpful AI assistant.");

        let system_message = match std::fs::read_to_string(path) {
            Ok(content) => {
                info!("loaded knowledge base from {}", path.display());
                let content = content
                    .replace("{{APP_NAME}}", app_name)
                    .replace("{{APP_NAME_LOWER}}", &app_name.to_lowercase());
                format!("{base_message}\n\n{content}")
            }
            Err(e) => {
                if path.exists() {
                    warn!("failed to read knowledge base {}: {e}", path.display());
                }
                base_message
            }
        };

        Self { system_message }
    }

    /// Build from an already-assembled instruction (tests, embedded setups).
    pub fn from_text(system_message: impl Into<String>) -> Self {
        Self {
            system_message: system_message.into(),
        }
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }
}
