use std::sync::Arc;

use async_trait::async_trait;
use murmur_channels::ChannelSender;
use murmur_common::Result;
use serde_json::json;
use tracing::warn;

use crate::tools::{Tool, ToolContext, ToolOutput};

/// Tool that dispatches an outbound message through the messaging channel.
pub struct SendMessageTool {
    sender: Arc<dyn ChannelSender>,
}

impl SendMessageTool {
    pub fn new(sender: Arc<dyn ChannelSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &'static str {
        "send_message"
    }

    fn description(&self) -> &'static str {
        "Sends an outbound WhatsApp/SMS message to a recipient phone number."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "Recipient address, e.g. 'whatsapp:+15551234567'."
                },
                "message": {
                    "type": "string",
                    "description": "Text of the message to send."
                }
            },
            "required": ["to", "message"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: serde_json::Value) -> Result<ToolOutput> {
        let Some(to) = args["to"].as_str().filter(|t| !t.trim().is_empty()) else {
            return Ok(ToolOutput::error("missing or invalid 'to' argument"));
        };
        let Some(message) = args["message"].as_str().filter(|m| !m.is_empty()) else {
            return Ok(ToolOutput::error("missing or invalid 'message' argument"));
        };

        match self.sender.send_text(to, message, None).await {
            Ok(()) => Ok(ToolOutput::text(format!("Message sent to {to}."))),
            Err(e) => {
                warn!("outbound message dispatch failed: {e}");
                Ok(ToolOutput::error(format!("Error sending message: {e}")))
            }
        }
    }
}
