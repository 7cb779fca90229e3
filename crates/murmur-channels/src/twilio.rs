use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::extract::{Form, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use futures::future::BoxFuture;
use murmur_common::{Error, Result};
use murmur_config::AppConfig;
use murmur_providers::SpeechProvider;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::traits::ChannelSender;

const TWILIO_API_URL: &str = "https://api.twilio.com";

/// Empty TwiML acknowledgement returned synchronously to every webhook call;
/// the actual reply is delivered out-of-band through the REST sender.
const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

const BREVITY_INSTRUCTION: &str = "[Instruction: Keep your response under 1500 characters.]";

const APOLOGY_REPLY: &str = "Sorry, I encountered an error processing your query.";

/// Callback driving one conversational round: `(sender address, text) -> reply`.
///
/// The webhook stays decoupled from the agent runtime; the gateway wires the
/// two together at bootstrap.
pub type OnMessageFn =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Outbound delivery through the Twilio Messages REST API.
#[derive(Debug)]
pub struct TwilioSender {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioSender {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let twilio = &config.twilio;
        let (Some(account_sid), Some(auth_token), Some(from_number)) = (
            twilio.account_sid.clone(),
            twilio.auth_token.clone(),
            twilio.from_number.clone(),
        ) else {
            return Err(Error::Config(
                "Missing required environment variables for Twilio: \
                 TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM_NUMBER"
                    .to_string(),
            ));
        };

        Ok(Self {
            client: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
            base_url: TWILIO_API_URL.to_string(),
        })
    }

    /// Override the Twilio API host (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ChannelSender for TwilioSender {
    fn channel_type(&self) -> &str {
        "twilio"
    }

    async fn send_text(&self, to: &str, body: &str, media_url: Option<&str>) -> Result<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        );

        let mut params: Vec<(&str, &str)> =
            vec![("From", self.from_number.as_str()), ("To", to)];
        if !body.is_empty() {
            params.push(("Body", body));
        }
        if let Some(media) = media_url {
            info!("attaching media url to outbound message: {media}");
            params.push(("MediaUrl", media));
        }

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("failed to send Twilio outbound: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "Twilio API returned {status}: {error_text}"
            )));
        }

        info!("Twilio outbound reply sent to {to}");
        Ok(())
    }
}

/// Shared state for the Twilio webhook routes.
#[derive(Clone)]
pub struct TwilioState {
    pub on_message: OnMessageFn,
    pub speech: Option<Arc<dyn SpeechProvider>>,
    pub sender: Option<Arc<TwilioSender>>,
    pub http: reqwest::Client,
}

/// Inbound Twilio form payload (WhatsApp/SMS).
#[derive(Debug, Deserialize)]
pub struct TwilioInbound {
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "MediaUrl0")]
    pub media_url: Option<String>,
    #[serde(rename = "MediaContentType0")]
    pub media_content_type: Option<String>,
}

/// Build the Twilio webhook routes for merging into the main router.
pub fn routes(state: TwilioState) -> Router {
    Router::new()
        .route("/twilio/whatsapp", post(twilio_whatsapp_webhook))
        .with_state(state)
}

/// Twilio messaging webhook. Acknowledges immediately with an empty TwiML
/// response and runs the model round as a detached task keyed by the sender
/// address.
pub async fn twilio_whatsapp_webhook(
    State(state): State<TwilioState>,
    Form(inbound): Form<TwilioInbound>,
) -> impl IntoResponse {
    info!("received Twilio message from {}", inbound.from);

    tokio::spawn(process_inbound(state, inbound));

    ([(header::CONTENT_TYPE, "application/xml")], EMPTY_TWIML)
}

async fn process_inbound(state: TwilioState, inbound: TwilioInbound) {
    let from = inbound.from.clone();
    info!("starting Twilio background round for {from}");

    let Some(sender) = state.sender.clone() else {
        error!("Twilio credentials missing; dropping reply to {from}");
        return;
    };

    match run_round(&state, inbound).await {
        Ok(None) => {}
        Ok(Some(reply)) => {
            let outcome = match split_image_markdown(&reply) {
                Some((text, image_url)) => sender.send_text(&from, &text, Some(&image_url)).await,
                None => sender.send_text(&from, &reply, None).await,
            };
            if let Err(e) = outcome {
                error!("failed to deliver Twilio reply to {from}: {e}");
            }
        }
        Err(e) => {
            error!("error in Twilio background round for {from}: {e}");
            if let Err(e) = sender.send_text(&from, APOLOGY_REPLY, None).await {
                error!("failed to deliver apology to {from}: {e}");
            }
        }
    }
}

/// Resolve the user text (transcribing audio media when possible) and run the
/// conversational round. `Ok(None)` means there was nothing to process.
async fn run_round(state: &TwilioState, inbound: TwilioInbound) -> Result<Option<String>> {
    let mut user_text = inbound.body.unwrap_or_default();

    let is_audio = inbound
        .media_content_type
        .as_deref()
        .map(|ct| ct.contains("audio"))
        .unwrap_or(false);

    if let Some(media_url) = &inbound.media_url {
        if is_audio {
            match &state.speech {
                Some(speech) => {
                    user_text =
                        transcribe_media(state, speech.as_ref(), media_url).await?;
                }
                None => warn!("audio message received but no speech provider is configured"),
            }
        }
    } else if user_text.is_empty() {
        return Ok(None);
    }

    let prompt = format!("{user_text}\n\n{BREVITY_INSTRUCTION}");
    let reply = (state.on_message)(inbound.from, prompt).await?;
    Ok(Some(reply))
}

async fn transcribe_media(
    state: &TwilioState,
    speech: &dyn SpeechProvider,
    media_url: &str,
) -> Result<String> {
    let response = state
        .http
        .get(media_url)
        .send()
        .await
        .map_err(|e| Error::Channel(format!("failed to fetch media: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Channel(format!(
            "media fetch returned {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/ogg")
        .to_string();
    let audio = response
        .bytes()
        .await
        .map_err(|e| Error::Channel(format!("failed to read media body: {e}")))?;

    speech.transcribe(audio, &content_type).await
}

/// Split a markdown image out of a reply: `(remaining text, image url)`.
/// Returns `None` when the reply carries no image.
pub fn split_image_markdown(reply: &str) -> Option<(String, String)> {
    static IMAGE_MARKDOWN: OnceLock<Regex> = OnceLock::new();
    let re = IMAGE_MARKDOWN.get_or_init(|| Regex::new(r"!\[.*?\]\((.*?)\)").expect("valid regex"));

    let captures = re.captures(reply)?;
    let url = captures.get(1)?.as_str().to_string();
    let text = re.replace_all(reply, "").trim().to_string();
    Some((text, url))
}
