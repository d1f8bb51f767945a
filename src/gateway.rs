//! Inbound HTTP gateway for slash commands.
//!
//! Chat platforms post different wire encodings — Slack sends
//! form-encoded slash-command fields, Teams sends a JSON bot activity.
//! Each endpoint normalizes its encoding into a
//! [`SlashCommandRequest`] before dispatching to the shared handler, so
//! command logic stays platform-agnostic.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::command::CommandHandler;
use crate::models::{SlashCommandRequest, SlashCommandResponse, Visibility};
use crate::{AppError, Result};

/// Fallback response when an inbound payload cannot be understood.
///
/// Internal detail never leaks to the chat platform.
const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Shared gateway state.
#[derive(Clone)]
pub struct GatewayState {
    handler: Arc<CommandHandler>,
    http_port: u16,
}

impl GatewayState {
    /// Build gateway state over the shared command handler.
    #[must_use]
    pub fn new(handler: Arc<CommandHandler>, http_port: u16) -> Self {
        Self { handler, http_port }
    }
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

/// Form-encoded Slack slash-command payload.
#[derive(Debug, Deserialize)]
struct SlackCommandForm {
    #[serde(default)]
    command: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    channel_name: String,
    team_id: Option<String>,
    team_domain: Option<String>,
}

/// JSON reply shape Slack expects from a slash-command endpoint.
#[derive(Debug, Serialize)]
struct SlackCommandReply {
    response_type: &'static str,
    text: String,
}

impl From<SlashCommandResponse> for SlackCommandReply {
    fn from(response: SlashCommandResponse) -> Self {
        Self {
            response_type: match response.visibility {
                Visibility::Ephemeral => "ephemeral",
                Visibility::InChannel => "in_channel",
            },
            text: response.text,
        }
    }
}

async fn slack_command(
    State(state): State<GatewayState>,
    Form(form): Form<SlackCommandForm>,
) -> Json<SlackCommandReply> {
    let request = SlashCommandRequest {
        command: form.command,
        channel_id: form.channel_id,
        channel_name: form.channel_name,
        user_id: form.user_id,
        user_name: form.user_name,
        text: form.text,
        team_id: form.team_id,
        team_domain: form.team_domain,
    };
    Json(state.handler.handle(&request).into())
}

/// JSON reply shape for a Teams bot activity.
#[derive(Debug, Serialize)]
struct TeamsActivityReply {
    #[serde(rename = "type")]
    activity_type: &'static str,
    text: String,
}

/// Strip `<at>…</at>` bot-mention tags Teams embeds in message text.
fn strip_mentions(text: &str) -> String {
    let mut remaining = text;
    let mut out = String::new();
    while let Some(start) = remaining.find("<at>") {
        out.push_str(&remaining[..start]);
        match remaining[start..].find("</at>") {
            Some(end) => remaining = &remaining[start + end + "</at>".len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    out.push_str(remaining);
    out.trim().to_owned()
}

/// Normalize a Teams bot activity into the shared request shape.
///
/// Returns `None` when the activity is missing the fields the handler
/// needs; the caller answers with a generic failure message.
fn normalize_teams_activity(activity: &Value) -> Option<SlashCommandRequest> {
    let text = strip_mentions(activity.get("text")?.as_str()?);
    let from = activity.get("from")?;
    let channel_data = activity.get("channelData")?;
    Some(SlashCommandRequest {
        command: "/relay".into(),
        channel_id: channel_data
            .get("channel")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)?
            .to_owned(),
        channel_name: String::new(),
        user_id: from.get("id").and_then(Value::as_str)?.to_owned(),
        user_name: from
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        text,
        team_id: channel_data
            .get("team")
            .and_then(|t| t.get("id"))
            .and_then(Value::as_str)
            .map(str::to_owned),
        team_domain: None,
    })
}

async fn teams_command(
    State(state): State<GatewayState>,
    Json(activity): Json<Value>,
) -> Json<TeamsActivityReply> {
    let text = match normalize_teams_activity(&activity) {
        Some(request) => state.handler.handle(&request).text,
        None => {
            warn!("malformed teams activity; returning generic failure");
            GENERIC_FAILURE.to_owned()
        }
    };
    Json(TeamsActivityReply {
        activity_type: "message",
        text,
    })
}

/// Build the gateway router.
#[must_use]
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/slack/command", post(slack_command))
        .route("/teams/command", post(teams_command))
        .with_state(state)
}

/// Serve the gateway until the cancellation token fires.
///
/// # Errors
///
/// Returns `AppError::Gateway` if the server fails to bind or serve.
pub async fn serve(state: GatewayState, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], state.http_port));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Gateway(format!("failed to bind on {bind}: {err}")))?;

    info!(%bind, "starting command gateway");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Gateway(format!("gateway server error: {err}")))?;

    info!("command gateway shut down");
    Ok(())
}
