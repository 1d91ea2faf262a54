use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use rcb_core::{
    commands,
    context::BotContext,
    domain::{BotUserId, CallbackParams, GroupId},
};

use crate::{error::ApiError, AppState, VERIFICATION_HEADER};

pub async fn health() -> &'static str {
    "ok"
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, ApiError> {
    let identity = state.ctx.oauth.handle_callback(&params).await?;
    Ok(Html(format!(
        "<p>Logged in as {} ({}). You can close this page and return to the chat.</p>",
        html_escape(&identity.name),
        html_escape(&identity.extension_number)
    )))
}

/// Inbound chat message as delivered by the bot webhook.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    pub creator_id: String,
    pub group_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookReply {
    pub handled: bool,
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(msg): Json<WebhookMessage>,
) -> Response {
    let presented = headers
        .get(VERIFICATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !token_matches(presented, &state.webhook_token) {
        tracing::warn!(group = %msg.group_id, "webhook rejected: bad verification token");
        return (StatusCode::UNAUTHORIZED, "invalid verification token").into_response();
    }

    let ctx: &BotContext = &state.ctx;
    let user = BotUserId::new(msg.creator_id);
    let group = GroupId::new(msg.group_id);

    match commands::handle_text(ctx, &user, &group, &msg.text).await {
        Ok(handled) => Json(WebhookReply { handled }).into_response(),
        Err(e) => {
            if let Err(send_err) = ctx.chat.send_message(&group, &e.user_message()).await {
                tracing::error!(group = %group, error = %send_err, "failed to report command error");
            }
            ApiError::from(e).into_response()
        }
    }
}

/// Constant-time comparison; an empty expected token never matches.
fn token_matches(presented: &str, expected: &str) -> bool {
    if expected.is_empty() || presented.len() != expected.len() {
        return false;
    }
    presented
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
