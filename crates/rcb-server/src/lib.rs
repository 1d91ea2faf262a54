//! HTTP surface: OAuth redirect target and the bot's inbound webhook.

pub mod error;
pub mod handlers;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use rcb_core::context::BotContext;

pub const CALLBACK_PATH: &str = "/oauth/callback";
pub const WEBHOOK_PATH: &str = "/bot/webhook";
pub const VERIFICATION_HEADER: &str = "verification-token";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ctx: BotContext,
    /// Expected value of [`VERIFICATION_HEADER`] on webhook deliveries.
    pub webhook_token: Arc<str>,
}

pub fn router(ctx: BotContext, webhook_token: impl Into<Arc<str>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(CALLBACK_PATH, get(handlers::oauth_callback))
        .route(WEBHOOK_PATH, post(handlers::webhook))
        .with_state(AppState {
            ctx,
            webhook_token: webhook_token.into(),
        })
}

pub async fn serve(
    addr: SocketAddr,
    ctx: BotContext,
    webhook_token: impl Into<Arc<str>>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(ctx, webhook_token)).await?;
    Ok(())
}
