use std::sync::Arc;

use rcb_core::{
    config::Config,
    context::{BotContext, ContextSettings},
    ports::TokenStore,
    token_store::{FileTokenStore, MemoryTokenStore},
};
use rcb_platform::{AppCredentials, GlipChatGateway, RestConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rcb_core::logging::init("rcb")?;

    let cfg = Config::load()?;

    let store: Arc<dyn TokenStore> = match &cfg.token_store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using file token store");
            Arc::new(FileTokenStore::new(path))
        }
        None => {
            tracing::warn!("TOKEN_STORE_PATH not set; tokens are lost on restart");
            Arc::new(MemoryTokenStore::new())
        }
    };

    let connector = Arc::new(RestConnector::new(
        AppCredentials::from(&cfg.platform),
        cfg.platform.http_timeout,
    )?);
    let chat = Arc::new(GlipChatGateway::from_config(&cfg.platform)?);

    let ctx = BotContext::new(ContextSettings::from(&cfg), connector, store, chat);

    tracing::info!(
        server = %cfg.platform.server,
        redirect_uri = %cfg.platform.redirect_uri,
        "rcb starting"
    );
    rcb_server::serve(cfg.bind_addr, ctx, cfg.webhook_token.clone()).await
}
