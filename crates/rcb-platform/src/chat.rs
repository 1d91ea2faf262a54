use async_trait::async_trait;
use serde_json::json;

use rcb_core::{
    config::PlatformConfig,
    domain::{BotUserId, GroupId},
    errors::Error,
    ports::ChatGateway,
    Result,
};

/// Posts bot replies into team-messaging groups with the bot's own token.
#[derive(Clone, Debug)]
pub struct GlipChatGateway {
    server: String,
    bot_token: String,
    http: reqwest::Client,
}

impl GlipChatGateway {
    pub fn new(server: impl Into<String>, bot_token: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            http,
        }
    }

    pub fn from_config(cfg: &PlatformConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self::new(cfg.server.clone(), cfg.bot_token.clone(), http))
    }
}

#[async_trait]
impl ChatGateway for GlipChatGateway {
    async fn send_message(&self, group: &GroupId, text: &str) -> Result<()> {
        let url = format!("{}/restapi/v1.0/glip/groups/{group}/posts", self.server);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::External(format!("chat post error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "chat post failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(())
    }

    fn mention(&self, user: &BotUserId) -> String {
        format!("![:Person]({user})")
    }
}
