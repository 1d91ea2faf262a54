use std::sync::Arc;

use crate::{
    cache::{DirectoryCache, IdentityCache},
    config::{Config, ListFailurePolicy, LogoutPolicy, DEFAULT_TOKEN_NAMESPACE},
    oauth::OAuthFlowController,
    paging::PaginatedFetcher,
    ports::{ChatGateway, PlatformConnector, TokenStore},
    session::SessionRegistry,
};

/// Knobs for [`BotContext::new`], usually taken from [`Config`].
#[derive(Clone, Debug)]
pub struct ContextSettings {
    pub token_namespace: String,
    pub redirect_uri: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub list_failure_policy: ListFailurePolicy,
    pub logout_policy: LogoutPolicy,
}

impl ContextSettings {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        let fetcher = PaginatedFetcher::default();
        Self {
            token_namespace: DEFAULT_TOKEN_NAMESPACE.to_string(),
            redirect_uri: redirect_uri.into(),
            page_size: fetcher.per_page(),
            max_pages: fetcher.max_pages(),
            list_failure_policy: ListFailurePolicy::default(),
            logout_policy: LogoutPolicy::default(),
        }
    }
}

impl From<&Config> for ContextSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            token_namespace: cfg.token_namespace.clone(),
            redirect_uri: cfg.platform.redirect_uri.clone(),
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
            list_failure_policy: cfg.list_failure_policy,
            logout_policy: cfg.logout_policy,
        }
    }
}

/// Everything a handler needs, owned in one place and shared behind `Arc`.
///
/// Each instance has its own caches, so tests build one per case.
#[derive(Clone)]
pub struct BotContext {
    pub sessions: Arc<SessionRegistry>,
    pub identities: Arc<IdentityCache>,
    pub directory: Arc<DirectoryCache>,
    pub oauth: Arc<OAuthFlowController>,
    pub chat: Arc<dyn ChatGateway>,
}

impl BotContext {
    pub fn new(
        settings: ContextSettings,
        connector: Arc<dyn PlatformConnector>,
        store: Arc<dyn TokenStore>,
        chat: Arc<dyn ChatGateway>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            connector,
            store,
            settings.token_namespace,
        ));
        let identities = Arc::new(IdentityCache::new(sessions.clone()));
        let directory = Arc::new(DirectoryCache::new(
            sessions.clone(),
            PaginatedFetcher::new(settings.page_size, settings.max_pages),
            settings.list_failure_policy,
        ));
        let oauth = Arc::new(OAuthFlowController::new(
            sessions.clone(),
            identities.clone(),
            directory.clone(),
            chat.clone(),
            settings.redirect_uri,
            settings.logout_policy,
        ));

        Self {
            sessions,
            identities,
            directory,
            oauth,
            chat,
        }
    }
}
