//! Hexagonal ports for the three external collaborators: token storage, the platform
//! REST API and the chat transport.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        AddressBookContact, BotUserId, ExtensionDirectoryEntry, GroupId, Identity,
        PhoneNumberEntry, Token,
    },
    paging::{Page, PageRequest},
    Result,
};

/// Durable key-value persistence for OAuth tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Token>>;
    async fn set(&self, key: &str, token: Token) -> Result<()>;
    async fn clear(&self, key: &str) -> Result<()>;
}

/// One session's slice of a [`TokenStore`], addressed by a fixed key.
#[derive(Clone)]
pub struct TokenPartition {
    store: Arc<dyn TokenStore>,
    key: String,
}

impl TokenPartition {
    pub fn new(store: Arc<dyn TokenStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Partition key for a bot user: `"<namespace>:<botUserId>"`.
    pub fn key_for(namespace: &str, user: &BotUserId) -> String {
        format!("{namespace}:{user}")
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn get(&self) -> Result<Option<Token>> {
        self.store.get(&self.key).await
    }

    pub async fn set(&self, token: Token) -> Result<()> {
        self.store.set(&self.key, token).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(&self.key).await
    }
}

/// Authenticated client for one bot user's platform account.
///
/// Implementations read and write tokens through the [`TokenPartition`] they were
/// built with; callers never handle tokens directly.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Cheap "can I make calls right now" probe. May refresh an expired access token.
    async fn has_valid_token(&self) -> bool;

    /// Authorization URL for the browser leg of the OAuth code flow.
    fn authorize_url(&self, redirect_uri: &str, state: &str, force: bool) -> String;

    /// Trade an authorization code for tokens and persist them.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<()>;

    /// Revoke the current token remotely and forget it locally.
    async fn logout(&self) -> Result<()>;

    async fn current_identity(&self) -> Result<Identity>;

    async fn list_extensions(&self, req: PageRequest) -> Result<Page<ExtensionDirectoryEntry>>;

    async fn list_phone_numbers(&self, req: PageRequest) -> Result<Page<PhoneNumberEntry>>;

    /// Live "starts with" search over the user's personal address book.
    async fn search_address_book(&self, starts_with: &str) -> Result<Vec<AddressBookContact>>;
}

/// Builds a [`PlatformClient`] bound to a token partition.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, tokens: TokenPartition) -> Arc<dyn PlatformClient>;
}

/// Outbound chat transport.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, group: &GroupId, text: &str) -> Result<()>;

    /// Inline mention markup for a user. Plain `@id` unless the transport has its own syntax.
    fn mention(&self, user: &BotUserId) -> String {
        format!("@{user}")
    }
}
