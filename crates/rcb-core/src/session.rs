//! Per-bot-user sessions: one platform client bound to one token partition.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    domain::BotUserId,
    ports::{PlatformClient, PlatformConnector, TokenPartition, TokenStore},
};

/// Authenticated-client + token-partition pairing for one bot user.
///
/// Lives for the process lifetime. Logout invalidates the token but keeps the
/// session so a later login reuses the same client.
pub struct Session {
    user: BotUserId,
    tokens: TokenPartition,
    client: Arc<dyn PlatformClient>,
}

impl Session {
    pub fn user(&self) -> &BotUserId {
        &self.user
    }

    pub fn tokens(&self) -> &TokenPartition {
        &self.tokens
    }

    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.client
    }
}

/// Process-wide map of bot user → [`Session`].
pub struct SessionRegistry {
    connector: Arc<dyn PlatformConnector>,
    store: Arc<dyn TokenStore>,
    namespace: String,
    sessions: Mutex<HashMap<BotUserId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(
        connector: Arc<dyn PlatformConnector>,
        store: Arc<dyn TokenStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            store,
            namespace: namespace.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Existing session for `user`, or a freshly connected one. Never fails, no I/O.
    pub fn get_or_create(&self, user: &BotUserId) -> Arc<Session> {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(user.clone())
            .or_insert_with(|| {
                let key = TokenPartition::key_for(&self.namespace, user);
                tracing::debug!(user = %user, key = %key, "creating session");
                let tokens = TokenPartition::new(self.store.clone(), key);
                let client = self.connector.connect(tokens.clone());
                Arc::new(Session {
                    user: user.clone(),
                    tokens,
                    client,
                })
            })
            .clone()
    }

    pub fn get(&self, user: &BotUserId) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
