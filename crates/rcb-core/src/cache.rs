//! Per-bot-user caches of identity and directory data.
//!
//! Entries have no TTL and are never refreshed: they are snapshots taken on first use
//! and kept until [`IdentityCache::invalidate`] / [`DirectoryCache::invalidate`] or
//! restart. Locks are never held across a fetch, so two concurrent first accesses may
//! both hit the platform; the last write wins.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex},
};

use crate::{
    config::ListFailurePolicy,
    domain::{
        BotUserId, Contact, ExtensionDirectoryEntry, Identity, PhoneNumberEntry,
        SMS_SENDER_FEATURE,
    },
    paging::PaginatedFetcher,
    session::SessionRegistry,
    Result,
};

/// `HashMap` behind a std mutex, with clone-out reads.
struct SnapshotMap<K, V> {
    inner: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + Clone, V> SnapshotMap<K, V> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, k: &K) -> Option<Arc<V>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(k)
            .cloned()
    }

    fn put(&self, k: &K, v: V) -> Arc<V> {
        let v = Arc::new(v);
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(k.clone(), v.clone());
        v
    }

    fn remove(&self, k: &K) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(k)
            .is_some()
    }
}

pub struct IdentityCache {
    sessions: Arc<SessionRegistry>,
    entries: SnapshotMap<BotUserId, Identity>,
}

impl IdentityCache {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self {
            sessions,
            entries: SnapshotMap::new(),
        }
    }

    /// Linked extension profile. Fetch errors propagate and nothing is cached.
    pub async fn identity(&self, user: &BotUserId) -> Result<Arc<Identity>> {
        if let Some(hit) = self.entries.get(user) {
            return Ok(hit);
        }

        let session = self.sessions.get_or_create(user);
        let identity = session.client().current_identity().await.map_err(|e| {
            tracing::warn!(user = %user, error = %e, "identity fetch failed");
            e
        })?;
        Ok(self.entries.put(user, identity))
    }

    pub fn invalidate(&self, user: &BotUserId) -> bool {
        self.entries.remove(user)
    }
}

pub struct DirectoryCache {
    sessions: Arc<SessionRegistry>,
    fetcher: PaginatedFetcher,
    policy: ListFailurePolicy,
    extensions: SnapshotMap<BotUserId, Vec<ExtensionDirectoryEntry>>,
    phone_numbers: SnapshotMap<BotUserId, Vec<PhoneNumberEntry>>,
}

impl DirectoryCache {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        fetcher: PaginatedFetcher,
        policy: ListFailurePolicy,
    ) -> Self {
        Self {
            sessions,
            fetcher,
            policy,
            extensions: SnapshotMap::new(),
            phone_numbers: SnapshotMap::new(),
        }
    }

    /// Full extension listing for the user's account.
    pub async fn extension_directory(
        &self,
        user: &BotUserId,
    ) -> Result<Arc<Vec<ExtensionDirectoryEntry>>> {
        if let Some(hit) = self.extensions.get(user) {
            return Ok(hit);
        }

        let client = self.sessions.get_or_create(user).client().clone();
        let fetched = self
            .fetcher
            .fetch_all(|req| {
                let client = client.clone();
                async move { client.list_extensions(req).await }
            })
            .await;
        self.settle(user, "extension directory", fetched, &self.extensions)
    }

    pub async fn phone_numbers(&self, user: &BotUserId) -> Result<Arc<Vec<PhoneNumberEntry>>> {
        if let Some(hit) = self.phone_numbers.get(user) {
            return Ok(hit);
        }

        let client = self.sessions.get_or_create(user).client().clone();
        let fetched = self
            .fetcher
            .fetch_all(|req| {
                let client = client.clone();
                async move { client.list_phone_numbers(req).await }
            })
            .await;
        self.settle(user, "phone numbers", fetched, &self.phone_numbers)
    }

    /// Phone numbers tagged as SMS senders. Entries without a feature list are skipped.
    pub async fn sms_capable_numbers(&self, user: &BotUserId) -> Result<Vec<PhoneNumberEntry>> {
        let all = self.phone_numbers(user).await?;
        Ok(all
            .iter()
            .filter(|p| p.has_feature(SMS_SENDER_FEATURE))
            .cloned()
            .collect())
    }

    /// Directory matches (exact name / first name) followed by live address-book
    /// matches (prefix). The two sources are not de-duplicated.
    pub async fn search_contacts(&self, user: &BotUserId, name: &str) -> Result<Vec<Contact>> {
        let directory = self.extension_directory(user).await?;
        let mut contacts: Vec<Contact> = directory
            .iter()
            .filter(|e| e.name == name || e.first_name.as_deref() == Some(name))
            .map(|e| Contact {
                name: e.name.clone(),
                first_name: e.first_name.clone(),
                last_name: e.last_name.clone(),
                phone_number: e.extension_number.clone(),
            })
            .collect();

        let client = self.sessions.get_or_create(user).client().clone();
        match client.search_address_book(name).await {
            Ok(records) => contacts.extend(records.into_iter().map(|r| Contact {
                name: format!(
                    "{} {}",
                    r.first_name.as_deref().unwrap_or_default(),
                    r.last_name.as_deref().unwrap_or_default()
                ),
                first_name: r.first_name,
                last_name: r.last_name,
                phone_number: r.mobile_phone,
            })),
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "address book search failed");
            }
        }

        Ok(contacts)
    }

    pub fn invalidate(&self, user: &BotUserId) -> bool {
        let a = self.extensions.remove(user);
        let b = self.phone_numbers.remove(user);
        a || b
    }

    fn settle<T>(
        &self,
        user: &BotUserId,
        what: &str,
        fetched: Result<Vec<T>>,
        map: &SnapshotMap<BotUserId, Vec<T>>,
    ) -> Result<Arc<Vec<T>>> {
        match fetched {
            Ok(list) => {
                tracing::debug!(user = %user, count = list.len(), "cached {what}");
                Ok(map.put(user, list))
            }
            Err(e) => {
                tracing::error!(user = %user, error = %e, "failed to fetch {what}");
                match self.policy {
                    ListFailurePolicy::CacheEmpty => Ok(map.put(user, Vec::new())),
                    ListFailurePolicy::Propagate => Err(e),
                }
            }
        }
    }
}
