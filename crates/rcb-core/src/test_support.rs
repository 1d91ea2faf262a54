//! In-process fakes for the ports, shared by the unit tests in this crate.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    domain::{
        AddressBookContact, BotUserId, ExtensionDirectoryEntry, GroupId, Identity,
        PhoneNumberEntry, Token,
    },
    errors::Error,
    paging::{Page, PageRequest},
    ports::{ChatGateway, PlatformClient, PlatformConnector, TokenPartition},
    Result,
};

pub fn live_token() -> Token {
    Token {
        access_token: "access".to_string(),
        token_type: "bearer".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: Utc::now() + Duration::hours(1),
        refresh_token_expires_at: None,
        owner_id: None,
    }
}

pub fn alice() -> Identity {
    Identity {
        name: "Alice".to_string(),
        extension_number: "101".to_string(),
        email: "a@x.com".to_string(),
    }
}

pub fn ext(name: &str, first: &str, last: &str, number: &str) -> ExtensionDirectoryEntry {
    ExtensionDirectoryEntry {
        name: name.to_string(),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        extension_number: Some(number.to_string()),
        features: Vec::new(),
    }
}

pub fn paged<T: Clone>(pages: &[Vec<T>]) -> Vec<Page<T>> {
    let total = pages.len() as u32;
    pages
        .iter()
        .enumerate()
        .map(|(i, records)| Page {
            records: records.clone(),
            page: i as u32 + 1,
            total_pages: total,
        })
        .collect()
}

/// Scripted platform shared by every client the connector hands out.
#[derive(Default)]
pub struct FakePlatform {
    pub identity: Mutex<Option<Identity>>,
    pub extension_pages: Mutex<Vec<Page<ExtensionDirectoryEntry>>>,
    pub phone_pages: Mutex<Vec<Page<PhoneNumberEntry>>>,
    pub address_book: Mutex<Option<Vec<AddressBookContact>>>,
    /// Page number that fails on any list endpoint.
    pub fail_page: Mutex<Option<u32>>,
    pub reject_code: Mutex<Option<String>>,

    pub calls: AtomicUsize,
    pub identity_calls: AtomicUsize,
    pub extension_calls: AtomicUsize,
    pub phone_calls: AtomicUsize,
    pub address_book_calls: AtomicUsize,
    pub exchanges: Mutex<Vec<(String, String)>>,
    pub logouts: AtomicUsize,
}

impl FakePlatform {
    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self, counter: &AtomicUsize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn page<T: Clone>(&self, pages: &Mutex<Vec<Page<T>>>, req: PageRequest) -> Result<Page<T>> {
        if *self.fail_page.lock().unwrap() == Some(req.page) {
            return Err(Error::ListFetch(format!("page {} unavailable", req.page)));
        }
        let pages = pages.lock().unwrap();
        if pages.is_empty() {
            return Ok(Page {
                records: Vec::new(),
                page: 1,
                total_pages: 1,
            });
        }
        pages
            .get(req.page as usize - 1)
            .cloned()
            .ok_or_else(|| Error::ListFetch(format!("no page {}", req.page)))
    }
}

struct FakeClient {
    platform: Arc<FakePlatform>,
    tokens: TokenPartition,
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn has_valid_token(&self) -> bool {
        matches!(self.tokens.get().await, Ok(Some(t)) if t.access_valid_at(Utc::now()))
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str, force: bool) -> String {
        format!("https://auth.example/authorize?redirect_uri={redirect_uri}&state={state}&force={force}")
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<()> {
        self.platform.calls.fetch_add(1, Ordering::SeqCst);
        self.platform
            .exchanges
            .lock()
            .unwrap()
            .push((code.to_string(), redirect_uri.to_string()));
        if self.platform.reject_code.lock().unwrap().as_deref() == Some(code) {
            return Err(Error::TokenExchange("invalid_grant".to_string()));
        }
        self.tokens.set(live_token()).await
    }

    async fn logout(&self) -> Result<()> {
        self.platform.hit(&self.platform.logouts);
        self.tokens.clear().await
    }

    async fn current_identity(&self) -> Result<Identity> {
        self.platform.hit(&self.platform.identity_calls);
        self.platform
            .identity
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::ListFetch("identity unavailable".to_string()))
    }

    async fn list_extensions(&self, req: PageRequest) -> Result<Page<ExtensionDirectoryEntry>> {
        self.platform.hit(&self.platform.extension_calls);
        self.platform.page(&self.platform.extension_pages, req)
    }

    async fn list_phone_numbers(&self, req: PageRequest) -> Result<Page<PhoneNumberEntry>> {
        self.platform.hit(&self.platform.phone_calls);
        self.platform.page(&self.platform.phone_pages, req)
    }

    async fn search_address_book(&self, starts_with: &str) -> Result<Vec<AddressBookContact>> {
        self.platform.hit(&self.platform.address_book_calls);
        let Some(book) = self.platform.address_book.lock().unwrap().clone() else {
            return Err(Error::External("address book unavailable".to_string()));
        };
        Ok(book
            .into_iter()
            .filter(|c| {
                c.first_name
                    .as_deref()
                    .is_some_and(|f| f.starts_with(starts_with))
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub platform: Arc<FakePlatform>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl PlatformConnector for FakeConnector {
    fn connect(&self, tokens: TokenPartition) -> Arc<dyn PlatformClient> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakeClient {
            platform: self.platform.clone(),
            tokens,
        })
    }
}

#[derive(Default)]
pub struct FakeChat {
    sent: Mutex<Vec<(GroupId, String)>>,
}

impl FakeChat {
    pub fn sent(&self) -> Vec<(GroupId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl ChatGateway for FakeChat {
    async fn send_message(&self, group: &GroupId, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((group.clone(), text.to_string()));
        Ok(())
    }

    fn mention(&self, user: &BotUserId) -> String {
        format!("<@{user}>")
    }
}
