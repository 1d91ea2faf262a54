//! RingCentral REST adapter: per-session [`PlatformClient`] and the team-messaging
//! [`ChatGateway`](rcb_core::ports::ChatGateway).

mod chat;
mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use rcb_core::{
    config::PlatformConfig,
    domain::{AddressBookContact, ExtensionDirectoryEntry, Identity, PhoneNumberEntry, Token},
    errors::Error,
    paging::{Page, PageRequest},
    ports::{PlatformClient, PlatformConnector, TokenPartition},
    Result,
};

pub use chat::GlipChatGateway;

use wire::{ExtensionInfo, PersonalContact, PhoneNumberInfo, RecordList, TokenResponse};

const EXTENSION_PATH: &str = "/restapi/v1.0/account/~/extension";
const CURRENT_EXTENSION_PATH: &str = "/restapi/v1.0/account/~/extension/~";

/// Application credentials shared by every session.
#[derive(Clone, Debug)]
pub struct AppCredentials {
    pub server: String,
    pub client_id: String,
    pub client_secret: String,
}

impl From<&PlatformConfig> for AppCredentials {
    fn from(cfg: &PlatformConfig) -> Self {
        Self {
            server: cfg.server.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
        }
    }
}

/// Hands out [`RestPlatformClient`]s that share one HTTP connection pool.
#[derive(Clone, Debug)]
pub struct RestConnector {
    app: Arc<AppCredentials>,
    http: reqwest::Client,
}

impl RestConnector {
    pub fn new(app: AppCredentials, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("rcbot/0.1")
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            app: Arc::new(app),
            http,
        })
    }
}

impl PlatformConnector for RestConnector {
    fn connect(&self, tokens: TokenPartition) -> Arc<dyn PlatformClient> {
        Arc::new(RestPlatformClient {
            app: self.app.clone(),
            http: self.http.clone(),
            tokens,
            refresh_lock: Mutex::new(()),
        })
    }
}

/// Platform client for one bot user. Tokens live in its [`TokenPartition`].
pub struct RestPlatformClient {
    app: Arc<AppCredentials>,
    http: reqwest::Client,
    tokens: TokenPartition,
    /// Serialises refreshes; the platform rotates refresh tokens on use.
    refresh_lock: Mutex<()>,
}

impl RestPlatformClient {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.app.server)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<Token> {
        let resp = self
            .http
            .post(self.url("/restapi/oauth/token"))
            .basic_auth(&self.app.client_id, Some(&self.app.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::External(format!("token request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::TokenExchange(format!(
                "{status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::TokenExchange(format!("token json error: {e}")))?;
        Ok(body.into_token(Utc::now()))
    }

    /// Current access token, refreshing it first if only the refresh token is still good.
    async fn live_token(&self) -> Result<Token> {
        let Some(token) = self.tokens.get().await? else {
            return Err(Error::NotAuthenticated);
        };
        if token.access_valid_at(Utc::now()) {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        let Some(token) = self.tokens.get().await? else {
            return Err(Error::NotAuthenticated);
        };
        let now = Utc::now();
        if token.access_valid_at(now) {
            return Ok(token);
        }
        if !token.refresh_valid_at(now) {
            return Err(Error::NotAuthenticated);
        }

        let refresh = token.refresh_token.as_deref().unwrap_or_default();
        tracing::debug!(key = %self.tokens.key(), "refreshing access token");
        let fresh = self
            .token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh)])
            .await?;
        self.tokens.set(fresh.clone()).await?;
        Ok(fresh)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let token = self.live_token().await?;
        let resp = self
            .http
            .request(Method::GET, self.url(path))
            .bearer_auth(&token.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::ListFetch(format!("GET {path}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::ListFetch(format!(
                "GET {path}: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::ListFetch(format!("GET {path}: json error: {e}")))
    }

    async fn list<W, T>(&self, path: &str, req: PageRequest) -> Result<Page<T>>
    where
        W: DeserializeOwned,
        T: From<W>,
    {
        let list: RecordList<W> = self
            .get_json(
                path,
                &[
                    ("perPage", req.per_page.to_string()),
                    ("page", req.page.to_string()),
                ],
            )
            .await?;
        Ok(list.into_page(req))
    }
}

#[async_trait]
impl PlatformClient for RestPlatformClient {
    async fn has_valid_token(&self) -> bool {
        match self.live_token().await {
            Ok(_) => true,
            Err(Error::NotAuthenticated) => false,
            Err(e) => {
                tracing::warn!(key = %self.tokens.key(), error = %e, "token check failed");
                false
            }
        }
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str, force: bool) -> String {
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.app.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("state", state),
        ];
        if force {
            params.push(("force", "true"));
        }
        let base = self.url("/restapi/oauth/authorize");
        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // Server is validated at startup; fall back to the bare endpoint.
            Err(_) => base,
        }
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<()> {
        let token = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;
        self.tokens.set(token).await
    }

    async fn logout(&self) -> Result<()> {
        let Some(token) = self.tokens.get().await? else {
            return Ok(());
        };

        // The local token is dropped regardless; a dangling remote token expires on its own.
        let revoke = self
            .http
            .post(self.url("/restapi/oauth/revoke"))
            .basic_auth(&self.app.client_id, Some(&self.app.client_secret))
            .form(&[("token", token.access_token.as_str())])
            .send()
            .await;
        match revoke {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => tracing::warn!(status = %resp.status(), "token revoke rejected"),
            Err(e) => tracing::warn!(error = %e, "token revoke request failed"),
        }

        self.tokens.clear().await
    }

    async fn current_identity(&self) -> Result<Identity> {
        let ext: ExtensionInfo = self.get_json(CURRENT_EXTENSION_PATH, &[]).await?;
        Ok(ext.into())
    }

    async fn list_extensions(&self, req: PageRequest) -> Result<Page<ExtensionDirectoryEntry>> {
        self.list::<ExtensionInfo, _>(EXTENSION_PATH, req).await
    }

    async fn list_phone_numbers(&self, req: PageRequest) -> Result<Page<PhoneNumberEntry>> {
        self.list::<PhoneNumberInfo, _>(&format!("{CURRENT_EXTENSION_PATH}/phone-number"), req)
            .await
    }

    async fn search_address_book(&self, starts_with: &str) -> Result<Vec<AddressBookContact>> {
        let list: RecordList<PersonalContact> = self
            .get_json(
                &format!("{CURRENT_EXTENSION_PATH}/address-book/contact"),
                &[("startsWith", starts_with.to_string())],
            )
            .await?;
        Ok(list.records.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rcb_core::token_store::MemoryTokenStore;
    use serde_json::json;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> (Arc<dyn PlatformClient>, TokenPartition) {
        let connector = RestConnector::new(
            AppCredentials {
                server: server.uri(),
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
            },
            StdDuration::from_secs(5),
        )
        .unwrap();
        let tokens = TokenPartition::new(Arc::new(MemoryTokenStore::new()), "ns:u1");
        (connector.connect(tokens.clone()), tokens)
    }

    fn token(access_ttl: Duration) -> Token {
        Token {
            access_token: "live-access".to_string(),
            token_type: "bearer".to_string(),
            refresh_token: Some("live-refresh".to_string()),
            expires_at: Utc::now() + access_ttl,
            refresh_token_expires_at: Some(Utc::now() + Duration::days(7)),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn authorize_url_carries_state_and_force() {
        let server = MockServer::start().await;
        let (client, _) = client_for(&server);

        let url = Url::parse(&client.authorize_url("https://bot.example/cb", "u1:g1", true)).unwrap();
        assert_eq!(url.path(), "/restapi/oauth/authorize");
        let q: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(q.contains(&("state".to_string(), "u1:g1".to_string())));
        assert!(q.contains(&("redirect_uri".to_string(), "https://bot.example/cb".to_string())));
        assert!(q.contains(&("client_id".to_string(), "cid".to_string())));
        assert!(q.contains(&("force".to_string(), "true".to_string())));
    }

    #[tokio::test]
    async fn exchange_code_persists_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restapi/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a1",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "r1",
                "refresh_token_expires_in": 604800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        assert!(!client.has_valid_token().await);
        client.exchange_code("c1", "https://bot.example/cb").await.unwrap();
        assert_eq!(tokens.get().await.unwrap().unwrap().access_token, "a1");
        assert!(client.has_valid_token().await);
    }

    #[tokio::test]
    async fn rejected_code_is_token_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restapi/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        let err = client.exchange_code("bad", "https://bot.example/cb").await.unwrap_err();
        assert!(matches!(err, Error::TokenExchange(ref m) if m.contains("invalid_grant")));
        assert!(tokens.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restapi/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a2",
                "expires_in": 3600,
                "refresh_token": "r2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        tokens.set(token(Duration::seconds(-10))).await.unwrap();
        assert!(client.has_valid_token().await);
        assert_eq!(tokens.get().await.unwrap().unwrap().access_token, "a2");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restapi/oauth/token"))
            .and(body_string_contains("refresh_token=live-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a2",
                "expires_in": 3600,
                "refresh_token": "r2"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/restapi/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        tokens.set(token(Duration::seconds(-10))).await.unwrap();
        let (a, b) = tokio::join!(client.has_valid_token(), client.has_valid_token());
        assert!(a && b);
        assert_eq!(tokens.get().await.unwrap().unwrap().access_token, "a2");
    }

    #[tokio::test]
    async fn lists_send_paging_params_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EXTENSION_PATH))
            .and(query_param("perPage", "100"))
            .and(query_param("page", "1"))
            .and(header("Authorization", "Bearer live-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "name": "Bob", "extensionNumber": "201",
                              "contact": { "firstName": "Bob", "lastName": "Smith" } }],
                "paging": { "page": 1, "totalPages": 2 }
            })))
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        tokens.set(token(Duration::hours(1))).await.unwrap();
        let page = client
            .list_extensions(PageRequest {
                page: 1,
                per_page: 100,
            })
            .await
            .unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.records[0].extension_number.as_deref(), Some("201"));
    }

    #[tokio::test]
    async fn identity_and_address_book() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CURRENT_EXTENSION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Alice", "extensionNumber": "101",
                "contact": { "email": "a@x.com" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{CURRENT_EXTENSION_PATH}/address-book/contact")))
            .and(query_param("startsWith", "Bo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "firstName": "Bob", "lastName": "Jones", "mobilePhone": "+1555" }]
            })))
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        tokens.set(token(Duration::hours(1))).await.unwrap();

        let id = client.current_identity().await.unwrap();
        assert_eq!(
            (id.name.as_str(), id.extension_number.as_str(), id.email.as_str()),
            ("Alice", "101", "a@x.com")
        );
        let found = client.search_address_book("Bo").await.unwrap();
        assert_eq!(found[0].mobile_phone.as_deref(), Some("+1555"));
    }

    #[tokio::test]
    async fn list_without_token_is_not_authenticated() {
        let server = MockServer::start().await;
        let (client, _) = client_for(&server);
        let err = client
            .list_phone_numbers(PageRequest {
                page: 1,
                per_page: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[tokio::test]
    async fn logout_revokes_and_clears() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restapi/oauth/revoke"))
            .and(body_string_contains("token=live-access"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (client, tokens) = client_for(&server);
        tokens.set(token(Duration::hours(1))).await.unwrap();
        client.logout().await.unwrap();
        assert!(tokens.get().await.unwrap().is_none());
        assert!(!client.has_valid_token().await);
    }

    #[tokio::test]
    async fn logout_clears_local_token_when_revoke_unreachable() {
        let connector = RestConnector::new(
            AppCredentials {
                server: "http://127.0.0.1:1".to_string(),
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
            },
            StdDuration::from_secs(5),
        )
        .unwrap();
        let tokens = TokenPartition::new(Arc::new(MemoryTokenStore::new()), "ns:u1");
        let client = connector.connect(tokens.clone());
        tokens.set(token(Duration::hours(1))).await.unwrap();

        client.logout().await.unwrap();
        assert!(tokens.get().await.unwrap().is_none());
    }
}
