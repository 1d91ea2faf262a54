//! OAuth login/logout flow driven from chat.
//!
//! A login attempt moves `Unauthenticated -> AwaitingCallback -> Authenticated`, or ends
//! in a failed exchange. Nothing is stored between the login command and the callback:
//! the `state` query parameter carries `<botUserId>:<groupId>` through the provider's
//! redirect and is the only link between the two halves.

use std::sync::Arc;

use crate::{
    cache::{DirectoryCache, IdentityCache},
    config::LogoutPolicy,
    domain::{BotUserId, CallbackParams, GroupId, Identity},
    errors::Error,
    ports::ChatGateway,
    session::SessionRegistry,
    Result,
};

/// `(BotUserId, GroupId)` as carried through the OAuth redirect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthState {
    pub user: BotUserId,
    pub group: GroupId,
}

impl OAuthState {
    pub fn new(user: BotUserId, group: GroupId) -> Self {
        Self { user, group }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }

    /// Split on the first `:`; both halves must be non-empty.
    pub fn decode(raw: &str) -> Result<Self> {
        let (user, group) = raw
            .split_once(':')
            .filter(|(u, g)| !u.is_empty() && !g.is_empty())
            .ok_or_else(|| Error::InvalidCallback("invalid state parameter".to_string()))?;
        Ok(Self {
            user: BotUserId::new(user),
            group: GroupId::new(group),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A usable token already existed and the linked identity was announced.
    Authenticated(Arc<Identity>),
    /// Login link sent; completion happens in [`OAuthFlowController::handle_callback`].
    AwaitingCallback { url: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut,
    NotLoggedIn,
}

pub struct OAuthFlowController {
    sessions: Arc<SessionRegistry>,
    identities: Arc<IdentityCache>,
    directory: Arc<DirectoryCache>,
    chat: Arc<dyn ChatGateway>,
    redirect_uri: String,
    logout_policy: LogoutPolicy,
}

impl OAuthFlowController {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        identities: Arc<IdentityCache>,
        directory: Arc<DirectoryCache>,
        chat: Arc<dyn ChatGateway>,
        redirect_uri: impl Into<String>,
        logout_policy: LogoutPolicy,
    ) -> Self {
        Self {
            sessions,
            identities,
            directory,
            chat,
            redirect_uri: redirect_uri.into(),
            logout_policy,
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Announce the linked account if the token is still good, otherwise send a login link.
    ///
    /// A token that looks valid locally but cannot fetch the identity (revoked remotely,
    /// for instance) is treated like no token at all.
    pub async fn initiate_login(&self, user: &BotUserId, group: &GroupId) -> Result<LoginOutcome> {
        let session = self.sessions.get_or_create(user);
        if session.client().has_valid_token().await {
            match self.identities.identity(user).await {
                Ok(identity) => {
                    self.send_identity(user, group, &identity).await?;
                    return Ok(LoginOutcome::Authenticated(identity));
                }
                Err(e) => {
                    tracing::warn!(user = %user, error = %e, "stored token unusable, sending login link");
                }
            }
        }

        let state = OAuthState::new(user.clone(), group.clone()).encode();
        let url = session
            .client()
            .authorize_url(&self.redirect_uri, &state, true);
        tracing::info!(user = %user, group = %group, "sending login link");
        self.chat
            .send_message(
                group,
                &format!("Please log into your RingCentral account [here]({url})."),
            )
            .await?;
        Ok(LoginOutcome::AwaitingCallback { url })
    }

    /// Complete a login from the provider's redirect and return the linked identity.
    ///
    /// Input is validated before any platform call. An exchange failure is reported to
    /// the originating group and then returned.
    pub async fn handle_callback(&self, params: &CallbackParams) -> Result<Arc<Identity>> {
        let state = match params.state.as_deref() {
            Some(s) if !s.is_empty() => OAuthState::decode(s)?,
            _ => {
                return Err(Error::InvalidCallback(
                    "invalid state parameter".to_string(),
                ))
            }
        };
        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            return Err(Error::InvalidCallback(format!(
                "no auth code, {}, {}",
                params.error.as_deref().unwrap_or("unknown_error"),
                params.error_description.as_deref().unwrap_or("")
            )));
        };

        let OAuthState { user, group } = state;
        let session = self.sessions.get_or_create(&user);
        if let Err(e) = session
            .client()
            .exchange_code(code, &self.redirect_uri)
            .await
        {
            tracing::warn!(user = %user, error = %e, "authorization code exchange failed");
            if let Err(send_err) = self
                .chat
                .send_message(&group, &format!("Login failed: {e}"))
                .await
            {
                tracing::error!(group = %group, error = %send_err, "failed to report login failure");
            }
            return Err(match e {
                Error::TokenExchange(msg) => Error::TokenExchange(msg),
                other => Error::TokenExchange(other.to_string()),
            });
        }

        tracing::info!(user = %user, "login completed");
        let identity = self.identities.identity(&user).await?;
        self.send_identity(&user, &group, &identity).await?;
        Ok(identity)
    }

    pub async fn logout(&self, user: &BotUserId, group: &GroupId) -> Result<LogoutOutcome> {
        let session = match self.sessions.get(user) {
            Some(s) => {
                let valid = s.client().has_valid_token().await;
                valid.then_some(s)
            }
            None => None,
        };
        let Some(session) = session else {
            self.chat
                .send_message(group, &Error::NotAuthenticated.user_message())
                .await?;
            return Ok(LogoutOutcome::NotLoggedIn);
        };

        session.client().logout().await?;
        if self.logout_policy == LogoutPolicy::InvalidateCaches {
            self.identities.invalidate(user);
            self.directory.invalidate(user);
        }
        tracing::info!(user = %user, "logged out");
        self.chat.send_message(group, "Logout success.").await?;
        Ok(LogoutOutcome::LoggedOut)
    }

    async fn send_identity(&self, user: &BotUserId, group: &GroupId, identity: &Identity) -> Result<()> {
        let text = format!(
            "{} The RingCentral account you logged in is {}({}, {}).",
            self.chat.mention(user),
            identity.name,
            identity.extension_number,
            identity.email
        );
        self.chat.send_message(group, &text).await
    }
}
