/// Core error type for the gateway.
///
/// Adapter crates map their specific errors into this type so handlers can decide
/// consistently between a chat reply, an HTTP status, or a log line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed OAuth redirect input (missing/garbled state, missing code).
    #[error("invalid oauth callback: {0}")]
    InvalidCallback(String),

    /// The platform rejected the authorization code.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("not logged in")]
    NotAuthenticated,

    /// A paginated listing or identity lookup failed.
    #[error("list fetch failed: {0}")]
    ListFetch(String),

    #[error("paging exceeded {max_pages} pages")]
    PageLimit { max_pages: u32 },

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Text suitable for a chat reply.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => {
                "You are not logged in. Send `login` to link your account.".to_string()
            }
            other => format!("Something went wrong: {other}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
