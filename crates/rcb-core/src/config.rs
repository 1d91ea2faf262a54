use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    paging::{DEFAULT_MAX_PAGES, DEFAULT_PER_PAGE},
    Result,
};

pub const DEFAULT_SERVER: &str = "https://platform.ringcentral.com";
pub const DEFAULT_TOKEN_NAMESPACE: &str = "rc-token:glip-user";

/// What a list-backed cache does when the underlying fetch fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListFailurePolicy {
    /// Log, cache an empty list, return it. Later calls do not retry.
    #[default]
    CacheEmpty,
    /// Log and return the error; nothing is cached.
    Propagate,
}

/// Whether logout drops the user's cached identity/directory data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogoutPolicy {
    #[default]
    InvalidateCaches,
    KeepCaches,
}

/// Platform application credentials and endpoints.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub server: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Bot-level access token used to post into chat groups.
    pub bot_token: String,
    pub http_timeout: Duration,
}

/// Typed configuration, loaded from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    pub platform: PlatformConfig,
    pub bind_addr: SocketAddr,
    /// Shared secret the bot platform sends in the `Verification-Token` header.
    pub webhook_token: String,

    // Token storage
    pub token_store_path: Option<PathBuf>,
    pub token_namespace: String,

    // Paging
    pub page_size: u32,
    pub max_pages: u32,

    // Cache policies
    pub list_failure_policy: ListFailurePolicy,
    pub logout_policy: LogoutPolicy,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let client_id = require("RC_CLIENT_ID")?;
        let client_secret = require("RC_CLIENT_SECRET")?;
        let redirect_uri = require("RC_REDIRECT_URI")?;
        let bot_token = require("RC_BOT_TOKEN")?;
        let webhook_token = require("RC_WEBHOOK_TOKEN")?;

        let server = env_str("RC_SERVER")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
            .trim_end_matches('/')
            .to_string();
        let http_timeout = Duration::from_millis(env_u64("HTTP_TIMEOUT_MS").unwrap_or(15_000));

        let bind_addr = match env_str("BIND_ADDR").and_then(non_empty) {
            Some(s) => s
                .trim()
                .parse::<SocketAddr>()
                .map_err(|e| Error::Config(format!("BIND_ADDR {s:?}: {e}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let token_store_path = env_path("TOKEN_STORE_PATH");
        let token_namespace = env_str("TOKEN_NAMESPACE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_TOKEN_NAMESPACE.to_string());

        let page_size = env_u32("PAGE_SIZE").unwrap_or(DEFAULT_PER_PAGE).max(1);
        let max_pages = env_u32("MAX_PAGES").unwrap_or(DEFAULT_MAX_PAGES).max(1);

        let list_failure_policy = match env_str("LIST_FAILURE_POLICY") {
            Some(v) => parse_list_failure_policy(&v)?,
            None => ListFailurePolicy::default(),
        };
        let logout_policy = match env_str("LOGOUT_POLICY") {
            Some(v) => parse_logout_policy(&v)?,
            None => LogoutPolicy::default(),
        };

        Ok(Self {
            platform: PlatformConfig {
                server,
                client_id,
                client_secret,
                redirect_uri,
                bot_token,
                http_timeout,
            },
            bind_addr,
            webhook_token,
            token_store_path,
            token_namespace,
            page_size,
            max_pages,
            list_failure_policy,
            logout_policy,
        })
    }
}

pub fn parse_list_failure_policy(v: &str) -> Result<ListFailurePolicy> {
    match v.trim().to_lowercase().as_str() {
        "" | "cache-empty" | "cache_empty" => Ok(ListFailurePolicy::CacheEmpty),
        "propagate" => Ok(ListFailurePolicy::Propagate),
        other => Err(Error::Config(format!(
            "LIST_FAILURE_POLICY must be cache-empty or propagate, got {other:?}"
        ))),
    }
}

pub fn parse_logout_policy(v: &str) -> Result<LogoutPolicy> {
    match v.trim().to_lowercase().as_str() {
        "" | "invalidate" => Ok(LogoutPolicy::InvalidateCaches),
        "keep" => Ok(LogoutPolicy::KeepCaches),
        other => Err(Error::Config(format!(
            "LOGOUT_POLICY must be invalidate or keep, got {other:?}"
        ))),
    }
}

fn require(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // existing env wins
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_str(key).and_then(non_empty).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
