use crate::models::{Channel, FollowedUser, Game, Page, PageCursor, Stream};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Categories of upstream failures surfaced to the router.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    /// The response arrived but did not have the expected shape.
    #[error("malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
    #[error("{message}")]
    Other { message: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ApiError::Malformed { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client id plus bearer token for an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Result of validating a token with the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub client_id: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Read operations the router needs from Twitch.
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// One page of the top games listing, most popular first.
    async fn top_games(&self, cursor: Option<&PageCursor>) -> ApiResult<Page<Game>>;

    async fn search_channels(&self, query: &str, limit: usize) -> ApiResult<Vec<Channel>>;

    /// Channels for the given logins, in the order given. Unknown logins are skipped.
    async fn channels_by_login(&self, logins: &[String]) -> ApiResult<Vec<Channel>>;

    async fn followed_users(&self, username: &str, limit: usize) -> ApiResult<Vec<FollowedUser>>;

    /// Followed channels that are live right now.
    async fn followed_streams(&self, username: &str, limit: usize) -> ApiResult<Vec<Stream>>;
}

/// OAuth operations plus construction of an authenticated [`TwitchApi`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn validate_token(&self, token: &str) -> ApiResult<TokenInfo>;

    /// Client-credentials grant; returns the new access token.
    async fn issue_app_token(&self, client_id: &str, client_secret: &str) -> ApiResult<String>;

    fn connect(&self, credentials: &Credentials) -> ApiResult<Arc<dyn TwitchApi>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_token() {
        let creds = Credentials {
            client_id: "cid".into(),
            token: "very-secret".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("cid"));
        assert!(!shown.contains("very-secret"));
    }

    #[test]
    fn error_predicates() {
        assert!(ApiError::Unauthorized {
            message: "bad".into()
        }
        .is_unauthorized());
        assert!(ApiError::Malformed {
            endpoint: "games/top".into(),
            message: "eof".into()
        }
        .is_malformed());
        assert!(!ApiError::Transport {
            message: "reset".into()
        }
        .is_malformed());
    }
}
