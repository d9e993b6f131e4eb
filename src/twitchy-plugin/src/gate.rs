//! Credential checks run when a session opens.
//!
//! The gate reads the client id, secret and token from settings, validates
//! the token and, when it is missing or rejected, asks for a fresh app token
//! with the client-credentials grant. A refreshed token is written back.

use std::sync::Arc;
use thiserror::Error;
use twitchy_core::api::{ApiError, Connector, Credentials, TwitchApi};
use twitchy_core::settings::{SettingKey, SettingsError, SettingsStore};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("missing setting {key}")]
    CredentialMissing { key: SettingKey },
    #[error("credentials rejected: {message}")]
    CredentialInvalid { message: String },
    /// Twitch could not be reached; stored settings are left alone.
    #[error("twitch unreachable: {message}")]
    Unreachable { message: String },
    #[error("credentials were reset")]
    Reset,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl GateError {
    /// A reset waits for the user to type a new client id; every other
    /// failure is retried on the next query.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GateError::Reset)
    }

    /// Whether the user has to fix their settings before anything works.
    pub fn needs_credentials(&self) -> bool {
        matches!(
            self,
            GateError::CredentialMissing { .. }
                | GateError::CredentialInvalid { .. }
                | GateError::Reset
        )
    }
}

fn unreachable(err: ApiError) -> GateError {
    GateError::Unreachable {
        message: err.to_string(),
    }
}

/// Which grant produced the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A user access token, as identified by the validate endpoint. Only these
    /// can read a user's follows.
    User,
    /// An app token from the client-credentials grant.
    App,
}

#[derive(Clone)]
pub struct Authenticated {
    pub api: Arc<dyn TwitchApi>,
    pub token: TokenKind,
}

/// Either an authenticated client or the reason there is none.
pub enum Session {
    Ready(Authenticated),
    Unauthenticated(GateError),
}

impl Session {
    pub fn is_ready(&self) -> bool {
        matches!(self, Session::Ready(_))
    }

    pub fn token_kind(&self) -> Option<TokenKind> {
        match self {
            Session::Ready(auth) => Some(auth.token),
            Session::Unauthenticated(_) => None,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::Ready(auth) => f.debug_tuple("Ready").field(&auth.token).finish(),
            Session::Unauthenticated(err) => {
                f.debug_tuple("Unauthenticated").field(err).finish()
            }
        }
    }
}

impl From<Result<Authenticated, GateError>> for Session {
    fn from(result: Result<Authenticated, GateError>) -> Self {
        match result {
            Ok(auth) => Session::Ready(auth),
            Err(err) => Session::Unauthenticated(err),
        }
    }
}

pub struct CredentialGate {
    connector: Arc<dyn Connector>,
    settings: Arc<dyn SettingsStore>,
}

impl CredentialGate {
    pub fn new(connector: Arc<dyn Connector>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            connector,
            settings,
        }
    }

    /// Produce an authenticated client from stored settings, refreshing the
    /// token when needed.
    pub async fn open(&self) -> Result<Authenticated, GateError> {
        let client_id = self
            .settings
            .get(SettingKey::ClientId)?
            .ok_or(GateError::CredentialMissing {
                key: SettingKey::ClientId,
            })?;

        let stored = self.settings.get(SettingKey::OAuthToken)?;
        if let Some(token) = stored.as_deref() {
            match self.connector.validate_token(token).await {
                Ok(info) if info.client_id == client_id => {
                    let kind = match info.login {
                        Some(_) => TokenKind::User,
                        None => TokenKind::App,
                    };
                    tracing::debug!(
                        expires_in = ?info.expires_in,
                        ?kind,
                        "stored token is valid"
                    );
                    return self.connect(client_id, token.to_string(), kind);
                }
                Ok(info) => {
                    tracing::info!(
                        token_client = %info.client_id,
                        "stored token belongs to another client id, refreshing"
                    );
                }
                Err(ApiError::Transport { message }) => {
                    return Err(GateError::Unreachable { message });
                }
                Err(err @ ApiError::Status { .. }) => return Err(unreachable(err)),
                Err(err) => {
                    tracing::info!(error = %err, "stored token rejected, refreshing");
                }
            }
        }

        let Some(secret) = self.settings.get(SettingKey::ClientSecret)? else {
            if stored.is_some() {
                self.settings.remove(SettingKey::OAuthToken)?;
            }
            return Err(GateError::CredentialMissing {
                key: SettingKey::ClientSecret,
            });
        };

        match self.connector.issue_app_token(&client_id, &secret).await {
            Ok(token) => {
                self.settings.set(SettingKey::OAuthToken, &token)?;
                tracing::info!("stored refreshed app token");
                self.connect(client_id, token, TokenKind::App)
            }
            Err(err @ (ApiError::Transport { .. } | ApiError::Status { .. })) => {
                Err(unreachable(err))
            }
            Err(err) => {
                self.settings.remove(SettingKey::OAuthToken)?;
                Err(GateError::CredentialInvalid {
                    message: err.to_string(),
                })
            }
        }
    }

    fn connect(
        &self,
        client_id: String,
        token: String,
        kind: TokenKind,
    ) -> Result<Authenticated, GateError> {
        let credentials = Credentials { client_id, token };
        let api = self.connector.connect(&credentials).map_err(unreachable)?;
        Ok(Authenticated { api, token: kind })
    }
}
