//! Secure credential storage using the OS keyring.
//!
//! Secrets are stored under the service name "twitchy" with keys of the form
//! `twitch/<kind>`.

use thiserror::Error;

/// Service name used for all Twitchy credentials in the OS keyring.
const SERVICE_NAME: &str = "twitchy";

const ACCOUNT: &str = "twitch";

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("credential not found: {key}")]
    NotFound { key: String },

    #[error("keyring access denied: {0}")]
    AccessDenied(String),

    #[error("keyring unavailable: {0}")]
    Unavailable(String),

    #[error("keyring error: {0}")]
    Other(String),
}

impl From<keyring::Error> for SecretsError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => SecretsError::NotFound {
                key: "unknown".into(),
            },
            keyring::Error::NoStorageAccess(e) => SecretsError::AccessDenied(e.to_string()),
            keyring::Error::PlatformFailure(e) => SecretsError::Unavailable(e.to_string()),
            other => SecretsError::Other(other.to_string()),
        }
    }
}

pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// OAuth client secret used for the client-credentials grant.
    ClientSecret,
    /// OAuth bearer token.
    AccessToken,
}

impl SecretKind {
    fn as_str(&self) -> &'static str {
        match self {
            SecretKind::ClientSecret => "client_secret",
            SecretKind::AccessToken => "oauth_token",
        }
    }
}

/// Credential store backed by the OS keyring.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.into(),
        }
    }

    fn build_key(kind: SecretKind) -> String {
        format!("{}/{}", ACCOUNT, kind.as_str())
    }

    fn entry(&self, kind: SecretKind) -> SecretsResult<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, &Self::build_key(kind))?)
    }

    pub fn store(&self, kind: SecretKind, secret: &str) -> SecretsResult<()> {
        self.entry(kind)?.set_password(secret)?;
        tracing::debug!(kind = ?kind, "stored credential in keyring");
        Ok(())
    }

    /// Returns `SecretsError::NotFound` if the secret doesn't exist.
    pub fn get(&self, kind: SecretKind) -> SecretsResult<String> {
        match self.entry(kind)?.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound {
                key: Self::build_key(kind),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `Ok(())` even if the secret didn't exist.
    pub fn delete(&self, kind: SecretKind) -> SecretsResult<()> {
        match self.entry(kind)?.delete_credential() {
            Ok(()) => {
                tracing::debug!(kind = ?kind, "deleted credential from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These avoid touching a real keyring; CI machines usually lack one.

    #[test]
    fn key_building() {
        assert_eq!(
            CredentialStore::build_key(SecretKind::AccessToken),
            "twitch/oauth_token"
        );
        assert_eq!(
            CredentialStore::build_key(SecretKind::ClientSecret),
            "twitch/client_secret"
        );
    }

    #[test]
    fn no_entry_maps_to_not_found() {
        let err: SecretsError = keyring::Error::NoEntry.into();
        assert!(matches!(err, SecretsError::NotFound { .. }));
    }
}
