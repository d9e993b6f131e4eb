//! Persisted key/value settings shared with the launcher host.
//!
//! The plugin reads credentials and player configuration from here at startup
//! and writes back refreshed tokens or cleared credentials.

use crate::secrets::{CredentialStore, SecretKind, SecretsError};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    ClientId,
    ClientSecret,
    OAuthToken,
    Username,
    ProgramPath,
    ProgramArgs,
    /// Client id saved by `reset_settings` so it can be restored by hand.
    PreviousClientId,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        SettingKey::ClientId,
        SettingKey::ClientSecret,
        SettingKey::OAuthToken,
        SettingKey::Username,
        SettingKey::ProgramPath,
        SettingKey::ProgramArgs,
        SettingKey::PreviousClientId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ClientId => "client_id",
            SettingKey::ClientSecret => "client_secret",
            SettingKey::OAuthToken => "oauth_token",
            SettingKey::Username => "username",
            SettingKey::ProgramPath => "program_path",
            SettingKey::ProgramArgs => "program_args",
            SettingKey::PreviousClientId => "previous_client_id",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, SettingKey::ClientSecret | SettingKey::OAuthToken)
    }

    fn secret_kind(&self) -> Option<SecretKind> {
        match self {
            SettingKey::ClientSecret => Some(SecretKind::ClientSecret),
            SettingKey::OAuthToken => Some(SecretKind::AccessToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to write settings at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error(transparent)]
    Secrets(#[from] SecretsError),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

pub trait SettingsStore: Send + Sync {
    /// Returns the stored value, treating blank strings as absent.
    fn get(&self, key: SettingKey) -> SettingsResult<Option<String>>;

    fn set(&self, key: SettingKey, value: &str) -> SettingsResult<()>;

    fn remove(&self, key: SettingKey) -> SettingsResult<()>;

    /// All present settings, in key order.
    fn entries(&self) -> SettingsResult<Vec<(SettingKey, String)>> {
        let mut out = Vec::new();
        for key in SettingKey::ALL {
            if let Some(value) = self.get(key)? {
                out.push((key, value));
            }
        }
        Ok(out)
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// In-process settings; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<SettingKey, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pairs: &[(SettingKey, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(k, v)| (*k, (*v).to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: SettingKey) -> SettingsResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(non_blank(values.get(&key)))
    }

    fn set(&self, key: SettingKey, value: &str) -> SettingsResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SettingKey) -> SettingsResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(&key);
        Ok(())
    }
}

/// Settings persisted as a flat TOML table. Every mutation rewrites the file.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> SettingsResult<()> {
        let encoded = toml::to_string(values)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: SettingKey) -> SettingsResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(non_blank(values.get(key.as_str())))
    }

    fn set(&self, key: SettingKey, value: &str) -> SettingsResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.as_str().to_string(), value.to_string());
        self.persist(&values)?;
        tracing::debug!(key = %key, "setting updated");
        Ok(())
    }

    fn remove(&self, key: SettingKey) -> SettingsResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if values.remove(key.as_str()).is_some() {
            self.persist(&values)?;
            tracing::debug!(key = %key, "setting removed");
        }
        Ok(())
    }
}

/// Routes secret keys to the OS keyring and everything else to `inner`.
pub struct SecureSettings<S> {
    inner: S,
    creds: CredentialStore,
}

impl<S: SettingsStore> SecureSettings<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            creds: CredentialStore::new(),
        }
    }
}

impl<S: SettingsStore> SettingsStore for SecureSettings<S> {
    fn get(&self, key: SettingKey) -> SettingsResult<Option<String>> {
        match key.secret_kind() {
            Some(kind) => match self.creds.get(kind) {
                Ok(secret) if !secret.trim().is_empty() => Ok(Some(secret)),
                Ok(_) | Err(SecretsError::NotFound { .. }) => Ok(None),
                Err(e) => Err(e.into()),
            },
            None => self.inner.get(key),
        }
    }

    fn set(&self, key: SettingKey, value: &str) -> SettingsResult<()> {
        match key.secret_kind() {
            Some(kind) => Ok(self.creds.store(kind, value)?),
            None => self.inner.set(key, value),
        }
    }

    fn remove(&self, key: SettingKey) -> SettingsResult<()> {
        match key.secret_kind() {
            Some(kind) => Ok(self.creds.delete(kind)?),
            None => self.inner.remove(key),
        }
    }
}
