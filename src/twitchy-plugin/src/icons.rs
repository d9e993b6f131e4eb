//! Downloaded item icons, cached on disk as `<kind>-<record-id>.<ext>`.
//!
//! A cached file is never fetched again. Concurrent downloads of the same id
//! write through a temp file and rename, so the last writer wins with the same
//! bytes.

use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use twitchy_core::cache::{CacheManager, CachePolicy};
use twitchy_core::config::{CacheConfig, TwitchConfig};
use url::Url;

const DEFAULT_EXT: &str = "jpg";

/// Record kind an icon belongs to. Twitch ids are only unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Game,
    Channel,
    Stream,
}

impl IconKind {
    fn prefix(self) -> &'static str {
        match self {
            IconKind::Game => "game",
            IconKind::Channel => "channel",
            IconKind::Stream => "stream",
        }
    }
}

#[derive(Debug, Error)]
pub enum IconError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write icon {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("icon writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct IconCache {
    client: Client,
    manager: CacheManager,
}

impl IconCache {
    pub fn new(cache: &CacheConfig, twitch: &TwitchConfig) -> Result<Self, IconError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(twitch.connect_timeout_secs))
            .timeout(Duration::from_secs(twitch.timeout_secs))
            .build()
            .map_err(IconError::Client)?;
        Ok(Self {
            client,
            manager: CacheManager::new(cache.icon_dir(), CachePolicy::from(cache)),
        })
    }

    pub fn dir(&self) -> &Path {
        self.manager.dir()
    }

    /// Where the icon for `id` lives, whether or not it has been downloaded.
    pub fn path_for(&self, kind: IconKind, id: &str, url: &str) -> PathBuf {
        self.dir().join(format!(
            "{}-{}.{}",
            kind.prefix(),
            file_stem(id),
            extension(url)
        ))
    }

    /// Cached path for the icon, downloading it first when missing.
    /// Failures are logged and leave the item without an icon.
    pub async fn fetch(&self, kind: IconKind, id: &str, url: &str) -> Option<PathBuf> {
        if url.is_empty() {
            return None;
        }
        match self.ensure(kind, id, url).await {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::debug!(id, error = %err, "icon unavailable");
                None
            }
        }
    }

    async fn ensure(&self, kind: IconKind, id: &str, url: &str) -> Result<PathBuf, IconError> {
        let path = self.path_for(kind, id, url);
        if path.exists() {
            return Ok(path);
        }

        let download = |source| IconError::Download {
            url: url.to_string(),
            source,
        };
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(download)?
            .bytes()
            .await
            .map_err(download)?;

        let dir = self.dir().to_path_buf();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &bytes)).await??;
        tracing::trace!(path = %path.display(), "cached icon");
        Ok(path)
    }

    /// Apply the size/age policy to the icon directory.
    pub fn evict(&self) -> usize {
        match self.manager.enforce_policy() {
            Ok(removed) => removed.len(),
            Err(err) => {
                tracing::warn!(error = %err, "icon cache eviction failed");
                0
            }
        }
    }
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), IconError> {
    let write_err = |source| IconError::Write {
        path: target.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    if let Err(err) = tmp.persist(target) {
        // Another download of the same id may have landed first.
        if !target.exists() {
            return Err(write_err(err.error));
        }
    }
    Ok(())
}

fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

fn extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.last()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let valid = !ext.is_empty()
                && ext.len() <= 4
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| DEFAULT_EXT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cache_in(dir: &Path) -> IconCache {
        let config = CacheConfig {
            icon_dir: Some(dir.to_path_buf()),
            ..CacheConfig::default()
        };
        IconCache::new(&config, &TwitchConfig::default()).unwrap()
    }

    #[test]
    fn extension_comes_from_url_path() {
        assert_eq!(extension("https://cdn/box/27471-52x72.png"), "png");
        assert_eq!(extension("https://cdn/logo.JPEG?x=1"), "jpeg");
        assert_eq!(extension("https://cdn/no-extension"), "jpg");
        assert_eq!(extension("not a url"), "jpg");
    }

    #[test]
    fn ids_are_safe_file_names() {
        assert_eq!(file_stem("game/../27471"), "game____27471");
    }

    #[tokio::test]
    async fn same_id_is_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/art/27471-52x72.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let icons = cache_in(tmp.path());
        let url = format!("{}/art/27471-52x72.png", server.uri());

        let first = icons
            .fetch(IconKind::Game, "27471", &url)
            .await
            .expect("downloaded");
        let second = icons
            .fetch(IconKind::Game, "27471", &url)
            .await
            .expect("cached");

        assert_eq!(first, second);
        assert_eq!(first, tmp.path().join("game-27471.png"));
        assert_eq!(std::fs::read(&first).unwrap(), b"\x89PNG".to_vec());
    }

    #[tokio::test]
    async fn failed_download_yields_no_icon() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let icons = cache_in(tmp.path());
        let url = format!("{}/missing.jpg", server.uri());

        assert_eq!(icons.fetch(IconKind::Stream, "1", &url).await, None);
        assert!(!icons.path_for(IconKind::Stream, "1", &url).exists());
        assert_eq!(icons.fetch(IconKind::Stream, "2", "").await, None);
    }

    #[tokio::test]
    async fn same_id_of_different_kinds_gets_separate_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/art/7.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"GAMEART".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logo/7.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"LOGO".to_vec()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let icons = cache_in(tmp.path());
        let art = format!("{}/art/7.jpg", server.uri());
        let logo = format!("{}/logo/7.jpg", server.uri());

        let game = icons.fetch(IconKind::Game, "7", &art).await.unwrap();
        let channel = icons.fetch(IconKind::Channel, "7", &logo).await.unwrap();

        assert_ne!(game, channel);
        assert_eq!(std::fs::read(&game).unwrap(), b"GAMEART".to_vec());
        assert_eq!(std::fs::read(&channel).unwrap(), b"LOGO".to_vec());
    }
}
