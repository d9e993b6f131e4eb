//! Size/age eviction for the icon cache directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache directory: {0}")]
    ReadDir(std::io::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Maximum total size in bytes (0 = no limit)
    pub max_size_bytes: u64,
    /// Maximum age of files in seconds (0 = no limit)
    pub max_age_seconds: u64,
    pub enabled: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 64 * 1024 * 1024,
            max_age_seconds: 30 * 24 * 60 * 60,
            enabled: true,
        }
    }
}

impl From<&crate::config::CacheConfig> for CachePolicy {
    fn from(config: &crate::config::CacheConfig) -> Self {
        Self {
            max_size_bytes: config.max_size_mb * 1024 * 1024,
            max_age_seconds: config.max_age_days * 24 * 60 * 60,
            enabled: config.enabled,
        }
    }
}

pub struct CacheManager {
    dir: PathBuf,
    policy: CachePolicy,
}

impl CacheManager {
    pub fn new(dir: PathBuf, policy: CachePolicy) -> Self {
        Self { dir, policy }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove expired files, then the oldest files until under the size cap.
    /// A missing directory is treated as empty.
    pub fn enforce_policy(&self) -> CacheResult<Vec<PathBuf>> {
        if !self.policy.enabled || !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        let entries = self.files()?;

        if self.policy.max_age_seconds > 0 {
            let now = SystemTime::now();
            let max_age = Duration::from_secs(self.policy.max_age_seconds);

            for (path, modified, _) in &entries {
                if let Ok(age) = now.duration_since(*modified) {
                    if age > max_age {
                        if let Err(e) = fs::remove_file(path) {
                            tracing::warn!("Failed to remove old icon: {}", e);
                        } else {
                            removed.push(path.clone());
                        }
                    }
                }
            }
        }

        if self.policy.max_size_bytes > 0 {
            let mut remaining: Vec<_> = entries
                .into_iter()
                .filter(|(path, _, _)| !removed.contains(path))
                .collect();
            let total_size: u64 = remaining.iter().map(|(_, _, size)| size).sum();

            if total_size > self.policy.max_size_bytes {
                remaining.sort_by(|a, b| a.1.cmp(&b.1));

                let size_to_free = total_size - self.policy.max_size_bytes;
                let mut freed = 0u64;

                for (path, _, size) in remaining {
                    if freed >= size_to_free {
                        break;
                    }
                    if let Err(e) = fs::remove_file(&path) {
                        tracing::warn!("Failed to remove icon: {}", e);
                    } else {
                        removed.push(path);
                        freed += size;
                    }
                }
            }
        }

        if !removed.is_empty() {
            tracing::info!(count = removed.len(), dir = %self.dir.display(), "evicted cached icons");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheResult<CacheStats> {
        if !self.dir.exists() {
            return Ok(CacheStats::default());
        }
        let entries = self.files()?;
        Ok(CacheStats {
            total_size: entries.iter().map(|(_, _, size)| size).sum(),
            file_count: entries.len() as u64,
        })
    }

    fn files(&self) -> CacheResult<Vec<(PathBuf, SystemTime, u64)>> {
        Ok(fs::read_dir(&self.dir)
            .map_err(CacheError::ReadDir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                let modified = metadata.modified().ok()?;
                Some((entry.path(), modified, metadata.len()))
            })
            .collect())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_size: u64,
    pub file_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_cache_stats() {
        let dir = tempdir().unwrap();
        let manager = CacheManager::new(dir.path().to_path_buf(), CachePolicy::default());

        File::create(dir.path().join("1.jpg"))
            .unwrap()
            .write_all(b"test")
            .unwrap();
        File::create(dir.path().join("2.png"))
            .unwrap()
            .write_all(b"test data")
            .unwrap();

        let stats = manager.stats().unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size, 13);
    }

    #[test]
    fn test_enforce_policy_removes_old_files() {
        let dir = tempdir().unwrap();
        let policy = CachePolicy {
            max_size_bytes: 1000,
            max_age_seconds: 1,
            enabled: true,
        };
        let manager = CacheManager::new(dir.path().to_path_buf(), policy);

        let file_path = dir.path().join("old.jpg");
        File::create(&file_path)
            .unwrap()
            .write_all(b"test")
            .unwrap();

        std::thread::sleep(Duration::from_secs(2));

        let removed = manager.enforce_policy().unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!file_path.exists());
    }

    #[test]
    fn test_enforce_policy_trims_to_size() {
        let dir = tempdir().unwrap();
        let policy = CachePolicy {
            max_size_bytes: 10,
            max_age_seconds: 0,
            enabled: true,
        };
        let manager = CacheManager::new(dir.path().to_path_buf(), policy);

        let oldest = dir.path().join("a.jpg");
        fs::write(&oldest, [0u8; 8]).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let newest = dir.path().join("b.jpg");
        fs::write(&newest, [0u8; 8]).unwrap();

        let removed = manager.enforce_policy().unwrap();
        assert_eq!(removed, vec![oldest.clone()]);
        assert!(newest.exists());
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let manager =
            CacheManager::new(dir.path().join("absent"), CachePolicy::default());
        assert!(manager.enforce_policy().unwrap().is_empty());
        assert_eq!(manager.stats().unwrap(), CacheStats::default());
    }
}
