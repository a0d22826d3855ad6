//! Directory-backed cache storage.
//!
//! Each bucket is one JSON file (`<bucket>.json`) holding the cached
//! responses, each stamped with when it was stored. Bucket creation order
//! lives in a separate `.buckets.json` index so listing never has to parse
//! the buckets themselves.
//!
//! ```text
//! cache_dir/
//! ├── .buckets.json
//! ├── toolkit-precache-v1.0.0.json
//! └── toolkit-runtime-v1.0.0.json
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::request::{cache_key, Response};
use super::storage::CacheStorage;
use super::CacheError;

/// Creation-order index. The leading dot keeps it out of the bucket namespace.
const INDEX_FILE: &str = ".buckets.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BucketFile {
    #[serde(default)]
    entries: BTreeMap<String, CachedData<Response>>,
}

/// Cached entry summary for listings.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
    pub age: String,
}

pub struct DirCacheStorage {
    cache_dir: PathBuf,
    // Serializes read-modify-write of bucket files and the index.
    write_lock: Mutex<()>,
}

impl DirCacheStorage {
    pub async fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        fs::create_dir_all(&cache_dir).await?;
        Ok(Self {
            cache_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, CacheError> {
        let valid = !bucket.is_empty()
            && !bucket.starts_with('.')
            && bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CacheError::InvalidBucket(bucket.to_string()));
        }
        Ok(self.cache_dir.join(format!("{}.json", bucket)))
    }

    /// Read a bucket. A file that no longer parses (left by another
    /// version, or truncated) reads as absent.
    async fn load(&self, bucket: &str) -> Result<Option<BucketFile>, CacheError> {
        let path = self.bucket_path(bucket)?;
        let Some(contents) = read_optional(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&contents) {
            Ok(file) => Ok(Some(file)),
            Err(e) => {
                warn!(bucket, error = %e, "Unreadable cache bucket, treating as empty");
                Ok(None)
            }
        }
    }

    async fn save(&self, bucket: &str, file: &BucketFile) -> Result<(), CacheError> {
        let path = self.bucket_path(bucket)?;
        write_atomic(&path, &serde_json::to_string(file)?).await?;
        debug!(bucket, entries = file.entries.len(), "Wrote cache bucket");
        Ok(())
    }

    async fn load_index(&self) -> Result<Vec<String>, CacheError> {
        let Some(contents) = read_optional(&self.cache_dir.join(INDEX_FILE)).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable cache index, falling back to name order");
            Vec::new()
        }))
    }

    async fn save_index(&self, index: &[String]) -> Result<(), CacheError> {
        write_atomic(
            &self.cache_dir.join(INDEX_FILE),
            &serde_json::to_string(index)?,
        )
        .await
    }

    /// Bucket files present on disk, by name.
    async fn bucket_files(&self) -> Result<Vec<String>, CacheError> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if self.bucket_path(name).is_ok() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Entry details for a bucket, sorted by URL.
    pub async fn entry_info(&self, bucket: &str) -> Result<Vec<EntryInfo>, CacheError> {
        Ok(self
            .load(bucket)
            .await?
            .map(|file| {
                file.entries
                    .into_iter()
                    .map(|(url, cached)| EntryInfo {
                        age: cached.age_display(),
                        status: cached.data.status,
                        bytes: cached.data.body.len(),
                        url,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, CacheError> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write beside the target, then rename over it.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), CacheError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CacheStorage for DirCacheStorage {
    /// Buckets the index does not know about predate it and come first.
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let on_disk = self.bucket_files().await?;
        let index = self.load_index().await?;

        let mut keys: Vec<String> = on_disk
            .iter()
            .filter(|name| !index.contains(*name))
            .cloned()
            .collect();
        keys.extend(index.into_iter().filter(|name| on_disk.contains(name)));
        Ok(keys)
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        let _guard = self.write_lock.lock().await;
        let path = self.bucket_path(bucket)?;
        let existed = match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let mut index = self.load_index().await?;
        let before = index.len();
        index.retain(|name| name != bucket);
        if index.len() != before {
            self.save_index(&index).await?;
        }
        Ok(existed)
    }

    async fn match_in(&self, bucket: &str, url: &Url) -> Result<Option<Response>, CacheError> {
        Ok(self
            .load(bucket)
            .await?
            .and_then(|mut file| file.entries.remove(&cache_key(url)))
            .map(|cached| cached.data))
    }

    async fn put(&self, bucket: &str, url: &Url, response: Response) -> Result<(), CacheError> {
        self.put_all(bucket, vec![(url.clone(), response)]).await
    }

    async fn put_all(&self, bucket: &str, entries: Vec<(Url, Response)>) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load(bucket).await?.unwrap_or_default();
        for (url, response) in entries {
            file.entries.insert(cache_key(&url), CachedData::new(response));
        }
        self.save(bucket, &file).await?;

        let mut index = self.load_index().await?;
        if !index.iter().any(|name| name == bucket) {
            index.push(bucket.to_string());
            self.save_index(&index).await?;
        }
        Ok(())
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .load(bucket)
            .await?
            .map(|file| file.entries.into_keys().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(());
        assert_eq!(cached.age_display(), "just now");
        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");
        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");
        cached.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");
        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[tokio::test]
    async fn test_buckets_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let u = url("https://app.example/index.html");
        {
            let storage = DirCacheStorage::new(dir.path().to_path_buf()).await.unwrap();
            storage
                .put("toolkit-precache-v1", &u, Response::basic(&u, "<html>"))
                .await
                .unwrap();
        }
        let storage = DirCacheStorage::new(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["toolkit-precache-v1"]);
        let hit = storage.match_any(&u).await.unwrap().unwrap();
        assert_eq!(hit.body, b"<html>");

        let info = storage.entry_info("toolkit-precache-v1").await.unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].bytes, 6);
        assert_eq!(info[0].age, "just now");
    }

    #[tokio::test]
    async fn test_keys_follow_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirCacheStorage::new(dir.path().to_path_buf()).await.unwrap();
        let u = url("https://app.example/a.js");
        storage.put("zeta", &u, Response::basic(&u, "1")).await.unwrap();
        storage.put("alpha", &u, Response::basic(&u, "2")).await.unwrap();
        // Rewriting an older bucket does not move it
        storage.put("zeta", &u, Response::basic(&u, "3")).await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["zeta", "alpha"]);
        assert_eq!(storage.match_any(&u).await.unwrap().unwrap().body, b"3");
    }

    #[tokio::test]
    async fn test_delete_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirCacheStorage::new(dir.path().to_path_buf()).await.unwrap();
        let u = url("https://app.example/a.js");
        storage.put("rt", &u, Response::basic(&u, "a")).await.unwrap();
        assert!(storage.delete("rt").await.unwrap());
        assert!(!storage.delete("rt").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());

        assert!(matches!(
            storage.put("../escape", &u, Response::basic(&u, "a")).await,
            Err(CacheError::InvalidBucket(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_bucket_is_listed_but_not_matched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("toolkit-precache-v0.9.0.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("toolkit-runtime-v0.9.0.json"), r#"{"legacy": true}"#).unwrap();

        let storage = DirCacheStorage::new(dir.path().to_path_buf()).await.unwrap();
        let u = url("https://app.example/index.html");
        storage
            .put("toolkit-precache-v1.0.0", &u, Response::basic(&u, "shell"))
            .await
            .unwrap();

        // Pre-index buckets come first, by name
        assert_eq!(
            storage.keys().await.unwrap(),
            vec![
                "toolkit-precache-v0.9.0",
                "toolkit-runtime-v0.9.0",
                "toolkit-precache-v1.0.0"
            ]
        );
        assert_eq!(storage.match_in("toolkit-precache-v0.9.0", &u).await.unwrap(), None);
        assert_eq!(storage.match_any(&u).await.unwrap().unwrap().body, b"shell");
        assert!(storage.entries("toolkit-precache-v0.9.0").await.unwrap().is_empty());

        assert!(storage.delete("toolkit-precache-v0.9.0").await.unwrap());
        assert!(!dir.path().join("toolkit-precache-v0.9.0.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_index_falls_back_to_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirCacheStorage::new(dir.path().to_path_buf()).await.unwrap();
        let u = url("https://app.example/a.js");
        storage.put("b", &u, Response::basic(&u, "b")).await.unwrap();
        storage.put("a", &u, Response::basic(&u, "a")).await.unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "garbage").unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["a", "b"]);
    }
}
