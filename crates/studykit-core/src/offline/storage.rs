use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use tokio::sync::RwLock;

use super::request::{cache_key, Response};
use super::CacheError;

/// Named cache buckets holding responses keyed by URL.
///
/// Writing to a bucket that does not exist creates it; reading from one
/// does not.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Bucket names in creation order.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a bucket, returning whether it existed.
    async fn delete(&self, bucket: &str) -> Result<bool, CacheError>;

    async fn match_in(&self, bucket: &str, url: &Url) -> Result<Option<Response>, CacheError>;

    async fn put(&self, bucket: &str, url: &Url, response: Response) -> Result<(), CacheError>;

    /// Store every entry or none of them.
    async fn put_all(&self, bucket: &str, entries: Vec<(Url, Response)>) -> Result<(), CacheError>;

    /// URLs cached in a bucket.
    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError>;

    async fn has(&self, bucket: &str) -> Result<bool, CacheError> {
        Ok(self.keys().await?.iter().any(|k| k == bucket))
    }

    /// First match across all buckets, searched in creation order.
    async fn match_any(&self, url: &Url) -> Result<Option<Response>, CacheError> {
        for bucket in self.keys().await? {
            if let Some(response) = self.match_in(&bucket, url).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

#[derive(Debug)]
struct Bucket {
    name: String,
    entries: HashMap<String, Response>,
}

/// Process-local cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<Vec<Bucket>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bucket_mut<'a>(buckets: &'a mut Vec<Bucket>, name: &str) -> &'a mut Bucket {
    match buckets.iter().position(|b| b.name == name) {
        Some(index) => &mut buckets[index],
        None => {
            buckets.push(Bucket {
                name: name.to_string(),
                entries: HashMap::new(),
            });
            let last = buckets.len() - 1;
            &mut buckets[last]
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.buckets.read().await.iter().map(|b| b.name.clone()).collect())
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|b| b.name != bucket);
        Ok(buckets.len() != before)
    }

    async fn match_in(&self, bucket: &str, url: &Url) -> Result<Option<Response>, CacheError> {
        let key = cache_key(url);
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .find(|b| b.name == bucket)
            .and_then(|b| b.entries.get(&key).cloned()))
    }

    async fn put(&self, bucket: &str, url: &Url, response: Response) -> Result<(), CacheError> {
        let mut buckets = self.buckets.write().await;
        bucket_mut(&mut buckets, bucket)
            .entries
            .insert(cache_key(url), response);
        Ok(())
    }

    async fn put_all(&self, bucket: &str, entries: Vec<(Url, Response)>) -> Result<(), CacheError> {
        let mut buckets = self.buckets.write().await;
        let target = bucket_mut(&mut buckets, bucket);
        for (url, response) in entries {
            target.entries.insert(cache_key(&url), response);
        }
        Ok(())
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        let buckets = self.buckets.read().await;
        let mut urls: Vec<String> = buckets
            .iter()
            .find(|b| b.name == bucket)
            .map(|b| b.entries.keys().cloned().collect())
            .unwrap_or_default();
        urls.sort();
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_put_creates_bucket_and_match_finds_it() {
        let storage = MemoryCacheStorage::new();
        let u = url("https://app.example/style.css");
        assert_eq!(storage.match_in("a", &u).await.unwrap(), None);
        assert!(storage.keys().await.unwrap().is_empty());

        storage.put("a", &u, Response::basic(&u, "body")).await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["a"]);
        assert_eq!(storage.match_in("a", &u).await.unwrap().unwrap().body, b"body");
        assert!(storage.has("a").await.unwrap());
        assert!(!storage.has("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_any_searches_in_creation_order() {
        let storage = MemoryCacheStorage::new();
        let u = url("https://app.example/index.html");
        storage.put("old", &u, Response::basic(&u, "old")).await.unwrap();
        storage.put("new", &u, Response::basic(&u, "new")).await.unwrap();
        assert_eq!(storage.match_any(&u).await.unwrap().unwrap().body, b"old");

        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert_eq!(storage.match_any(&u).await.unwrap().unwrap().body, b"new");
    }

    #[tokio::test]
    async fn test_put_all_and_entries() {
        let storage = MemoryCacheStorage::new();
        let a = url("https://app.example/b.js");
        let b = url("https://app.example/a.js#frag");
        storage
            .put_all(
                "pre",
                vec![
                    (a.clone(), Response::basic(&a, "b")),
                    (b.clone(), Response::basic(&b, "a")),
                ],
            )
            .await
            .unwrap();
        assert_eq!(
            storage.entries("pre").await.unwrap(),
            vec!["https://app.example/a.js", "https://app.example/b.js"]
        );
        assert!(storage.entries("missing").await.unwrap().is_empty());
    }
}
