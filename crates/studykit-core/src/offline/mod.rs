//! Offline cache management.
//!
//! One [`OfflineCacheManager`] per deployed version owns two buckets: a
//! precache filled at install time with the application shell, and a
//! runtime bucket filled as assets are requested. Navigations go to the
//! network first and fall back to the cached shell; same-origin and
//! allow-listed third-party assets are served stale-while-revalidate.

pub mod disk;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod request;
pub mod settings;
pub mod storage;

pub use disk::{CachedData, DirCacheStorage, EntryInfo};
pub use error::{CacheError, FetchError};
pub use fetch::{Fetcher, HttpFetcher};
pub use manager::{Interception, LifecycleState, OfflineCacheManager};
pub use request::{FetchRequest, RequestMode, Response, ResponseKind};
pub use settings::OfflineSettings;
pub use storage::{CacheStorage, MemoryCacheStorage};
