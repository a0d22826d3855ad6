use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, try_join_all};
use reqwest::{Method, Url};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fetch::Fetcher;
use super::request::{FetchRequest, Response};
use super::settings::OfflineSettings;
use super::storage::CacheStorage;
use super::CacheError;

/// Lifecycle of one deployed cache-manager version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; a later install attempt may start over.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// What to do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Not handled; the host performs the request untouched.
    PassThrough,
    Respond(Response),
}

pub struct OfflineCacheManager<S, F> {
    storage: Arc<S>,
    fetcher: Arc<F>,
    scope: Url,
    shell_url: Url,
    precache_urls: Vec<Url>,
    settings: OfflineSettings,
    precache: String,
    runtime: String,
    state: Mutex<LifecycleState>,
    clients_claimed: AtomicBool,
    revalidations: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S, F> OfflineCacheManager<S, F>
where
    S: CacheStorage + 'static,
    F: Fetcher + 'static,
{
    pub fn new(settings: OfflineSettings, storage: Arc<S>, fetcher: Arc<F>) -> Result<Self, CacheError> {
        let scope = settings.scope_url()?;
        let shell_url = settings.resolve(&settings.shell_document)?;
        let precache_urls = settings
            .precache_urls
            .iter()
            .map(|u| settings.resolve(u))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            storage,
            fetcher,
            scope,
            shell_url,
            precache_urls,
            precache: settings.precache_name(),
            runtime: settings.runtime_name(),
            settings,
            state: Mutex::new(LifecycleState::Parsed),
            clients_claimed: AtomicBool::new(false),
            revalidations: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    fn set_state(&self, state: LifecycleState) {
        *lock(&self.state) = state;
        info!(cache = %self.precache, %state, "Cache manager state changed");
    }

    /// Move `from` → `to`, failing if the manager is anywhere else.
    fn transition(
        &self,
        action: &'static str,
        from: &[LifecycleState],
        to: LifecycleState,
    ) -> Result<(), CacheError> {
        let mut state = lock(&self.state);
        if !from.contains(&*state) {
            return Err(CacheError::InvalidState {
                action,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    pub fn precache_name(&self) -> &str {
        &self.precache
    }

    pub fn runtime_name(&self) -> &str {
        &self.runtime
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Whether activation took control of open clients.
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    // ===== Install =====

    /// Populate the precache with every shell asset, or nothing at all.
    pub async fn install(&self) -> Result<(), CacheError> {
        self.transition(
            "install",
            &[LifecycleState::Parsed, LifecycleState::Redundant],
            LifecycleState::Installing,
        )?;
        info!(cache = %self.precache, assets = self.precache_urls.len(), "Installing");

        match self.fetch_precache().await {
            Ok(entries) => {
                if let Err(e) = self.storage.put_all(&self.precache, entries).await {
                    self.set_state(LifecycleState::Redundant);
                    return Err(e);
                }
                // Installed workers activate straight away instead of waiting.
                self.set_state(LifecycleState::Installed);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Precache failed, install abandoned");
                self.set_state(LifecycleState::Redundant);
                Err(e)
            }
        }
    }

    async fn fetch_precache(&self) -> Result<Vec<(Url, Response)>, CacheError> {
        let fetches = self.precache_urls.iter().map(|url| async move {
            let response = self
                .fetcher
                .fetch(&FetchRequest::get(url.clone()))
                .await
                .map_err(|source| CacheError::Precache {
                    url: url.to_string(),
                    source,
                })?;
            if !response.is_ok() {
                return Err(CacheError::PrecacheStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            Ok::<_, CacheError>((url.clone(), response))
        });
        try_join_all(fetches).await
    }

    // ===== Activate =====

    /// Drop buckets from other versions and take control of clients.
    ///
    /// Returns the names of the deleted buckets.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        self.transition(
            "activate",
            &[LifecycleState::Installed],
            LifecycleState::Activating,
        )?;

        let deleted = match self.delete_stale_buckets().await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(LifecycleState::Installed);
                return Err(e);
            }
        };

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(LifecycleState::Active);
        Ok(deleted)
    }

    async fn delete_stale_buckets(&self) -> Result<Vec<String>, CacheError> {
        let mut deleted = Vec::new();
        for bucket in self.storage.keys().await? {
            if bucket == self.precache || bucket == self.runtime {
                continue;
            }
            if self.storage.delete(&bucket).await? {
                info!(bucket = %bucket, "Deleted stale cache");
                deleted.push(bucket);
            }
        }
        Ok(deleted)
    }

    /// Pick up an installation made by an earlier process.
    ///
    /// If this version's precache already exists the manager moves to
    /// Installed without fetching anything, ready for `activate`. Returns
    /// whether it did.
    pub async fn resume(&self) -> Result<bool, CacheError> {
        if self.state() != LifecycleState::Parsed || !self.storage.has(&self.precache).await? {
            return Ok(false);
        }
        self.transition("resume", &[LifecycleState::Parsed], LifecycleState::Installed)?;
        info!(cache = %self.precache, "Resumed existing install");
        Ok(true)
    }

    // ===== Fetch interception =====

    fn is_static_asset(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin() || self.settings.is_static_host(url)
    }

    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<Interception, CacheError> {
        if self.state() != LifecycleState::Active || request.method != Method::GET {
            return Ok(Interception::PassThrough);
        }

        if request.is_navigation() {
            return self.network_first(request).await.map(Interception::Respond);
        }

        if self.is_static_asset(&request.url) {
            return self
                .stale_while_revalidate(request)
                .await
                .map(Interception::Respond);
        }

        Ok(Interception::PassThrough)
    }

    async fn network_first(&self, request: FetchRequest) -> Result<Response, CacheError> {
        let error = match self.fetcher.fetch(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        warn!(url = %request.url, error = %error, "Navigation failed, serving shell");
        self.storage
            .match_any(&self.shell_url)
            .await?
            .ok_or(CacheError::Network {
                url: request.url.to_string(),
                source: error,
            })
    }

    async fn stale_while_revalidate(&self, request: FetchRequest) -> Result<Response, CacheError> {
        let cached = match self.storage.match_in(&self.runtime, &request.url).await? {
            Some(response) => Some(response),
            None => self.storage.match_in(&self.precache, &request.url).await?,
        };

        let revalidation = revalidate(
            Arc::clone(&self.storage),
            Arc::clone(&self.fetcher),
            self.runtime.clone(),
            request.clone(),
        );

        match cached {
            Some(response) => {
                debug!(url = %request.url, "Serving from cache, revalidating");
                let handle = tokio::spawn(async move {
                    let _ = revalidation.await;
                });
                let mut pending = lock(&self.revalidations);
                pending.retain(|h| !h.is_finished());
                pending.push(handle);
                Ok(response)
            }
            None => {
                debug!(url = %request.url, "Cache miss, waiting on network");
                revalidation.await.map_err(|source| CacheError::Network {
                    url: request.url.to_string(),
                    source,
                })
            }
        }
    }

    /// Wait for every background revalidation started so far.
    pub async fn wait_for_revalidations(&self) {
        let pending = std::mem::take(&mut *lock(&self.revalidations));
        for result in join_all(pending).await {
            if let Err(e) = result {
                warn!(error = %e, "Revalidation task failed");
            }
        }
    }
}

/// Fetch from the network and refresh the runtime bucket with a usable
/// response. Storage errors are logged, never surfaced.
async fn revalidate<S, F>(
    storage: Arc<S>,
    fetcher: Arc<F>,
    runtime: String,
    request: FetchRequest,
) -> Result<Response, super::FetchError>
where
    S: CacheStorage,
    F: Fetcher,
{
    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %request.url, error = %e, "Revalidation failed");
            return Err(e);
        }
    };

    if response.is_runtime_cacheable() {
        match storage.put(&runtime, &request.url, response.clone()).await {
            Ok(()) => debug!(url = %request.url, "Runtime cache updated"),
            Err(e) => warn!(url = %request.url, error = %e, "Failed to update runtime cache"),
        }
    }
    Ok(response)
}
