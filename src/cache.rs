// src/cache.rs
//! Batched collection-name resolution with age and capacity pruning.
//!
//! Misses accumulate in a pending queue for `load_delay` after the first one,
//! then go out as a single grouped search. Every caller waiting on an
//! identifier in that batch is released with the same answer, and identifiers
//! the search did not return are cached as not found so they are not asked for
//! again until pruned.
//!
//! ```rust,ignore
//! let cache = NameCache::builder(search)
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//! let name = cache.lookup("gratefuldead").await;
//! ```

use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::OnceCell;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::entry::{decode_entries, encode_entries, normalize, CacheEntry, ResolvedName};
use crate::error::Result;
use crate::pending::{resolve_all, Pending, Waiter};
use crate::search::{SearchParams, SearchService};
use crate::store::PersistentStore;

/// Consumer-facing name lookup, implemented by [`NameCache`].
#[async_trait]
pub trait CollectionNameSource: Send + Sync {
    /// Display name for `identifier`, `None` if it has none.
    async fn collection_name_for(&self, identifier: &str) -> Option<String>;

    /// Submit identifiers for loading without waiting for their names.
    async fn preload_identifiers(&self, identifiers: &[String]);
}

/// Point-in-time counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub batches: u64,
    pub identifiers_queried: u64,
    pub rows_matched: u64,
    pub resolved_absent: u64,
    pub pruned: u64,
    pub persist_failures: u64,
    /// Resolved entries currently held.
    pub entries: usize,
    /// Identifiers waiting for the next batch.
    pub queued: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    batches: AtomicU64,
    identifiers_queried: AtomicU64,
    rows_matched: AtomicU64,
    resolved_absent: AtomicU64,
    pruned: AtomicU64,
    persist_failures: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

struct State {
    entries: HashMap<String, CacheEntry>,
    pending: Pending,
    /// Armed debounce timer, if any.
    batch_timer: Option<BatchTimer>,
    next_timer_id: u64,
    shut_down: bool,
}

/// A debounce timer that has not fired yet.
///
/// The timer task removes itself from [`State`] before dispatching, so a
/// handle still found here belongs to a task that is at most sleeping and is
/// safe to abort.
struct BatchTimer {
    id: u64,
    handle: AbortHandle,
}

struct Inner {
    search: Arc<dyn SearchService>,
    store: Option<Arc<dyn PersistentStore>>,
    config: CacheConfig,
    clock: Clock,
    state: Mutex<State>,
    hydrated: OnceCell<()>,
    counters: Counters,
    pruner: Mutex<Option<AbortHandle>>,
}

/// Builder for [`NameCache`].
pub struct NameCacheBuilder {
    search: Arc<dyn SearchService>,
    store: Option<Arc<dyn PersistentStore>>,
    config: CacheConfig,
}

impl NameCacheBuilder {
    /// Mirror the cache into `store` and hydrate from it on first use.
    pub fn store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and start the pruning task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn build(self) -> Result<NameCache> {
        self.config.validate()?;
        let inner = Arc::new(Inner {
            search: self.search,
            store: self.store,
            config: self.config,
            clock: Clock::new(),
            state: Mutex::new(State {
                entries: HashMap::new(),
                pending: Pending::default(),
                batch_timer: None,
                next_timer_id: 0,
                shut_down: false,
            }),
            hydrated: OnceCell::new(),
            counters: Counters::default(),
            pruner: Mutex::new(None),
        });
        let pruner = spawn_pruner(&inner);
        *inner.pruner.lock() = Some(pruner);
        Ok(NameCache { inner })
    }
}

/// Shared handle to the cache. Cloning is cheap; all clones see one cache.
#[derive(Clone)]
pub struct NameCache {
    inner: Arc<Inner>,
}

impl NameCache {
    pub fn builder(search: Arc<dyn SearchService>) -> NameCacheBuilder {
        NameCacheBuilder {
            search,
            store: None,
            config: CacheConfig::default(),
        }
    }

    /// Resolve the display name for `identifier`.
    ///
    /// Cached answers (including cached "not found") return immediately.
    /// Otherwise the call waits for the batch that carries the identifier.
    pub async fn lookup(&self, identifier: &str) -> Option<String> {
        let id = normalize(identifier);
        self.inner.hydrate().await;

        let rx = {
            let mut state = self.inner.state.lock();
            if let Some(entry) = state.entries.get_mut(&id) {
                entry.touch(self.inner.clock.now_ms());
                bump(&self.inner.counters.hits, 1);
                return entry.name.as_option();
            }
            if state.shut_down {
                return None;
            }
            bump(&self.inner.counters.misses, 1);
            let newly_queued = state.pending.enqueue(&id);
            let rx = state.pending.register(&id);
            if newly_queued {
                self.inner.arm_batch_timer(&mut state);
            }
            rx
        };

        // The sender only disappears without a value if the cache is torn down.
        rx.await.unwrap_or(None)
    }

    /// Queue every identifier that is not already resolved or pending.
    /// Returns once they are submitted; use [`lookup`](Self::lookup) for values.
    pub async fn preload<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = identifiers
            .into_iter()
            .map(|id| normalize(id.as_ref()))
            .collect();
        self.inner.hydrate().await;

        let mut state = self.inner.state.lock();
        if state.shut_down {
            return;
        }
        let mut queued = 0usize;
        for id in &ids {
            if state.entries.contains_key(id) {
                continue;
            }
            if state.pending.enqueue(id) {
                queued += 1;
            }
        }
        if queued > 0 {
            debug!(queued, requested = ids.len(), "preloading collection names");
            self.inner.arm_batch_timer(&mut state);
        }
    }

    /// Send the next batch now instead of waiting out the load delay.
    pub async fn flush(&self) {
        let timer = self.inner.state.lock().batch_timer.take();
        if let Some(timer) = timer {
            timer.handle.abort();
        }
        self.inner.dispatch_batch().await;
    }

    /// Run one pruning pass now.
    pub async fn prune(&self) {
        self.inner.prune().await;
    }

    /// Stop both timers and release every waiting caller with `None`.
    /// Later misses resolve to `None` without querying.
    pub fn shutdown(&self) {
        let waiters = {
            let mut state = self.inner.state.lock();
            state.shut_down = true;
            if let Some(timer) = state.batch_timer.take() {
                timer.handle.abort();
            }
            state.pending.take_all()
        };
        if let Some(pruner) = self.inner.pruner.lock().take() {
            pruner.abort();
        }
        debug!(released = waiters.len(), "collection name cache shut down");
        resolve_all(waiters, &None);
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        let (entries, queued) = {
            let state = self.inner.state.lock();
            (state.entries.len(), state.pending.queued())
        };
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            batches: c.batches.load(Ordering::Relaxed),
            identifiers_queried: c.identifiers_queried.load(Ordering::Relaxed),
            rows_matched: c.rows_matched.load(Ordering::Relaxed),
            resolved_absent: c.resolved_absent.load(Ordering::Relaxed),
            pruned: c.pruned.load(Ordering::Relaxed),
            persist_failures: c.persist_failures.load(Ordering::Relaxed),
            entries,
            queued,
        }
    }
}

#[async_trait]
impl CollectionNameSource for NameCache {
    async fn collection_name_for(&self, identifier: &str) -> Option<String> {
        self.lookup(identifier).await
    }

    async fn preload_identifiers(&self, identifiers: &[String]) {
        self.preload(identifiers).await;
    }
}

impl Inner {
    /// Load the persisted mapping once per process. Failures count as done.
    async fn hydrate(&self) {
        self.hydrated
            .get_or_init(|| async {
                let Some(store) = &self.store else {
                    return;
                };
                match store.get(&self.config.cache_key).await {
                    Ok(Some(raw)) => match decode_entries(&raw, self.clock.now_ms()) {
                        Ok(loaded) => {
                            let count = loaded.len();
                            let mut state = self.state.lock();
                            for (id, entry) in loaded {
                                state.entries.entry(id).or_insert(entry);
                            }
                            debug!(count, "hydrated collection names from store");
                        }
                        Err(e) => warn!("Discarding unreadable persisted collection names: {}", e),
                    },
                    Ok(None) => debug!("no persisted collection names"),
                    Err(e) => {
                        bump(&self.counters.persist_failures, 1);
                        warn!("Failed to load persisted collection names: {}", e);
                    }
                }
            })
            .await;
    }

    /// Start the debounce timer unless one is already running.
    fn arm_batch_timer(self: &Arc<Self>, state: &mut State) {
        if state.batch_timer.is_some() || state.shut_down {
            return;
        }
        state.next_timer_id += 1;
        let id = state.next_timer_id;
        let inner = Arc::clone(self);
        let delay = self.config.load_delay();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if inner.claim_batch_timer(id) {
                inner.dispatch_batch().await;
            }
        });
        state.batch_timer = Some(BatchTimer {
            id,
            handle: task.abort_handle(),
        });
    }

    /// Take the armed slot for timer `id`. False if `flush` or `shutdown`
    /// already took it, in which case the timer must not dispatch.
    fn claim_batch_timer(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        let claimed = matches!(&state.batch_timer, Some(timer) if timer.id == id);
        if claimed {
            state.batch_timer = None;
        }
        claimed
    }

    async fn dispatch_batch(self: &Arc<Self>) {
        self.hydrate().await;

        let batch = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.pending.drain_batch(self.config.batch_size)
        };
        if batch.is_empty() {
            return;
        }

        bump(&self.counters.batches, 1);
        bump(&self.counters.identifiers_queried, batch.len() as u64);
        debug!(count = batch.len(), "querying collection names");

        let params = SearchParams::for_identifiers(&batch);
        let docs = match self.search.search(params).await {
            Ok(response) => response.docs,
            Err(e) => {
                warn!(
                    "Collection name search failed, resolving {} identifiers as absent: {}",
                    batch.len(),
                    e
                );
                Vec::new()
            }
        };

        let mut resolutions: Vec<(Vec<Waiter>, Option<String>)> = Vec::with_capacity(batch.len());
        {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            let now = self.clock.now_ms();
            let mut remaining: IndexSet<String> = batch.into_iter().collect();
            let mut seen: HashSet<String> = HashSet::new();

            for doc in docs {
                let Some(raw_id) = doc.identifier else {
                    continue;
                };
                let id = normalize(&raw_id);
                if !seen.insert(id.clone()) {
                    continue;
                }
                let name = ResolvedName::from_title(doc.title);
                if remaining.shift_remove(&id) {
                    bump(&self.counters.rows_matched, 1);
                    let value = name.as_option();
                    state.entries.insert(id.clone(), CacheEntry::new(name, now));
                    resolutions.push((state.pending.complete(&id), value));
                } else if !state.pending.is_pending(&id) {
                    // Extra row for something nobody is waiting on: keep it.
                    state.entries.insert(id, CacheEntry::new(name, now));
                }
            }

            bump(&self.counters.resolved_absent, remaining.len() as u64);
            for id in remaining {
                state
                    .entries
                    .insert(id.clone(), CacheEntry::new(ResolvedName::NotFound, now));
                resolutions.push((state.pending.complete(&id), None));
            }

            // Batches are capped; whatever is left goes out on the next timer.
            if state.pending.queued() > 0 {
                self.arm_batch_timer(&mut state);
            }
        }

        for (waiters, name) in resolutions {
            resolve_all(waiters, &name);
        }
        self.persist().await;
    }

    async fn prune(&self) {
        self.hydrate().await;

        let removed = {
            let mut state = self.state.lock();
            let entries = &mut state.entries;
            let cutoff = self
                .clock
                .now_ms()
                .saturating_sub(self.config.max_age_ms_i64());

            let mut doomed: HashSet<String> = entries
                .iter()
                .filter(|(_, entry)| entry.last_access < cutoff)
                .map(|(id, _)| id.clone())
                .collect();

            if entries.len() > self.config.max_entries {
                let mut by_age: Vec<(&String, i64)> = entries
                    .iter()
                    .map(|(id, entry)| (id, entry.last_access))
                    .collect();
                by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
                let excess = entries.len() - self.config.max_entries;
                doomed.extend(by_age.into_iter().take(excess).map(|(id, _)| id.clone()));
            }

            for id in &doomed {
                entries.remove(id);
            }
            doomed.len()
        };

        if removed > 0 {
            bump(&self.counters.pruned, removed as u64);
            debug!(removed, "pruned collection names");
        }
        self.persist().await;
    }

    /// Overwrite the stored mapping with the current one. Best effort.
    async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let encoded = {
            let state = self.state.lock();
            encode_entries(&state.entries)
        };
        let result: Result<()> = match encoded {
            Ok(value) => store
                .set(&self.config.cache_key, value, self.config.persist_ttl())
                .await
                .map_err(Into::into),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            bump(&self.counters.persist_failures, 1);
            warn!("Failed to persist collection names: {}", e);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(pruner) = self.pruner.get_mut().take() {
            pruner.abort();
        }
    }
}

/// Periodic pruning. Holds only a weak handle so the cache can be dropped.
fn spawn_pruner(inner: &Arc<Inner>) -> AbortHandle {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let period = inner.config.prune_interval();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            inner.prune().await;
        }
    });
    task.abort_handle()
}
