use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use crate::error::{FetchError, MutationError};
use crate::navigation::{Epoch, EpochClock};
use crate::transport::{TransportState, WriteMethod};

// --- Cache Keys & Tags ---

/// Tag
///
/// A coarse label naming a family of server data (for example "Issues").
/// Reads declare which tags their response depends on; writes declare which
/// tags they dirty. The coordinator never inspects payloads to find out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl From<&str> for Tag {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

/// CacheKey
///
/// The identity of one read: endpoint plus canonical parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    params: String,
}

impl CacheKey {
    /// Derives the key for a request. Parameters are serialized through
    /// `serde_json::Value`, whose object form keeps members sorted, so equal
    /// parameter sets produce equal keys regardless of the order the caller
    /// assembled them in.
    pub fn new(endpoint: &str, params: &Value) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: params.to_string(),
        }
    }
}

// --- The Index ---

/// One cached response. A stale entry keeps its value; staleness only
/// controls whether `read` may return it without going to the network.
struct CacheEntry {
    value: Value,
    fresh: bool,
    provides: HashSet<Tag>,
}

type InFlightCell = Arc<OnceCell<Result<Value, FetchError>>>;

/// All mutable coordinator state, behind one lock. The lock is never held
/// across an await; async waiting happens on the per-key cells instead.
#[derive(Default)]
struct CacheIndex {
    /// Bumped by `clear` so fetches started before the wipe cannot
    /// repopulate the fresh index afterwards.
    generation: u64,
    entries: HashMap<CacheKey, CacheEntry>,
    tag_index: HashMap<Tag, HashSet<CacheKey>>,
    in_flight: HashMap<CacheKey, InFlightCell>,
}

impl CacheIndex {
    fn store(&mut self, key: CacheKey, value: Value, provides: &[Tag]) {
        // Re-point the tag index if this key was stored before under
        // different tags.
        if let Some(previous) = self.entries.get(&key) {
            for tag in &previous.provides {
                if let Some(keys) = self.tag_index.get_mut(tag) {
                    keys.remove(&key);
                    if keys.is_empty() {
                        self.tag_index.remove(tag);
                    }
                }
            }
        }

        let provides: HashSet<Tag> = provides.iter().cloned().collect();
        for tag in &provides {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                fresh: true,
                provides,
            },
        );
    }

    /// Marks every entry intersecting the given tags as stale, keeping the
    /// values in place. Returns how many entries flipped from fresh.
    fn invalidate(&mut self, tags: &[Tag]) -> usize {
        let mut marked = 0;
        let mut seen: HashSet<CacheKey> = HashSet::new();

        for tag in tags {
            let Some(keys) = self.tag_index.get(tag) else {
                continue;
            };

            for key in keys {
                if !seen.insert(key.clone()) {
                    continue;
                }

                if let Some(entry) = self.entries.get_mut(key) {
                    if entry.fresh {
                        entry.fresh = false;
                        marked += 1;
                    }
                }
            }
        }

        marked
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.tag_index.clear();
        self.in_flight.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

// --- Coordinator ---

/// CacheCoordinator
///
/// The single shared read/write front for all server data. Reads are served
/// from cache when fresh, coalesced onto one network request when not;
/// writes go straight through and mark the tags they dirty. All state lives
/// behind a plain mutex, so fresh hits are fully synchronous.
pub struct CacheCoordinator {
    transport: TransportState,
    clock: Arc<EpochClock>,
    index: Mutex<CacheIndex>,
}

impl CacheCoordinator {
    pub fn new(transport: TransportState, clock: Arc<EpochClock>) -> Self {
        Self {
            transport,
            clock,
            index: Mutex::new(CacheIndex::default()),
        }
    }

    /// Reads `endpoint` with `params`, declaring the tags the response
    /// depends on.
    ///
    /// A fresh entry is returned without touching the network. Otherwise all
    /// concurrent callers of the same key share a single fetch and receive
    /// the same outcome, errors included. A result that resolves after the
    /// navigation moved on, or after the cache was cleared, is discarded and
    /// reported as `Superseded`.
    pub async fn read(
        &self,
        endpoint: &str,
        params: &Value,
        provides: &[Tag],
    ) -> Result<Value, FetchError> {
        let key = CacheKey::new(endpoint, params);
        let epoch = self.clock.current();

        let (cell, generation) = {
            let mut index = self.index.lock().unwrap();

            if let Some(entry) = index.entries.get(&key) {
                if entry.fresh {
                    tracing::trace!(endpoint, "Cache hit");
                    return Ok(entry.value.clone());
                }
            }

            let generation = index.generation;
            let cell = index
                .in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();

            (cell, generation)
        };

        let transport = self.transport.clone();
        let fetch_endpoint = endpoint.to_string();
        let fetch_params = params.clone();

        let result = cell
            .get_or_init(|| async move {
                tracing::debug!(endpoint = %fetch_endpoint, "Cache miss; fetching");
                transport
                    .fetch(&fetch_endpoint, &fetch_params)
                    .await
                    .map_err(FetchError::from)
            })
            .await
            .clone();

        self.complete_read(key, cell, result, generation, epoch, provides)
    }

    /// Finishes a read once its cell resolved: retires the in-flight record,
    /// discards the result if the world moved on, and otherwise commits a
    /// success into the index. Exactly one coalesced caller, the one that
    /// retires the record, performs the commit; the rest hand back the
    /// shared result without writing to the index.
    fn complete_read(
        &self,
        key: CacheKey,
        cell: InFlightCell,
        result: Result<Value, FetchError>,
        generation: u64,
        epoch: Epoch,
        provides: &[Tag],
    ) -> Result<Value, FetchError> {
        let mut index = self.index.lock().unwrap();

        // Every coalesced caller runs this; whichever gets here first
        // retires the record, and a record replaced by a newer flight is
        // left alone.
        let retired = index
            .in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &cell));
        if retired {
            index.in_flight.remove(&key);
        }

        if index.generation != generation || !self.clock.is_current(epoch) {
            tracing::debug!(endpoint = %key.endpoint, "Fetch result superseded; discarding");
            return Err(FetchError::Superseded);
        }

        match result {
            Ok(value) => {
                // Followers never store; an invalidation landing between two
                // completions stays in effect.
                if retired {
                    index.store(key, value.clone(), provides);
                }
                Ok(value)
            }
            // A failed refresh leaves any previous stale value in place for
            // optimistic display.
            Err(e) => Err(e),
        }
    }

    /// Submits a mutation and, on success, marks every cache entry
    /// intersecting `invalidates` as stale. Invalidation is not gated on the
    /// navigation epoch: once the server accepted the write, the entries are
    /// out of date no matter which page the visitor is on by now.
    pub async fn write(
        &self,
        method: WriteMethod,
        endpoint: &str,
        body: &Value,
        invalidates: &[Tag],
    ) -> Result<Value, MutationError> {
        let response = self
            .transport
            .submit(method, endpoint, body)
            .await
            .map_err(MutationError::from)?;

        let marked = self.index.lock().unwrap().invalidate(invalidates);

        tracing::debug!(
            method = method.as_str(),
            endpoint,
            invalidated = marked,
            "Mutation committed"
        );

        Ok(response)
    }

    /// Returns the cached value for this request regardless of freshness.
    /// This is the optimistic-display path; it never fetches.
    pub fn peek(&self, endpoint: &str, params: &Value) -> Option<Value> {
        let key = CacheKey::new(endpoint, params);
        let index = self.index.lock().unwrap();
        index.entries.get(&key).map(|entry| entry.value.clone())
    }

    /// Whether the entry for this request is fresh. `None` when nothing is
    /// cached for it at all.
    pub fn freshness(&self, endpoint: &str, params: &Value) -> Option<bool> {
        let key = CacheKey::new(endpoint, params);
        let index = self.index.lock().unwrap();
        index.entries.get(&key).map(|entry| entry.fresh)
    }

    /// Manually marks everything intersecting the given tags as stale.
    pub fn invalidate(&self, tags: &[Tag]) -> usize {
        let marked = self.index.lock().unwrap().invalidate(tags);
        if marked > 0 {
            tracing::debug!(invalidated = marked, "Entries marked stale");
        }
        marked
    }

    /// Drops every entry and discards all in-flight results. Used on
    /// sign-in and sign-out, where cached responses may reflect the wrong
    /// identity.
    pub fn clear(&self) {
        self.index.lock().unwrap().clear();
        tracing::debug!("Cache cleared");
    }
}
