use std::{collections::HashMap, fmt, future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    sync::watch::{channel as watch_channel, Receiver, Sender},
    time::Instant,
};

use crate::{stats::Counters, CacheStats, Error};

/// `None` until the producer settles
type Outcome<V, E> = Option<Result<V, E>>;

struct CacheEntry<V> {
    value: V,
    /// `None` if `now + ttl` does not fit in an [`Instant`], such an entry never expires
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

struct Shared<V, E> {
    store: Mutex<HashMap<String, CacheEntry<V>>>,
    in_flight: Mutex<HashMap<String, Receiver<Outcome<V, E>>>>,
    counters: Counters,
}

/// In-memory TTL store combined with an in-flight registry that collapses
/// concurrent calls for the same key into a single producer invocation.
///
/// Cloning is cheap and every clone shares the same store and registry, so a
/// single instance is built at startup and handed to whatever needs it.
///
/// The store and the registry are independent: [`Self::coalesce`]
/// never reads or writes cached values. A producer that wants its result
/// cached calls [`Self::set`] itself, which lets it decide what is worth
/// caching (and for how long).
///
/// There is no capacity bound, entries for distinct keys accumulate until
/// they are read after expiry or deleted.
pub struct CoalescingCache<V, E> {
    shared: Arc<Shared<V, E>>,
}

impl<V, E> CoalescingCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// Fetch an unexpired value
    ///
    /// An expired entry is removed the first time it is looked up.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut store = self.shared.store.lock();

        let Some(entry) = store.get(key) else {
            self.shared.counters.miss();
            return None;
        };

        if entry.is_live(Instant::now()) {
            self.shared.counters.hit();
            return Some(entry.value.clone());
        }

        store.remove(key);
        self.shared.counters.expired();
        self.shared.counters.miss();
        None
    }

    /// Store a value for `ttl`, replacing whatever was under `key`
    ///
    /// A zero `ttl` stores an entry that is already expired.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };

        self.shared.store.lock().insert(key.into(), entry);
    }

    /// Remove any value stored under `key`
    pub fn delete(&self, key: &str) {
        self.shared.store.lock().remove(key);
    }

    /// Run `producer` unless an invocation for `key` is already in flight, in
    /// which case wait for that one instead.
    ///
    /// Every caller joined on an invocation receives the same outcome. The
    /// registry entry is cleared before anyone is woken, so a caller arriving
    /// after settlement always starts a fresh invocation.
    ///
    /// The producer runs as its own task: dropping this future only stops
    /// this caller from waiting, the invocation carries on for everyone else.
    pub async fn coalesce<F, Fut>(&self, key: impl Into<String>, producer: F) -> Result<V, Error<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = key.into();

        // Check and register under one lock so only a single caller can lead
        let (receiver, sender) = {
            let mut in_flight = self.shared.in_flight.lock();

            match in_flight.get(&key) {
                Some(receiver) => (receiver.clone(), None),
                None => {
                    let (sender, receiver) = watch_channel(None);
                    in_flight.insert(key.clone(), receiver.clone());
                    (receiver, Some(sender))
                }
            }
        };

        match sender {
            Some(sender) => {
                tracing::debug!(%key, "Starting producer");
                self.shared.counters.producer_run();

                let registration = Registration {
                    shared: Arc::clone(&self.shared),
                    key,
                    sender,
                    released: false,
                };

                let future = producer();
                tokio::spawn(async move {
                    let outcome = future.await;
                    registration.settle(outcome);
                });
            }
            None => {
                tracing::debug!(%key, "Joining producer already in flight");
                self.shared.counters.joined();
            }
        }

        Self::wait_for(receiver).await
    }

    async fn wait_for(mut receiver: Receiver<Outcome<V, E>>) -> Result<V, Error<E>> {
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(Error::Producer(error)),
            None => Err(Error::Abandoned),
        }
    }

    /// Number of entries currently held, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.shared.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys with a producer currently running
    pub fn in_flight_count(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.counters.snapshot()
    }
}

impl<V, E> Clone for CoalescingCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V, E> Default for CoalescingCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for CoalescingCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescingCache")
            .field("entries", &self.shared.store.lock().len())
            .field("in_flight", &self.shared.in_flight.lock().len())
            .finish()
    }
}

/// Ownership of a registry entry, held by the running producer.
///
/// Dropping it without settling (the producer panicked or the runtime shut
/// down) still clears the entry, and waiters see [`Error::Abandoned`] once the
/// sender goes away.
struct Registration<V, E> {
    shared: Arc<Shared<V, E>>,
    key: String,
    sender: Sender<Outcome<V, E>>,
    released: bool,
}

impl<V, E> Registration<V, E> {
    fn settle(mut self, outcome: Result<V, E>) {
        self.release();

        tracing::debug!(
            key = %self.key,
            success = outcome.is_ok(),
            waiters = self.sender.receiver_count(),
            "Producer settled"
        );

        self.sender.send_replace(Some(outcome));
    }

    /// Must run before the outcome is published
    fn release(&mut self) {
        if !self.released {
            self.shared.in_flight.lock().remove(&self.key);
            self.released = true;
        }
    }
}

impl<V, E> Drop for Registration<V, E> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(key = %self.key, "Producer abandoned before settling");
            self.release();
        }
    }
}
