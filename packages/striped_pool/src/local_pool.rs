use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::ResourceManager;
use crate::rendezvous::Rendezvous;
use crate::waiter_queue::WaiterQueue;

/// One independently locked shard of a [`StripedPool`][crate::StripedPool].
///
/// Acquiring hands back a reference to the stripe the resource came from;
/// the resource must be returned to that same stripe via
/// [`put()`][LocalPool::put] or retired via [`destroy()`][LocalPool::destroy].
/// Handing a resource to a different stripe (or to a different pool) breaks
/// the capacity accounting.
pub struct LocalPool<M>
where
    M: ResourceManager,
{
    /// Stable 1-based position of this stripe within its pool.
    index: usize,

    /// Permits this stripe was assigned at construction. Never changes.
    capacity: usize,

    manager: Arc<M>,

    state: Mutex<StripeState<M::Resource>>,
}

/// The mutable state of one stripe. All transitions happen with the stripe
/// mutex held; none of them block.
///
/// # Permit accounting
///
/// `available` counts permits not attached to a live resource held by a
/// caller: `capacity - (resources currently held by callers)`. Cache entries
/// are idle, not held, so:
///
/// * taking from the cache decrements `available` (idle becomes held),
/// * returning to the cache increments it (held becomes idle),
/// * evicting or sweeping a cache entry leaves it alone.
///
/// Two consequences worth knowing when reading the code below: the cache can
/// never be longer than `available`, and a fresh resource can only ever be
/// created while the cache is empty. Together these bound the stripe's total
/// resource count (held plus cached) by `capacity` in every reachable state.
struct StripeState<T> {
    available: usize,

    /// Idle resources ready for reuse, most recently returned last.
    /// Eviction is by age, so ordering is irrelevant here.
    cache: Vec<Idle<T>>,

    /// Callers parked until a permit or resource frees up.
    waiters: WaiterQueue<Arc<Rendezvous<T>>>,
}

/// A cached resource together with the time it was last given back.
struct Idle<T> {
    resource: T,
    last_used: Instant,
}

/// What a caller got out of a take attempt on one stripe.
pub(crate) enum TakeOutcome<T> {
    /// An idle resource, ready to use.
    Cached(T),

    /// A permit was claimed; the caller must now run
    /// [`LocalPool::create_resource`], which settles the permit either way.
    Permit,

    /// The stripe is saturated. The caller was parked on this cell and will
    /// be handed a resource or a permit when one frees up.
    Saturated(Arc<Rendezvous<T>>),
}

impl<T> StripeState<T> {
    /// The transition applied whenever a resource or a bare permit comes
    /// back to the stripe.
    ///
    /// A saturated stripe hands the payload to its oldest live waiter,
    /// discarding cancelled ones along the way; `available` stays at zero
    /// because the payload never stops being "held". Otherwise the permit is
    /// released and a returned resource goes into the cache.
    #[cfg_attr(test, mutants::skip)] // Mutating the drain loop hangs waiter tests.
    fn signal(&mut self, mut payload: Option<T>) {
        if self.available == 0 {
            while let Some(waiter) = self.waiters.dequeue() {
                match waiter.fill(payload) {
                    Ok(()) => return,
                    // That waiter cancelled and closed its cell.
                    // Offer the payload to the next one in line.
                    Err(returned) => payload = returned,
                }
            }
        }

        self.available += 1;

        if let Some(resource) = payload {
            self.cache.push(Idle {
                resource,
                last_used: Instant::now(),
            });
        }
    }
}

impl<M> LocalPool<M>
where
    M: ResourceManager,
{
    pub(crate) fn new(index: usize, capacity: usize, manager: Arc<M>) -> Self {
        debug_assert!(capacity >= 1);

        Self {
            index,
            capacity,
            manager,
            state: Mutex::new(StripeState {
                available: capacity,
                cache: Vec::new(),
                waiters: WaiterQueue::new(),
            }),
        }
    }

    /// The stable 1-based position of this stripe within its pool.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns a resource to this stripe.
    ///
    /// If a caller is parked on the stripe, the resource is handed to the
    /// oldest one directly and that caller wakes; otherwise it is cached for
    /// reuse until it goes stale. Never fails.
    pub fn put(&self, resource: M::Resource) {
        let mut state = self.state.lock();

        debug_assert!(
            state.available < self.capacity,
            "put without a matching acquire"
        );

        state.signal(Some(resource));
    }

    /// Retires a resource, freeing its permit.
    ///
    /// The permit is released before the destructor runs, so a stuck
    /// destructor cannot starve waiters on this stripe. A parked caller
    /// receives the freed permit (not the dying resource) and creates a
    /// fresh resource for itself. Destructor failures are swallowed.
    pub fn destroy(&self, resource: M::Resource) {
        {
            let mut state = self.state.lock();

            debug_assert!(
                state.available < self.capacity,
                "destroy without a matching acquire"
            );

            state.signal(None);
        }

        self.discard(resource);
    }

    /// Takes from this stripe, parking the caller if it is saturated.
    pub(crate) fn take_or_enqueue(&self) -> TakeOutcome<M::Resource> {
        let mut state = self.state.lock();

        if let Some(entry) = state.cache.pop() {
            debug_assert!(state.available > 0, "cached entry without a permit");
            state.available -= 1;
            return TakeOutcome::Cached(entry.resource);
        }

        if state.available > 0 {
            state.available -= 1;
            return TakeOutcome::Permit;
        }

        let cell = Arc::new(Rendezvous::new());
        state.waiters.enqueue(Arc::clone(&cell));
        TakeOutcome::Saturated(cell)
    }

    /// Takes from this stripe if that is possible without waiting.
    pub(crate) fn try_take(&self) -> Option<TakeOutcome<M::Resource>> {
        let mut state = self.state.lock();

        if let Some(entry) = state.cache.pop() {
            debug_assert!(state.available > 0, "cached entry without a permit");
            state.available -= 1;
            return Some(TakeOutcome::Cached(entry.resource));
        }

        if state.available > 0 {
            state.available -= 1;
            return Some(TakeOutcome::Permit);
        }

        None
    }

    /// Creates a resource on behalf of a caller holding a permit.
    ///
    /// The permit is settled no matter how creation ends: a success hands it
    /// on embodied in the resource, while a failure (or panic) releases it
    /// back into the stripe, waking a parked caller if there is one.
    pub(crate) fn create_resource(&self) -> Result<M::Resource, M::Error> {
        let restore = scopeguard::guard((), |()| {
            self.state.lock().signal(None);
        });

        let resource = self.manager.create()?;

        scopeguard::ScopeGuard::into_inner(restore);

        Ok(resource)
    }

    /// Resolves a parked waiter that is going away.
    ///
    /// If a hand-off raced the cancellation and already deposited a payload
    /// in the cell, that payload is fed back through the signal transition so
    /// the next waiter (or the cache) receives it. Otherwise the cell is
    /// closed; the queue node stays behind and is discarded the next time a
    /// signal drains the queue.
    pub(crate) fn cancel_waiter(&self, cell: &Rendezvous<M::Resource>) {
        let mut state = self.state.lock();

        if let Some(payload) = cell.take_back() {
            state.signal(payload);
        }
    }

    /// Evicts every cache entry last used more than `idle_timeout` ago.
    ///
    /// Destructors run after the stripe mutex is released.
    pub(crate) fn evict_stale(&self, now: Instant, idle_timeout: Duration) {
        let stale = {
            let mut state = self.state.lock();

            let (stale, fresh): (Vec<_>, Vec<_>) = state
                .cache
                .drain(..)
                .partition(|entry| now.duration_since(entry.last_used) > idle_timeout);

            state.cache = fresh;
            stale
        };

        if stale.is_empty() {
            return;
        }

        trace!(
            stripe = self.index,
            evicted = stale.len(),
            "evicting stale cache entries"
        );

        for entry in stale {
            self.discard(entry.resource);
        }
    }

    /// Empties the cache and destroys every entry, regardless of age.
    ///
    /// Resources currently held by callers and parked waiters are untouched.
    pub(crate) fn sweep_cache(&self) {
        let entries = mem::take(&mut self.state.lock().cache);

        for entry in entries {
            self.discard(entry.resource);
        }
    }

    /// Runs the destructor, swallowing any failure.
    fn discard(&self, resource: M::Resource) {
        if self.manager.destroy(resource).is_err() {
            debug!(stripe = self.index, "resource destructor failed; swallowed");
        }
    }
}

#[cfg(test)]
impl<M> LocalPool<M>
where
    M: ResourceManager,
{
    pub(crate) fn available_permits(&self) -> usize {
        self.state.lock().available
    }

    pub(crate) fn cached_entries(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub(crate) fn parked_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

impl<M> Drop for LocalPool<M>
where
    M: ResourceManager,
{
    fn drop(&mut self) {
        self.sweep_cache();
    }
}

impl<M> fmt::Debug for LocalPool<M>
where
    M: ResourceManager,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct("LocalPool")
            .field("index", &self.index)
            .field("capacity", &self.capacity)
            .field("available", &state.available)
            .field("cached", &state.cache.len())
            .field("waiters", &state.waiters.len())
            .finish()
    }
}
