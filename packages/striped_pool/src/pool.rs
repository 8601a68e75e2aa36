use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::local_pool::TakeOutcome;
use crate::reaper::{self, ReaperGuard};
use crate::selector::StripeSelector;
use crate::striping::stripe_capacities;
use crate::{Acquire, LocalPool, ResourceManager, StripedPoolBuilder};

/// A striped pool of reusable resources.
///
/// The pool caps how many resources exist at once, caches idle resources for
/// reuse, evicts them in the background once they go stale, and parks
/// callers fairly when everything is in use.
///
/// Capacity is divided over independently locked stripes so that unrelated
/// callers rarely contend on the same mutex; a caller is bound to one stripe
/// for the duration of a borrow and returns the resource to that stripe.
///
/// The handle is cheap to clone and all clones refer to the same pool. When
/// the last clone is dropped, the reaper is stopped and every cached
/// resource is destroyed. Resources still held by callers at that point are
/// the callers' to destroy.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use striped_pool::{ResourceManager, StripedPool};
///
/// struct TicketManager {
///     next: AtomicU32,
/// }
///
/// impl ResourceManager for TicketManager {
///     type Resource = u32;
///     type Error = std::convert::Infallible;
///
///     fn create(&self) -> Result<u32, Self::Error> {
///         Ok(self.next.fetch_add(1, Ordering::Relaxed))
///     }
///
///     fn destroy(&self, _ticket: u32) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
///
/// let pool = StripedPool::builder(TicketManager {
///     next: AtomicU32::new(0),
/// })
/// .max_resources(2)
/// .stripes(1)
/// .build()
/// .unwrap();
///
/// let (ticket, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
///
/// // Returned resources are cached and handed out again.
/// stripe.put(ticket);
/// let (reused, _stripe) = spin_on::spin_on(pool.acquire()).unwrap();
/// assert_eq!(reused, ticket);
/// ```
pub struct StripedPool<M>
where
    M: ResourceManager,
{
    pub(crate) core: Arc<PoolCore<M>>,
}

/// State shared by every clone of a pool handle and by its reaper.
pub(crate) struct PoolCore<M>
where
    M: ResourceManager,
{
    pub(crate) stripes: Box<[LocalPool<M>]>,
    pub(crate) selector: StripeSelector,
    pub(crate) idle_timeout: Duration,
    pub(crate) reaper: ReaperGuard,
}

impl<M> StripedPool<M>
where
    M: ResourceManager,
{
    /// Starts building a pool around the given resource manager.
    ///
    /// # Example
    ///
    /// ```
    /// use striped_pool::{ResourceManager, StripedPool};
    /// # struct Nothing;
    /// # impl ResourceManager for Nothing {
    /// #     type Resource = ();
    /// #     type Error = std::convert::Infallible;
    /// #     fn create(&self) -> Result<(), Self::Error> { Ok(()) }
    /// #     fn destroy(&self, _: ()) -> Result<(), Self::Error> { Ok(()) }
    /// # }
    ///
    /// let pool = StripedPool::builder(Nothing).max_resources(8).build().unwrap();
    /// ```
    pub fn builder(manager: M) -> StripedPoolBuilder<M> {
        StripedPoolBuilder::new(manager)
    }

    pub(crate) fn new_inner(
        manager: M,
        max_resources: usize,
        requested_stripes: usize,
        idle_timeout: Duration,
    ) -> Self {
        let capacities = stripe_capacities(max_resources, requested_stripes);
        let manager = Arc::new(manager);

        let stripes: Box<[LocalPool<M>]> = capacities
            .iter()
            .enumerate()
            .map(|(index, &capacity)| LocalPool::new(index + 1, capacity, Arc::clone(&manager)))
            .collect();

        let selector = StripeSelector::new(stripes.len());

        let core = Arc::new(PoolCore {
            stripes,
            selector,
            idle_timeout,
            reaper: ReaperGuard::new(),
        });

        reaper::spawn(&core);

        Self { core }
    }

    /// Borrows a resource from the pool.
    ///
    /// The caller is bound to one stripe; an idle resource from that
    /// stripe's cache is handed out first, then a fresh one is created if
    /// the stripe has a permit left, and otherwise the caller waits its turn
    /// behind earlier waiters. The resource must later go back to the
    /// returned stripe through [`LocalPool::put()`] or
    /// [`LocalPool::destroy()`].
    ///
    /// Awaiting is the only point at which this can suspend. Dropping the
    /// returned future is always safe, including while parked; see
    /// [`Acquire`].
    ///
    /// # Errors
    ///
    /// Propagates the failure if the resource manager's `create` fails. The
    /// permit reserved for the attempt is restored first, so capacity is
    /// unaffected.
    ///
    /// # Example
    ///
    /// ```
    /// use striped_pool::{ResourceManager, StripedPool};
    /// # struct Nothing;
    /// # impl ResourceManager for Nothing {
    /// #     type Resource = ();
    /// #     type Error = std::convert::Infallible;
    /// #     fn create(&self) -> Result<(), Self::Error> { Ok(()) }
    /// #     fn destroy(&self, _: ()) -> Result<(), Self::Error> { Ok(()) }
    /// # }
    ///
    /// let pool = StripedPool::builder(Nothing).build().unwrap();
    ///
    /// let (resource, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
    /// stripe.put(resource);
    /// ```
    pub fn acquire(&self) -> Acquire<'_, M> {
        Acquire::new(self)
    }

    /// Borrows a resource if that is possible without waiting.
    ///
    /// Behaves like [`acquire()`][Self::acquire] except that a saturated
    /// stripe yields `Ok(None)` instead of parking the caller.
    ///
    /// # Errors
    ///
    /// Propagates the failure if the resource manager's `create` fails, with
    /// the permit restored as for `acquire()`.
    ///
    /// # Example
    ///
    /// ```
    /// use striped_pool::{ResourceManager, StripedPool};
    /// # struct Nothing;
    /// # impl ResourceManager for Nothing {
    /// #     type Resource = ();
    /// #     type Error = std::convert::Infallible;
    /// #     fn create(&self) -> Result<(), Self::Error> { Ok(()) }
    /// #     fn destroy(&self, _: ()) -> Result<(), Self::Error> { Ok(()) }
    /// # }
    ///
    /// let pool = StripedPool::builder(Nothing)
    ///     .max_resources(1)
    ///     .build()
    ///     .unwrap();
    ///
    /// let (held, stripe) = pool.try_acquire().unwrap().unwrap();
    ///
    /// // The only resource is out, so a second attempt comes back empty.
    /// assert!(pool.try_acquire().unwrap().is_none());
    ///
    /// stripe.put(held);
    /// ```
    pub fn try_acquire(&self) -> Result<Option<(M::Resource, &LocalPool<M>)>, M::Error> {
        let stripe = &self.core.stripes[self.core.selector.select()];

        match stripe.try_take() {
            Some(TakeOutcome::Cached(resource)) => Ok(Some((resource, stripe))),
            Some(TakeOutcome::Permit) => stripe
                .create_resource()
                .map(|resource| Some((resource, stripe))),
            Some(TakeOutcome::Saturated(_)) => {
                unreachable!("try_take never parks the caller");
            }
            None => Ok(None),
        }
    }

    /// Destroys every idle resource currently cached in the pool.
    ///
    /// Resources held by callers and parked waiters are untouched, so this
    /// does not reclaim capacity; it only flushes the caches. Calling it
    /// again immediately is a no-op. Never fails; destructor failures are
    /// swallowed.
    ///
    /// # Example
    ///
    /// ```
    /// use striped_pool::{ResourceManager, StripedPool};
    /// # struct Nothing;
    /// # impl ResourceManager for Nothing {
    /// #     type Resource = ();
    /// #     type Error = std::convert::Infallible;
    /// #     fn create(&self) -> Result<(), Self::Error> { Ok(()) }
    /// #     fn destroy(&self, _: ()) -> Result<(), Self::Error> { Ok(()) }
    /// # }
    ///
    /// let pool = StripedPool::builder(Nothing).build().unwrap();
    ///
    /// let (resource, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
    /// stripe.put(resource);
    ///
    /// pool.destroy_all();
    /// ```
    pub fn destroy_all(&self) {
        for stripe in &self.core.stripes {
            stripe.sweep_cache();
        }
    }
}

impl<M> Clone for StripedPool<M>
where
    M: ResourceManager,
{
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<M> fmt::Debug for StripedPool<M>
where
    M: ResourceManager,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedPool")
            .field("stripes", &self.core.stripes)
            .field("idle_timeout", &self.core.idle_timeout)
            .finish()
    }
}
