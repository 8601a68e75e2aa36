/// Supplies the pool with the resource type it manages.
///
/// This is the only seam between the pool and user code: the pool calls
/// [`create()`][Self::create] when it needs a new resource and
/// [`destroy()`][Self::destroy] when it retires one. Everything else, such as
/// caching, striping, hand-off and eviction, is the pool's business.
///
/// # Contract
///
/// * `create` may fail. When it does, the pool restores the permit it had
///   reserved for the attempt before propagating the failure, so a string of
///   failed creations never reduces capacity.
/// * `destroy` may fail. The pool swallows those failures in every path
///   (explicit destroy, eviction, destroy-all, pool drop).
/// * The pool never destroys the same resource twice, so `destroy` does not
///   need to be idempotent.
/// * Both methods are invoked with no pool locks held. They are called
///   synchronously on the thread driving the operation, so a slow `create`
///   delays only the acquiring caller and a slow `destroy` delays only the
///   thread retiring the resource, never other users of the stripe.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use striped_pool::ResourceManager;
///
/// /// Hands out sequentially numbered tickets.
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
/// ```
pub trait ResourceManager: Send + Sync + 'static {
    /// The type of resource the pool hands out.
    type Resource: Send + 'static;

    /// The error type produced by a failed [`create()`][Self::create].
    ///
    /// Failures from [`destroy()`][Self::destroy] share this type but are
    /// never observed by callers.
    type Error;

    /// Creates a new resource.
    ///
    /// Called by the pool when a caller holds a creation permit and the
    /// stripe cache is empty. May block; no pool locks are held.
    fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Destroys a resource that is leaving the pool.
    ///
    /// Called when a resource is explicitly destroyed, evicted as stale, or
    /// swept by destroy-all. Failures are swallowed by the pool.
    fn destroy(&self, resource: Self::Resource) -> Result<(), Self::Error>;
}
