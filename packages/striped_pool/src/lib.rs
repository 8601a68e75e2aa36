//! A striped pool of expensive, reusable resources.
//!
//! This package provides [`StripedPool`], a bounded pool for resources with a
//! nontrivial construction cost: database connections, sockets, file handles
//! or anything else worth reusing. Callers borrow a resource, use it, and
//! give it back; the pool takes care of everything in between.
//!
//! # Features
//!
//! - **Bounded capacity**: at most `max_resources` resources exist at once,
//!   across all callers.
//! - **Striped locking**: capacity is divided over independently locked
//!   shards selected by processor affinity, so unrelated callers rarely
//!   touch the same mutex.
//! - **Idle caching with eviction**: returned resources are cached for reuse
//!   and destroyed by a background reaper once they sit idle past their
//!   timeout.
//! - **Fair hand-off**: when a stripe is saturated, callers wait in FIFO
//!   order and a returned resource goes directly to the oldest waiter,
//!   skipping the cache.
//! - **Cancellation safe**: dropping an in-flight [`acquire()`][StripedPool::acquire]
//!   future never loses a resource, never leaks a permit and never strands
//!   another waiter.
//! - **Runtime agnostic**: the acquire future works under any executor, and
//!   the reaper is a plain thread owned by the pool.
//!
//! The user side of the seam is the [`ResourceManager`] trait: the pool
//! calls its `create` when it needs a new resource and its `destroy` when it
//! retires one.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! use striped_pool::{ResourceManager, StripedPool};
//!
//! /// Stands in for something expensive, like a connection factory.
//! struct TicketManager {
//!     next: AtomicU32,
//! }
//!
//! impl ResourceManager for TicketManager {
//!     type Resource = u32;
//!     type Error = std::convert::Infallible;
//!
//!     fn create(&self) -> Result<u32, Self::Error> {
//!         Ok(self.next.fetch_add(1, Ordering::Relaxed))
//!     }
//!
//!     fn destroy(&self, _ticket: u32) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! let pool = StripedPool::builder(TicketManager {
//!     next: AtomicU32::new(0),
//! })
//! .max_resources(4)
//! .stripes(1)
//! .idle_timeout(Duration::from_secs(30))
//! .build()
//! .unwrap();
//!
//! // Borrow a resource; the stripe it came from takes it back.
//! let (ticket, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
//! stripe.put(ticket);
//!
//! // An idle resource is reused instead of creating another one.
//! let (reused, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
//! assert_eq!(reused, ticket);
//!
//! // Resources that are no longer fit for use are retired instead.
//! stripe.destroy(reused);
//! ```
//!
//! # Waiting and cancellation
//!
//! Awaiting [`acquire()`][StripedPool::acquire] is the only operation that
//! can suspend; everything else completes after at most a few short mutex
//! sections. A caller that no longer wants the resource simply drops the
//! future: if a hand-off raced the drop, the handed-over resource is passed
//! to the next waiter or cached, so nothing is lost.
//!
//! Timeouts are deliberately not built in. Wrap the future in your
//! executor's timeout combinator if you need one; cancellation is well
//! defined, as above.

mod acquire;
mod builder;
mod error;
mod local_pool;
mod manager;
mod pool;
mod reaper;
mod rendezvous;
mod selector;
mod striping;
mod waiter_queue;

pub use acquire::Acquire;
pub use builder::StripedPoolBuilder;
pub use error::Error;
pub use local_pool::LocalPool;
pub use manager::ResourceManager;
pub use pool::StripedPool;
