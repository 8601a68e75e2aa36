//! The single-shot hand-off cell between a releasing caller and a parked
//! waiter.
//!
//! A cell is created per parked waiter and delivers exactly one payload:
//! `Some(resource)` when a returned resource is handed over directly, or
//! `None` when the waiter is granted a permit to create a resource itself.
//!
//! The cell is deliberately a mutex-guarded slot rather than a lock-free
//! state machine. Every operation is a short critical section with no
//! suspension point inside, and the filling side runs while the stripe mutex
//! is already held, so contention on the cell lock is negligible.

use std::fmt;
use std::mem;
use std::task::{Poll, Waker};

use parking_lot::Mutex;

/// Coordinates delivery of at most one payload from a releaser to a waiter.
///
/// Filling is non-blocking and reports failure if the waiter has cancelled;
/// reading is poll-based. The waiter side resolves cancellation through
/// [`take_back()`][Rendezvous::take_back], which either recovers an
/// already-delivered payload or closes the cell so that any later fill
/// attempt fails fast.
pub(crate) struct Rendezvous<T> {
    slot: Mutex<Slot<T>>,
}

enum Slot<T> {
    /// Nothing delivered yet. Holds the waker of the most recent poll, if
    /// the waiter has started polling.
    Empty { waker: Option<Waker> },

    /// A payload was delivered and has not been picked up yet.
    Full(Option<T>),

    /// The waiter picked up the payload. Terminal.
    Taken,

    /// The waiter cancelled before a payload arrived. Terminal; fills fail.
    Closed,
}

impl<T> Rendezvous<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty { waker: None }),
        }
    }

    /// Attempts to deliver a payload, waking the waiter if it is parked.
    ///
    /// Returns the payload back via `Err` if the waiter has already
    /// cancelled, so the caller can offer it to the next waiter in line.
    ///
    /// A cell is only ever filled once: the signal protocol removes the
    /// waiter from the queue before filling, so no second filler can see it.
    pub(crate) fn fill(&self, payload: Option<T>) -> Result<(), Option<T>> {
        let mut slot = self.slot.lock();

        match &mut *slot {
            Slot::Empty { waker } => {
                let waker = waker.take();
                *slot = Slot::Full(payload);
                drop(slot);

                if let Some(waker) = waker {
                    waker.wake();
                }

                Ok(())
            }
            Slot::Closed => Err(payload),
            Slot::Full(_) | Slot::Taken => {
                unreachable!("rendezvous cell filled twice");
            }
        }
    }

    /// Attempts to pick up the payload, registering `waker` for a wake-up
    /// if nothing has been delivered yet.
    ///
    /// # Panics
    ///
    /// Panics if called again after the payload has been picked up.
    pub(crate) fn poll_take(&self, waker: &Waker) -> Poll<Option<T>> {
        let mut slot = self.slot.lock();

        match &mut *slot {
            Slot::Empty { waker: stored } => {
                // Re-polls may arrive with a different waker; the most
                // recent one always wins.
                *stored = Some(waker.clone());
                Poll::Pending
            }
            Slot::Full(_) => {
                let Slot::Full(payload) = mem::replace(&mut *slot, Slot::Taken) else {
                    unreachable!();
                };

                Poll::Ready(payload)
            }
            Slot::Taken => {
                panic!("rendezvous cell polled after completion");
            }
            Slot::Closed => {
                unreachable!("rendezvous cell polled after cancellation");
            }
        }
    }

    /// Resolves the cell from the cancelling waiter's side.
    ///
    /// If a payload had already been delivered, it is extracted and returned
    /// so the caller can re-dispatch it; the hand-off raced the cancellation
    /// and the payload must not be lost. Otherwise the cell is closed and
    /// `None` is returned; the queue entry is left behind for the signal
    /// drain loop to discard.
    pub(crate) fn take_back(&self) -> Option<Option<T>> {
        let mut slot = self.slot.lock();

        match &mut *slot {
            Slot::Full(_) => {
                let Slot::Full(payload) = mem::replace(&mut *slot, Slot::Taken) else {
                    unreachable!();
                };

                Some(payload)
            }
            Slot::Empty { .. } => {
                *slot = Slot::Closed;
                None
            }
            Slot::Taken | Slot::Closed => None,
        }
    }
}

impl<T> fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.lock() {
            Slot::Empty { waker } => {
                if waker.is_some() {
                    "awaiting"
                } else {
                    "empty"
                }
            }
            Slot::Full(_) => "full",
            Slot::Taken => "taken",
            Slot::Closed => "closed",
        };

        f.debug_struct("Rendezvous").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Rendezvous<u32>: Send, Sync);

    /// Counts how many times it has been woken.
    struct CountingWaker {
        wakes: AtomicUsize,
    }

    impl CountingWaker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                wakes: AtomicUsize::new(0),
            })
        }

        fn wake_count(&self) -> usize {
            self.wakes.load(Ordering::SeqCst)
        }
    }

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.wakes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fill_then_poll_is_ready() {
        let cell = Rendezvous::new();

        assert!(cell.fill(Some(42)).is_ok());
        assert_eq!(cell.poll_take(Waker::noop()), Poll::Ready(Some(42)));
    }

    #[test]
    fn permit_payload_passes_through() {
        let cell = Rendezvous::<u32>::new();

        assert!(cell.fill(None).is_ok());
        assert_eq!(cell.poll_take(Waker::noop()), Poll::Ready(None));
    }

    #[test]
    fn poll_before_fill_is_pending_and_gets_woken() {
        let cell = Rendezvous::new();
        let counting = CountingWaker::new();
        let waker = Waker::from(Arc::clone(&counting));

        assert_eq!(cell.poll_take(&waker), Poll::Pending);
        assert_eq!(counting.wake_count(), 0);

        assert!(cell.fill(Some(7)).is_ok());
        assert_eq!(counting.wake_count(), 1);

        assert_eq!(cell.poll_take(&waker), Poll::Ready(Some(7)));
    }

    #[test]
    fn repoll_replaces_the_waker() {
        let cell = Rendezvous::<u32>::new();
        let stale = CountingWaker::new();
        let fresh = CountingWaker::new();

        assert_eq!(
            cell.poll_take(&Waker::from(Arc::clone(&stale))),
            Poll::Pending
        );
        assert_eq!(
            cell.poll_take(&Waker::from(Arc::clone(&fresh))),
            Poll::Pending
        );

        assert!(cell.fill(None).is_ok());

        assert_eq!(stale.wake_count(), 0);
        assert_eq!(fresh.wake_count(), 1);
    }

    #[test]
    fn fill_after_close_returns_the_payload() {
        let cell = Rendezvous::new();

        assert_eq!(cell.take_back(), None);

        let rejected = cell.fill(Some(42));
        assert_eq!(rejected, Err(Some(42)));
    }

    #[test]
    fn take_back_recovers_a_delivered_payload() {
        let cell = Rendezvous::new();

        assert!(cell.fill(Some(42)).is_ok());
        assert_eq!(cell.take_back(), Some(Some(42)));

        // A second resolution finds nothing left.
        assert_eq!(cell.take_back(), None);
    }

    #[test]
    #[should_panic]
    fn panic_on_poll_after_completion() {
        let cell = Rendezvous::new();

        assert!(cell.fill(Some(1)).is_ok());
        assert_eq!(cell.poll_take(Waker::noop()), Poll::Ready(Some(1)));

        // Should panic - the payload is gone.
        _ = cell.poll_take(Waker::noop());
    }
}
