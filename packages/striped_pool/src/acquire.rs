use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::local_pool::TakeOutcome;
use crate::rendezvous::Rendezvous;
use crate::{LocalPool, ResourceManager, StripedPool};

/// The future returned by [`StripedPool::acquire()`].
///
/// Resolves to a resource paired with the stripe it must be returned to.
/// The first poll binds the caller to a stripe and either completes
/// immediately (cached resource, or a permit that is turned into a fresh
/// resource) or parks the caller on that stripe's waiter queue.
///
/// Dropping the future while parked is the supported way to abandon an
/// acquisition: a resource or permit that was handed over concurrently is
/// passed on to the next waiter (or cached) rather than lost.
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<'a, M>
where
    M: ResourceManager,
{
    pool: &'a StripedPool<M>,
    stage: Stage<M::Resource>,
}

enum Stage<T> {
    /// Not yet bound to a stripe.
    Initial,

    /// Parked on the waiter queue of stripe `stripe` (0-based).
    Waiting {
        stripe: usize,
        cell: Arc<Rendezvous<T>>,
    },

    /// Completed; polling again is a caller bug.
    Done,
}

impl<'a, M> Acquire<'a, M>
where
    M: ResourceManager,
{
    pub(crate) fn new(pool: &'a StripedPool<M>) -> Self {
        Self {
            pool,
            stage: Stage::Initial,
        }
    }
}

impl<'a, M> Future for Acquire<'a, M>
where
    M: ResourceManager,
{
    type Output = Result<(M::Resource, &'a LocalPool<M>), M::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match mem::replace(&mut this.stage, Stage::Done) {
                Stage::Initial => {
                    let index = this.pool.core.selector.select();
                    let stripe = &this.pool.core.stripes[index];

                    match stripe.take_or_enqueue() {
                        TakeOutcome::Cached(resource) => {
                            return Poll::Ready(Ok((resource, stripe)));
                        }
                        TakeOutcome::Permit => {
                            return Poll::Ready(
                                stripe.create_resource().map(|resource| (resource, stripe)),
                            );
                        }
                        TakeOutcome::Saturated(cell) => {
                            this.stage = Stage::Waiting {
                                stripe: index,
                                cell,
                            };
                            // Loop to poll the cell immediately: a release
                            // may already have filled it between enqueueing
                            // and getting here.
                        }
                    }
                }
                Stage::Waiting { stripe: index, cell } => match cell.poll_take(cx.waker()) {
                    Poll::Pending => {
                        this.stage = Stage::Waiting {
                            stripe: index,
                            cell,
                        };
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(resource)) => {
                        // Direct hand-off from the previous holder; the
                        // permit travelled with the resource.
                        let stripe = &this.pool.core.stripes[index];
                        return Poll::Ready(Ok((resource, stripe)));
                    }
                    Poll::Ready(None) => {
                        // Granted a permit instead of a resource; creation
                        // settles it either way.
                        let stripe = &this.pool.core.stripes[index];
                        return Poll::Ready(
                            stripe.create_resource().map(|resource| (resource, stripe)),
                        );
                    }
                },
                Stage::Done => {
                    panic!("Acquire polled after completion");
                }
            }
        }
    }
}

impl<M> Drop for Acquire<'_, M>
where
    M: ResourceManager,
{
    fn drop(&mut self) {
        if let Stage::Waiting { stripe, cell } = &self.stage {
            self.pool.core.stripes[*stripe].cancel_waiter(cell);
        }
    }
}

impl<M> fmt::Debug for Acquire<'_, M>
where
    M: ResourceManager,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match &self.stage {
            Stage::Initial => "initial",
            Stage::Waiting { .. } => "waiting",
            Stage::Done => "done",
        };

        f.debug_struct("Acquire").field("stage", &stage).finish()
    }
}
