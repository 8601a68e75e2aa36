//! The background task that evicts stale cache entries.

use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::ResourceManager;
use crate::pool::PoolCore;

/// How often the reaper wakes up to scan the stripes.
///
/// Together with the 500 ms minimum idle timeout this bounds the observed
/// lifetime of an idle entry to somewhere between its timeout and its
/// timeout plus one tick.
const REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Stops the reaper thread when dropped.
///
/// The pool core owns one of these, so the thread is told to exit the moment
/// the last pool handle goes away rather than waiting out its current tick.
#[derive(Debug)]
pub(crate) struct ReaperGuard {
    shutdown: Arc<Shutdown>,
}

#[derive(Debug)]
pub(crate) struct Shutdown {
    stop: Mutex<bool>,
    wake: Condvar,
}

impl ReaperGuard {
    pub(crate) fn new() -> Self {
        Self {
            shutdown: Arc::new(Shutdown {
                stop: Mutex::new(false),
                wake: Condvar::new(),
            }),
        }
    }

    fn shutdown(&self) -> &Arc<Shutdown> {
        &self.shutdown
    }
}

impl Drop for ReaperGuard {
    fn drop(&mut self) {
        *self.shutdown.stop.lock() = true;
        self.shutdown.wake.notify_one();
    }
}

/// Spawns the reaper thread for a freshly constructed pool.
///
/// The thread only holds a weak reference to the pool core between sweeps,
/// so it never keeps a dead pool alive; it exits when the shutdown flag is
/// raised or the core is gone.
pub(crate) fn spawn<M>(core: &Arc<PoolCore<M>>)
where
    M: ResourceManager,
{
    let weak = Arc::downgrade(core);
    let shutdown = Arc::clone(core.reaper.shutdown());
    let idle_timeout = core.idle_timeout;

    thread::Builder::new()
        .name("striped_pool::reaper".to_string())
        .spawn(move || run(&weak, &shutdown, idle_timeout))
        .expect("failed to spawn the pool reaper thread");
}

fn run<M>(core: &Weak<PoolCore<M>>, shutdown: &Shutdown, idle_timeout: Duration)
where
    M: ResourceManager,
{
    loop {
        {
            let mut stop = shutdown.stop.lock();

            if *stop {
                return;
            }

            _ = shutdown.wake.wait_for(&mut stop, REAP_INTERVAL);

            if *stop {
                return;
            }
        }

        // Upgrade only for the duration of one sweep. If the last pool
        // handle disappeared while we slept, there is nothing left to do:
        // dropping the core already destroyed every cached entry.
        let Some(core) = core.upgrade() else {
            return;
        };

        let now = Instant::now();

        for stripe in &core.stripes {
            stripe.evict_stale(now, idle_timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_drop_raises_the_stop_flag() {
        let guard = ReaperGuard::new();
        let shutdown = Arc::clone(guard.shutdown());

        assert!(!*shutdown.stop.lock());

        drop(guard);

        assert!(*shutdown.stop.lock());
    }
}
