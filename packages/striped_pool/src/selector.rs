//! Maps the calling thread to a stripe.

use std::fmt;
use std::hash::BuildHasher;
use std::thread;

use many_cpus::HardwareTracker;

/// Picks a stripe for the current caller.
///
/// The selection is advisory only: it spreads unrelated callers across
/// stripes to keep mutex contention low, but nothing pins a caller to the
/// stripe it was given and correctness never depends on the choice.
///
/// Selection is by the identity of the processor currently executing the
/// caller, except when the stripe count does not divide the processor count
/// evenly; a modulo mapping would then systematically overload the low
/// stripes, so we hash the thread identity instead.
pub(crate) struct StripeSelector {
    stripes: usize,
    by_thread_identity: bool,
    thread_hasher: foldhash::fast::RandomState,
}

impl StripeSelector {
    pub(crate) fn new(stripes: usize) -> Self {
        Self::with_processor_count(stripes, HardwareTracker::active_processor_count())
    }

    pub(crate) fn with_processor_count(stripes: usize, processors: usize) -> Self {
        debug_assert!(stripes >= 1);

        Self {
            stripes,
            by_thread_identity: stripes < processors && !processors.is_multiple_of(stripes),
            thread_hasher: foldhash::fast::RandomState::default(),
        }
    }

    /// Returns the index of the stripe the caller should use, in
    /// `0..stripes`.
    pub(crate) fn select(&self) -> usize {
        if self.stripes == 1 {
            return 0;
        }

        if self.by_thread_identity {
            let hash = self.thread_hasher.hash_one(thread::current().id());

            // The hash is uniform across all 64 bits; truncation is fine.
            #[expect(clippy::cast_possible_truncation, reason = "modulo keeps it in range")]
            return hash as usize % self.stripes;
        }

        HardwareTracker::current_processor_id() as usize % self.stripes
    }
}

impl fmt::Debug for StripeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeSelector")
            .field("stripes", &self.stripes)
            .field("by_thread_identity", &self.by_thread_identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn single_stripe_needs_no_lookup() {
        let selector = StripeSelector::with_processor_count(1, 8);

        assert_eq!(selector.select(), 0);
    }

    #[test]
    fn uneven_processor_mapping_hashes_the_thread() {
        // 8 processors onto 3 stripes does not divide evenly, so selection
        // must be stable per thread rather than follow the processor.
        let selector = StripeSelector::with_processor_count(3, 8);
        assert!(selector.by_thread_identity);

        let first = selector.select();
        let second = selector.select();

        assert!(first < 3);
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_threads_can_hash_to_distinct_stripes() {
        // Not guaranteed for any two threads, but across many threads at
        // least two different stripes must show up for a uniform hash.
        let selector = StripeSelector::with_processor_count(4, 42);

        let mut seen = [false; 4];

        thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|_| s.spawn(|| selector.select()))
                .collect();

            for handle in handles {
                seen[handle.join().unwrap()] = true;
            }
        });

        assert!(seen.iter().filter(|&&hit| hit).count() >= 2);
    }

    #[cfg_attr(miri, ignore)] // Miri does not support talking to the real platform.
    #[test]
    fn processor_mapping_stays_in_range() {
        let selector = StripeSelector::with_processor_count(2, 8);
        assert!(!selector.by_thread_identity);

        for _ in 0..16 {
            assert!(selector.select() < 2);
        }
    }

    #[cfg_attr(miri, ignore)] // Miri does not support talking to the real platform.
    #[test]
    fn real_smoke_test() {
        let selector = StripeSelector::new(2);

        assert!(selector.select() < 2);
    }
}
