//! Distribution of the pool-wide resource limit across stripes.

/// Computes the per-stripe capacities for a pool.
///
/// The requested stripe count is clamped to `max_resources` so that every
/// stripe owns at least one permit. The limit is then divided round-robin:
/// the first `max_resources % stripes` stripes receive one extra permit.
/// The order is deterministic and the capacities always sum to
/// `max_resources`.
pub(crate) fn stripe_capacities(max_resources: usize, requested_stripes: usize) -> Vec<usize> {
    debug_assert!(max_resources >= 1);
    debug_assert!(requested_stripes >= 1);

    let stripes = requested_stripes.min(max_resources);

    let base = max_resources / stripes;
    let remainder = max_resources % stripes;

    (0..stripes)
        .map(|index| if index < remainder { base + 1 } else { base })
        .collect()
}
