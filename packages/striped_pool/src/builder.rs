use std::any::type_name;
use std::fmt;
use std::time::Duration;

use many_cpus::HardwareTracker;

use crate::error::{Error, Result};
use crate::{ResourceManager, StripedPool};

/// The shortest idle timeout the pool accepts.
///
/// The reaper scans once per second, so anything shorter than this could
/// never be honored with useful accuracy.
pub(crate) const MIN_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

const DEFAULT_MAX_RESOURCES: usize = 10;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for creating an instance of [`StripedPool`].
///
/// Obtained from [`StripedPool::builder()`]; all settings have defaults, so
/// the only way [`build()`][Self::build] fails is a setting that violates
/// its documented constraint.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
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
///     .max_resources(16)
///     .stripes(4)
///     .idle_timeout(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// ```
#[must_use]
pub struct StripedPoolBuilder<M>
where
    M: ResourceManager,
{
    manager: M,
    max_resources: usize,
    stripes: Option<usize>,
    idle_timeout: Duration,
}

impl<M> StripedPoolBuilder<M>
where
    M: ResourceManager,
{
    pub(crate) fn new(manager: M) -> Self {
        Self {
            manager,
            max_resources: DEFAULT_MAX_RESOURCES,
            stripes: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Sets the hard cap on concurrently existing resources, counted across
    /// all stripes. Must be at least 1; defaults to 10.
    pub fn max_resources(mut self, max_resources: usize) -> Self {
        self.max_resources = max_resources;
        self
    }

    /// Sets the number of stripes the resources are divided over.
    ///
    /// Must be at least 1 if set; defaults to the number of active
    /// processors. Values above `max_resources` are clamped down so that
    /// every stripe owns at least one resource permit.
    pub fn stripes(mut self, stripes: usize) -> Self {
        self.stripes = Some(stripes);
        self
    }

    /// Sets how long an idle resource may sit in a stripe cache before the
    /// reaper destroys it. Must be at least 500 ms; defaults to 30 seconds.
    ///
    /// The reaper runs once per second, so an entry with timeout `t` is
    /// observed to live between `t` and `t` plus one second.
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Builds the pool, spawning its reaper.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting violates its documented constraint.
    /// Nothing is allocated and no thread is spawned in that case.
    pub fn build(self) -> Result<StripedPool<M>> {
        if self.max_resources < 1 {
            return Err(Error::MaxResourcesTooSmall {
                configured: self.max_resources,
            });
        }

        if let Some(stripes) = self.stripes
            && stripes < 1
        {
            return Err(Error::StripesTooSmall { configured: stripes });
        }

        if self.idle_timeout < MIN_IDLE_TIMEOUT {
            return Err(Error::IdleTimeoutTooShort {
                configured: self.idle_timeout,
            });
        }

        let requested_stripes = self
            .stripes
            .unwrap_or_else(HardwareTracker::active_processor_count);

        Ok(StripedPool::new_inner(
            self.manager,
            self.max_resources,
            requested_stripes,
            self.idle_timeout,
        ))
    }
}

impl<M> fmt::Debug for StripedPoolBuilder<M>
where
    M: ResourceManager,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedPoolBuilder")
            .field("manager", &format_args!("<{}>", type_name::<M>()))
            .field("max_resources", &self.max_resources)
            .field("stripes", &self.stripes)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
