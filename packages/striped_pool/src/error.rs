use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when building a [`StripedPool`][crate::StripedPool].
///
/// All variants are construction-time validation failures. Once a pool has
/// been built, the only failures it can surface are those produced by the
/// user-supplied [`ResourceManager`][crate::ResourceManager].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured resource limit would not allow any resource to exist.
    #[error("max_resources must be at least 1, got {configured}")]
    MaxResourcesTooSmall {
        /// The rejected value.
        configured: usize,
    },

    /// The configured stripe count would not allow any stripe to exist.
    #[error("stripes must be at least 1, got {configured}")]
    StripesTooSmall {
        /// The rejected value.
        configured: usize,
    },

    /// The configured idle timeout is below the supported minimum of 500 ms.
    ///
    /// The reaper runs on a one second cadence, so timeouts shorter than this
    /// could never be honored with any useful accuracy.
    #[error("idle_timeout must be at least 500 ms, got {configured:?}")]
    IdleTimeoutTooShort {
        /// The rejected value.
        configured: Duration,
    },
}

/// A specialized `Result` type for pool construction, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn idle_timeout_message_names_the_minimum() {
        let error = Error::IdleTimeoutTooShort {
            configured: Duration::from_millis(100),
        };

        assert!(error.to_string().contains("500 ms"));
    }
}
