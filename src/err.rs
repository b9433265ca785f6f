//! Error types for chunked queues

use std::collections::TryReserveError;
use std::error;
use std::fmt;

/// Failures the queue itself can report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A queue was configured with zero slots per chunk
    #[error("chunk capacity must be non-zero")]
    ZeroCapacity,
    /// The allocator could not provide a new chunk
    #[error("failed to allocate a chunk of {capacity} slots")]
    Alloc {
        /// Slot count of the chunk that was being allocated
        capacity: usize,
        /// Underlying reservation failure
        #[source]
        source: TryReserveError,
    },
}

/// Error returned by [`try_put`](crate::ChunkedQueue::try_put).
///
/// Carries the value that could not be enqueued so the caller keeps ownership of it.
#[derive(Clone, PartialEq, Eq)]
pub struct PutError<T> {
    value: T,
    error: Error,
}

impl<T> PutError<T> {
    pub(crate) fn new(value: T, error: Error) -> Self {
        Self { value, error }
    }

    /// Returns the cause of the failure
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Takes back the value that was not enqueued
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutError")
            .field("value", &format_args!(".."))
            .field("error", &self.error)
            .finish()
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "putting into a chunked queue failed".fmt(f)
    }
}

impl<T> error::Error for PutError<T> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserve_failure() -> TryReserveError {
        Vec::<u64>::new()
            .try_reserve_exact(usize::MAX)
            .unwrap_err()
    }

    #[test]
    fn test_alloc_error_display() {
        let err = Error::Alloc {
            capacity: 128,
            source: reserve_failure(),
        };
        assert_eq!(err.to_string(), "failed to allocate a chunk of 128 slots");
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn test_put_error_hands_value_back() {
        struct NotDebug(u32);

        let err = PutError::new(
            NotDebug(7),
            Error::Alloc {
                capacity: 4,
                source: reserve_failure(),
            },
        );
        assert!(format!("{:?}", err).starts_with("PutError { value: .."));
        assert_eq!(err.to_string(), "putting into a chunked queue failed");
        assert!(matches!(err.error(), Error::Alloc { capacity: 4, .. }));

        let source = error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "failed to allocate a chunk of 4 slots");
        assert_eq!(err.into_inner().0, 7);
    }
}
