//! Common interface for FIFO queues
//!
//! Drivers written against [`QueueOps`] work with any queue in this crate,
//! and with wrappers such as `Arc<Q>`.

use std::sync::Arc;

/// Trait for FIFO queue operations
///
/// All methods take `&self`; implementations provide their own synchronization.
pub trait QueueOps<T> {
    /// Appends an element at the back of the queue
    fn put(&self, element: T);

    /// Removes the element at the front of the queue
    ///
    /// Returns `None` immediately if the queue is empty.
    fn get(&self) -> Option<T>;

    /// Returns a copy of the element at the front without removing it
    fn peek(&self) -> Option<T>
    where
        T: Clone;

    /// Checks if the queue holds no elements
    fn is_empty(&self) -> bool;

    /// Returns the number of elements in the queue
    fn len(&self) -> usize;
}

impl<T, Q: QueueOps<T> + ?Sized> QueueOps<T> for Arc<Q> {
    #[inline]
    fn put(&self, element: T) {
        (**self).put(element)
    }

    #[inline]
    fn get(&self) -> Option<T> {
        (**self).get()
    }

    #[inline]
    fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        (**self).peek()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }
}
