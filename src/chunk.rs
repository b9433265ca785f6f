//! Fixed-capacity storage blocks that make up a chunked queue
//!
//! A chunk is a run of element slots filled strictly from index 0 upwards,
//! plus a link to the chunk that was allocated after it. Consumed slots are
//! set back to `None` so a slowly drained chunk does not keep values alive.

use std::collections::TryReserveError;
use std::ptr::NonNull;

/// One block in the queue's chain
pub(crate) struct Chunk<T> {
    /// Occupied slots; `slots.len()` is the fill count
    slots: Vec<Option<T>>,
    /// Next chunk in insertion order, owned by the queue
    pub(crate) next: Option<NonNull<Chunk<T>>>,
}

impl<T> Chunk<T> {
    /// Allocates an empty chunk with room for `capacity` slots
    ///
    /// Allocation failure goes to the global handler, like `Vec::with_capacity`.
    pub(crate) fn alloc(capacity: usize) -> NonNull<Self> {
        Self::into_raw(Vec::with_capacity(capacity))
    }

    /// Allocates an empty chunk, reporting allocation failure to the caller
    pub(crate) fn try_alloc(capacity: usize) -> Result<NonNull<Self>, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        Ok(Self::into_raw(slots))
    }

    fn into_raw(slots: Vec<Option<T>>) -> NonNull<Self> {
        let chunk = Box::new(Self { slots, next: None });
        // SAFETY: `Box::into_raw` never returns null
        unsafe { NonNull::new_unchecked(Box::into_raw(chunk)) }
    }

    /// Reclaims a chunk produced by [`alloc`](Self::alloc) or [`try_alloc`](Self::try_alloc)
    ///
    /// # Safety
    ///
    /// `chunk` must come from this module's allocators, must not be freed
    /// already, and no other reference to it may be used afterwards.
    pub(crate) unsafe fn free(chunk: NonNull<Self>) {
        drop(Box::from_raw(chunk.as_ptr()));
    }

    /// Number of slots written so far, consumed or not
    #[inline]
    pub(crate) fn filled(&self) -> usize {
        self.slots.len()
    }

    /// Appends a value at the next free slot
    ///
    /// The caller makes sure the chunk is below its capacity, so this never reallocates.
    #[inline]
    pub(crate) fn push(&mut self, value: T) {
        debug_assert!(self.slots.len() < self.slots.capacity());
        self.slots.push(Some(value));
    }

    /// Moves the value out of `index`, leaving the slot cleared
    #[inline]
    pub(crate) fn take(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Borrows the value at `index` if it is still present
    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Drops every slot, keeping the allocation for reuse
    #[inline]
    pub(crate) fn reset(&mut self) {
        self.slots.clear();
    }
}
