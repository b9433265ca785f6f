//! Unbounded FIFO queue over a chain of fixed-capacity chunks
//!
//! Elements live in [`Chunk`]s linked head to tail. Producers append to the
//! tail chunk and link a fresh one when it fills; consumers read from the head
//! chunk at a running offset and release the chunk once the offset reaches its
//! capacity. One mutex guards the whole chain.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::chunk::Chunk;
use crate::common::QueueOps;
use crate::err::{Error, PutError};
use crate::DEFAULT_CHUNK_CAPACITY;

/// Chain state guarded by the queue's lock
///
/// Invariants:
/// - `head` and `tail` always point at live chunks owned by this chain.
/// - Every chunk from `head` up to (not including) `tail` is full.
/// - `read <= capacity`, and slots `read..filled` of `head` are all occupied.
struct Chain<T> {
    head: NonNull<Chunk<T>>,
    tail: NonNull<Chunk<T>>,
    /// Index in `head` of the next element to dequeue
    read: usize,
    len: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

// Safety: the chain exclusively owns every chunk reachable from `head`, so
// moving it to another thread moves the `T`s with it.
unsafe impl<T: Send> Send for Chain<T> {}

impl<T> Chain<T> {
    fn new(capacity: usize) -> Self {
        let chunk = Chunk::alloc(capacity);
        trace!(capacity, "allocated chunk");
        Self::starting_at(chunk, capacity)
    }

    fn try_new(capacity: usize) -> Result<Self, Error> {
        match Chunk::try_alloc(capacity) {
            Ok(chunk) => {
                trace!(capacity, "allocated chunk");
                Ok(Self::starting_at(chunk, capacity))
            }
            Err(source) => {
                warn!(capacity, "chunk allocation failed");
                Err(Error::Alloc { capacity, source })
            }
        }
    }

    fn starting_at(chunk: NonNull<Chunk<T>>, capacity: usize) -> Self {
        Self {
            head: chunk,
            tail: chunk,
            read: 0,
            len: 0,
            capacity,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn head(&self) -> &Chunk<T> {
        // SAFETY: `head` is live per the chain invariants and `&self` keeps it from being freed
        unsafe { self.head.as_ref() }
    }

    /// Chunks past `head` are never empty, so looking at `head` alone is enough.
    #[inline]
    fn is_empty(&self) -> bool {
        self.read >= self.head().filled()
    }

    #[inline]
    fn tail_is_full(&self) -> bool {
        // SAFETY: `tail` is live per the chain invariants
        unsafe { self.tail.as_ref() }.filled() >= self.capacity
    }

    /// Links `next` after the current tail and makes it the new tail
    fn link(&mut self, next: NonNull<Chunk<T>>) {
        // SAFETY: `tail` is live and `&mut self` gives exclusive access to the chain
        unsafe { (*self.tail.as_ptr()).next = Some(next) };
        self.tail = next;
    }

    #[inline]
    fn append(&mut self, value: T) {
        // SAFETY: `tail` is live, below capacity, and exclusively borrowed through `&mut self`
        unsafe { (*self.tail.as_ptr()).push(value) };
        self.len += 1;
    }

    fn push(&mut self, value: T) {
        if self.tail_is_full() {
            let next = Chunk::alloc(self.capacity);
            trace!(capacity = self.capacity, "allocated chunk");
            self.link(next);
        }
        self.append(value);
    }

    fn try_push(&mut self, value: T) -> Result<(), PutError<T>> {
        if self.tail_is_full() {
            match Chunk::try_alloc(self.capacity) {
                Ok(next) => {
                    trace!(capacity = self.capacity, "allocated chunk");
                    self.link(next);
                }
                Err(source) => {
                    warn!(capacity = self.capacity, "chunk allocation failed");
                    let error = Error::Alloc {
                        capacity: self.capacity,
                        source,
                    };
                    return Err(PutError::new(value, error));
                }
            }
        }
        self.append(value);
        Ok(())
    }

    fn front(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.head().get(self.read)
    }

    fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        // SAFETY: `head` is live and exclusively borrowed through `&mut self`
        let value = unsafe { (*self.head.as_ptr()).take(self.read) };
        self.read += 1;
        self.len -= 1;

        if self.read >= self.capacity {
            self.advance();
        }
        value
    }

    /// Moves past a fully consumed head chunk
    fn advance(&mut self) {
        let drained = self.head;

        // SAFETY: `drained` is live; unlinking it first leaves no path from it into the chain
        match unsafe { (*drained.as_ptr()).next.take() } {
            Some(next) => {
                self.head = next;
                // SAFETY: `drained` is no longer referenced by `head`, `tail` or any link
                unsafe { Chunk::free(drained) };
                trace!(capacity = self.capacity, "released drained chunk");
            }
            None => {
                // Only chunk left, so `head == tail`; reuse it instead of allocating.
                // SAFETY: `drained` is still the live head
                unsafe { (*drained.as_ptr()).reset() };
                trace!(capacity = self.capacity, "recycled drained chunk");
            }
        }
        self.read = 0;
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        let mut cursor = Some(self.head);
        while let Some(chunk) = cursor {
            // SAFETY: each chunk is reachable exactly once from `head` and freed exactly once
            unsafe {
                cursor = (*chunk.as_ptr()).next;
                Chunk::free(chunk);
            }
        }
    }
}

/// A thread-safe unbounded FIFO queue backed by linked fixed-size chunks
///
/// Elements are stored `chunk_capacity` at a time, so a queue of `n` elements
/// allocates roughly `n / chunk_capacity` times instead of once per element.
/// Every operation takes the same lock and runs to completion; nothing waits
/// for data, so consumers poll with [`get`](Self::get) or [`is_empty`](Self::is_empty).
///
/// ```
/// use chunked_queue::ChunkedQueue;
///
/// let q = ChunkedQueue::new();
/// q.put(1);
/// q.put(2);
///
/// assert_eq!(q.peek(), Some(1));
/// assert_eq!(q.get(), Some(1));
/// assert_eq!(q.get(), Some(2));
/// assert_eq!(q.get(), None);
/// assert!(q.is_empty());
/// ```
pub struct ChunkedQueue<T> {
    /// The chain, padded so the lock word sits on its own cache line
    chain: CachePadded<Mutex<Chain<T>>>,

    /// Slots per chunk, fixed at construction
    chunk_capacity: usize,
}

impl<T> ChunkedQueue<T> {
    /// Creates an empty queue with [`DEFAULT_CHUNK_CAPACITY`] slots per chunk
    pub fn new() -> Self {
        Self::with_chunk_capacity(DEFAULT_CHUNK_CAPACITY)
    }

    /// Creates an empty queue whose chunks hold `chunk_capacity` elements each
    ///
    /// Larger chunks allocate less often but leave more unused space in a
    /// partially filled tail chunk.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_capacity` is zero, or if the first chunk's size
    /// overflows `isize::MAX` bytes. Other allocation failures abort, as with
    /// `Vec::with_capacity`. [`try_with_chunk_capacity`](Self::try_with_chunk_capacity)
    /// reports both cases as errors instead.
    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        assert!(chunk_capacity > 0, "chunk capacity must be non-zero");

        Self {
            chain: CachePadded::new(Mutex::new(Chain::new(chunk_capacity))),
            chunk_capacity,
        }
    }

    /// Creates an empty queue like [`with_chunk_capacity`](Self::with_chunk_capacity),
    /// returning an error if the capacity is zero or the first chunk cannot be allocated
    pub fn try_with_chunk_capacity(chunk_capacity: usize) -> Result<Self, Error> {
        if chunk_capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        Ok(Self {
            chain: CachePadded::new(Mutex::new(Chain::try_new(chunk_capacity)?)),
            chunk_capacity,
        })
    }

    /// Returns the number of slots in each chunk
    #[inline]
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Appends an element at the back of the queue
    ///
    /// Never blocks on capacity. If a new chunk is needed and the allocator
    /// fails, the global allocation error handler runs, as with `Vec::push`;
    /// use [`try_put`](Self::try_put) to get the failure back instead.
    pub fn put(&self, value: T) {
        self.chain.lock().push(value);
    }

    /// Appends an element, returning it inside the error if a chunk cannot be allocated
    ///
    /// The queue is left unchanged on failure.
    pub fn try_put(&self, value: T) -> Result<(), PutError<T>> {
        self.chain.lock().try_push(value)
    }

    /// Removes and returns the element at the front of the queue
    ///
    /// Returns `None` right away if the queue is empty.
    pub fn get(&self) -> Option<T> {
        self.chain.lock().pop()
    }

    /// Returns a clone of the element at the front without removing it
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.peek_with(T::clone)
    }

    /// Calls `f` with a reference to the front element, if any
    ///
    /// `f` runs while the queue is locked and must not call back into this queue.
    pub fn peek_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.chain.lock().front().map(f)
    }

    /// Returns `true` if the queue holds no elements
    pub fn is_empty(&self) -> bool {
        self.chain.lock().is_empty()
    }

    /// Returns the number of elements in the queue
    pub fn len(&self) -> usize {
        self.chain.lock().len
    }

    /// Removes every element, leaving a single empty chunk
    ///
    /// The removed elements are dropped after the lock is released.
    pub fn clear(&self) {
        let fresh = Chain::new(self.chunk_capacity);
        let old = std::mem::replace(&mut *self.chain.lock(), fresh);
        drop(old);
    }

    /// Returns an iterator that removes elements from the front until the queue is empty
    ///
    /// Each step is a separate [`get`](Self::get), so elements put by other
    /// threads while draining are yielded too.
    pub fn drain(&self) -> Drain<'_, T> {
        Drain { queue: self }
    }

    fn extend_locked<I: IntoIterator<Item = T>>(&self, iter: I) {
        let mut chain = self.chain.lock();
        for value in iter {
            chain.push(value);
        }
    }
}

impl<T> Default for ChunkedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ChunkedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedQueue")
            .field("len", &self.len())
            .field("chunk_capacity", &self.chunk_capacity)
            .finish_non_exhaustive()
    }
}

impl<T> QueueOps<T> for ChunkedQueue<T> {
    #[inline]
    fn put(&self, element: T) {
        ChunkedQueue::put(self, element)
    }

    #[inline]
    fn get(&self) -> Option<T> {
        ChunkedQueue::get(self)
    }

    #[inline]
    fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        ChunkedQueue::peek(self)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        ChunkedQueue::is_empty(self)
    }

    #[inline]
    fn len(&self) -> usize {
        ChunkedQueue::len(self)
    }
}

/// Appends the whole batch under one lock acquisition.
///
/// The source iterator is driven while the lock is held, so it must not use this queue.
impl<T> Extend<T> for &ChunkedQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.extend_locked(iter);
    }
}

impl<T> Extend<T> for ChunkedQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.extend_locked(iter);
    }
}

impl<T> FromIterator<T> for ChunkedQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let queue = Self::new();
        queue.extend_locked(iter);
        queue
    }
}

impl<T> IntoIterator for ChunkedQueue<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter {
            chain: CachePadded::into_inner(self.chain).into_inner(),
        }
    }
}

/// Draining iterator returned by [`ChunkedQueue::drain`]
pub struct Drain<'a, T> {
    queue: &'a ChunkedQueue<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.get()
    }
}

impl<T> fmt::Debug for Drain<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain").field("queue", self.queue).finish()
    }
}

/// Owning iterator over the elements of a [`ChunkedQueue`], front to back
pub struct IntoIter<T> {
    chain: Chain<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chain.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.chain.len, Some(self.chain.len))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter")
            .field("len", &self.chain.len)
            .finish_non_exhaustive()
    }
}
