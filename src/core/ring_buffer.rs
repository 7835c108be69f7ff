//! Lock-Free Single-Producer Single-Consumer (SPSC) Sample Ring Buffer
//!
//! Two cursors, one owned by each side. The writer publishes its cursor with
//! `Release` after storing the slot, the reader loads it with `Acquire` before
//! touching the slot, and vice versa. No Mutex, no allocation after
//! construction, no CAS.
//!
//! One slot is always left unused so that `read == write` can mean "empty"
//! without a separate counter: a `RingBuffer<T, N>` holds at most `N - 1`
//! elements.
//!
//! # Overfeeding
//!
//! [`RingBuffer::feed`] never checks for space. Feeding more than `N - 1`
//! elements ahead of the reader silently overwrites the oldest unread data and
//! makes [`RingBuffer::num_buffered`] wrap. Producers that cannot bound their
//! rate must use [`RingBuffer::try_feed`] or check `num_buffered()` first.

use crossbeam::atomic::AtomicCell;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-Free SPSC Ring Buffer
///
/// Cursors live on separate cache lines so the producer and consumer do not
/// false-share. Slots are [`AtomicCell`]s: for word-sized `T` every slot access
/// is a single atomic, and a caller that breaks the capacity contract reads
/// stale values instead of racing.
pub struct RingBuffer<T, const N: usize> {
    // Consumer side: index of the last slot read
    read_pos: CachePadded<AtomicUsize>,
    // Producer side: index of the last slot written
    write_pos: CachePadded<AtomicUsize>,
    buffer: [AtomicCell<T>; N],
}

/// Ring buffer of `f32` samples, the common case for audio callbacks.
pub type SampleRingBuffer<const N: usize> = RingBuffer<f32, N>;

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    /// Number of slots, including the one that is never filled.
    pub const LENGTH: usize = N;

    /// Creates an empty ring buffer with both cursors at zero.
    ///
    /// The backing store is inline; wrap the buffer in a `Box` or `Arc` for
    /// large `N` to keep it off the stack.
    ///
    /// # Panics
    /// Panics if `N < 2`.
    pub fn new() -> Self {
        assert!(N >= 2, "N must be at least 2");

        Self {
            read_pos: CachePadded::new(AtomicUsize::new(0)),
            write_pos: CachePadded::new(AtomicUsize::new(0)),
            buffer: std::array::from_fn(|_| AtomicCell::new(T::default())),
        }
    }

    /// Whether slot access for `T` compiles to plain atomics.
    ///
    /// When this is `false` (e.g. for large structs) crossbeam falls back to a
    /// striped seqlock, which is still non-blocking for the reader in practice
    /// but no longer strictly lock-free.
    #[inline(always)]
    pub fn is_lock_free() -> bool {
        AtomicCell::<T>::is_lock_free()
    }

    #[inline(always)]
    const fn next(pos: usize) -> usize {
        if pos == N - 1 {
            0
        } else {
            pos + 1
        }
    }

    /// Reads one element (Consumer side).
    ///
    /// Returns `None` if the buffer is empty. Never blocks.
    #[inline(always)]
    pub fn read(&self) -> Option<T> {
        let r = self.read_pos.load(Ordering::Relaxed);
        if r == self.write_pos.load(Ordering::Acquire) {
            return None;
        }

        let r = Self::next(r);
        let value = self.buffer[r].load();

        // The slot has been copied out; hand it back to the writer
        self.read_pos.store(r, Ordering::Release);

        Some(value)
    }

    /// Reads one element into `out` (Consumer side).
    ///
    /// Returns `false` and leaves `out` untouched if the buffer is empty.
    #[inline(always)]
    pub fn read_into(&self, out: &mut T) -> bool {
        match self.read() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Drains up to `out.len()` elements into `out` (Consumer side).
    ///
    /// Returns how many were written; the rest of `out` is left untouched.
    pub fn read_slice(&self, out: &mut [T]) -> usize {
        let mut r = self.read_pos.load(Ordering::Relaxed);
        let w = self.write_pos.load(Ordering::Acquire);

        let mut count = 0;
        while count < out.len() && r != w {
            r = Self::next(r);
            out[count] = self.buffer[r].load();
            count += 1;
        }

        if count > 0 {
            self.read_pos.store(r, Ordering::Release);
        }
        count
    }

    /// Stores one element (Producer side).
    ///
    /// Always returns `true`. There is no space check: feeding more than
    /// `N - 1` elements ahead of the reader overwrites unread data. Use
    /// [`try_feed`](Self::try_feed) when the producer cannot guarantee that.
    #[inline(always)]
    pub fn feed(&self, value: T) -> bool {
        let w = Self::next(self.write_pos.load(Ordering::Relaxed));
        self.buffer[w].store(value);

        // Publish the slot to the reader
        self.write_pos.store(w, Ordering::Release);

        true
    }

    /// Stores one element if there is room (Producer side).
    ///
    /// Returns `false` without touching the buffer when `N - 1` elements are
    /// still unread.
    #[inline(always)]
    pub fn try_feed(&self, value: T) -> bool {
        let w = Self::next(self.write_pos.load(Ordering::Relaxed));

        // Acquire: the reader must be done with this slot before we reuse it
        if w == self.read_pos.load(Ordering::Acquire) {
            return false;
        }

        self.buffer[w].store(value);
        self.write_pos.store(w, Ordering::Release);

        true
    }

    /// Stores as many of `values` as fit (Producer side).
    ///
    /// Returns how many were stored, in order from the front of `values`.
    pub fn feed_slice(&self, values: &[T]) -> usize {
        let mut w = self.write_pos.load(Ordering::Relaxed);
        let r = self.read_pos.load(Ordering::Acquire);

        let mut count = 0;
        for &value in values {
            let next = Self::next(w);
            if next == r {
                break;
            }
            self.buffer[next].store(value);
            w = next;
            count += 1;
        }

        if count > 0 {
            self.write_pos.store(w, Ordering::Release);
        }
        count
    }

    /// Discards `count` elements without copying them out (Consumer side).
    ///
    /// Not bounds-checked: skipping past [`num_buffered`](Self::num_buffered)
    /// moves the reader into unwritten slots and later reads return stale
    /// data.
    #[inline(always)]
    pub fn skip(&self, count: usize) {
        let r = self.read_pos.load(Ordering::Relaxed);
        self.read_pos.store((r + count % N) % N, Ordering::Release);
    }

    /// Drops every unread element by moving the write cursor back onto the
    /// read cursor (Producer side).
    pub fn sync_write_pos(&self) {
        let w = self.write_pos.load(Ordering::Relaxed);
        let r = self.read_pos.load(Ordering::Acquire);
        self.write_pos.store(r, Ordering::Release);

        let discarded = if w >= r { w - r } else { w + N - r };

        tracing::trace!(discarded, "ring buffer write position synced");
    }

    /// Number of elements written but not yet read, in `[0, N - 1]`.
    #[inline(always)]
    pub fn num_buffered(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        if w >= r {
            w - r
        } else {
            w + N - r
        }
    }

    /// True when the reader has caught up with the writer.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.read_pos.load(Ordering::Acquire) == self.write_pos.load(Ordering::Acquire)
    }

    /// Usable capacity, `N - 1`.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Resets both cursors to the empty state.
    ///
    /// Must not run while the other side is inside `read`/`feed`: call it with
    /// both parties quiesced or under the same lock that pauses them.
    pub fn clear(&self) {
        self.write_pos.store(0, Ordering::Release);
        self.read_pos.store(0, Ordering::Release);

        tracing::debug!(length = N, "ring buffer cleared");
    }
}
