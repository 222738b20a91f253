//! Fixed-capacity byte ring buffer.
//!
//! [`RingBuffer`] decouples bytes produced in interrupt context from bytes consumed by the
//! cooperative task functions. It keeps two free-running cursors: `write` is only advanced by
//! the producer, `read` only by the consumer. The number of unread bytes is
//! `(write - read) mod N` and the buffer is empty when both cursors are equal.
//!
//! ## Overrun
//!
//! `push` never blocks and never refuses a byte. When the producer gets `N` bytes ahead of the
//! consumer the oldest unread data is overwritten and the queue reads as empty again. That
//! loss cannot be repaired, but it is detected: every push that lands the write cursor on the
//! read cursor increments [`RingBuffer::overruns`]. Producers that can check for room first
//! (the frame encoder, the AT command stager) use [`RingBuffer::free`] and never overrun.
//!
//! `N` must be a power of two so the wrap is a mask; this is checked at compile time.

use core::iter::FusedIterator;

/// A single-producer/single-consumer byte queue of capacity `N - 1`.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    read: usize,
    write: usize,
    overruns: u16,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = {
        assert!(N >= 2 && N.is_power_of_two(), "ring buffer size must be a power of two");
        N - 1
    };

    /// Creates an empty buffer.
    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            buf: [0; N],
            read: 0,
            write: 0,
            overruns: 0,
        }
    }

    /// Appends one byte at the write cursor.
    pub fn push(&mut self, byte: u8) {
        self.buf[self.write] = byte;
        self.write = (self.write + 1) & Self::MASK;
        if self.write == self.read {
            self.overruns = self.overruns.saturating_add(1);
        }
    }

    /// Appends every byte of `bytes`.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.write.wrapping_sub(self.read) & Self::MASK
    }

    /// `true` when the read cursor has caught up with the write cursor.
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Largest number of bytes the buffer can hold without overrunning.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Bytes that can still be pushed without overrunning.
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Returns the oldest unread byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buf[self.read])
        }
    }

    /// Consumes the oldest unread byte.
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.read = (self.read + 1) & Self::MASK;
        Some(byte)
    }

    /// Consumes up to `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) {
        let n = n.min(self.len());
        self.read = (self.read + n) & Self::MASK;
    }

    /// Discards every unread byte (consumer side).
    pub fn clear(&mut self) {
        self.read = self.write;
    }

    /// Current read cursor.
    pub fn read_index(&self) -> usize {
        self.read
    }

    /// Current write cursor.
    ///
    /// Task functions snapshot it before draining so bytes arriving mid-pass are left for the
    /// next call.
    pub fn write_index(&self) -> usize {
        self.write
    }

    /// Number of pushes that overwrote unread data.
    pub fn overruns(&self) -> u16 {
        self.overruns
    }

    /// Iterates over the unread bytes, oldest first, without consuming them.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            ring: self,
            pos: self.read,
            left: self.len(),
        }
    }
}

/// Borrowing iterator over the unread bytes of a [`RingBuffer`].
#[derive(Debug, Clone)]
pub struct Iter<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
    pos: usize,
    left: usize,
}

impl<const N: usize> Iterator for Iter<'_, N> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.left == 0 {
            return None;
        }
        let byte = self.ring.buf[self.pos];
        self.pos = (self.pos + 1) & RingBuffer::<N>::MASK;
        self.left -= 1;
        Some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.left, Some(self.left))
    }
}

impl<const N: usize> ExactSizeIterator for Iter<'_, N> {}

impl<const N: usize> FusedIterator for Iter<'_, N> {}
