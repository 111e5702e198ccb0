//! Byte ring shared between the simulated DMA engine and the reader
//!
//! The storage is split into two slices that always cover it exactly: bytes
//! the reader still has to pick up, followed by bytes the DMA engine may fill.
//! Moving data only moves the boundaries between them.

use std::ops::Range;

struct Grant {
    start: usize,
    len: usize,
}

struct RingSlice {
    start: usize,
    len: usize,
    modulus: usize,
}

impl RingSlice {
    fn pop_front(&mut self, len: usize) -> Option<Grant> {
        if len > self.len {
            return None;
        }

        let grant = Grant {
            start: self.start,
            len,
        };

        self.start = (self.start + len).checked_rem(self.modulus).unwrap_or(0);
        self.len -= len;

        Some(grant)
    }

    fn push_back(&mut self, grant: Grant) {
        debug_assert_eq!(grant.start, self.end(), "Grant did not match end of this slice");
        debug_assert!(self.len + grant.len <= self.modulus);
        self.len += grant.len;
    }

    fn end(&self) -> usize {
        (self.start + self.len).checked_rem(self.modulus).unwrap_or(0)
    }
}

pub struct RingBuffer {
    filled: RingSlice,
    free: RingSlice,
    buffer: Vec<u8>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            filled: RingSlice {
                start: 0,
                len: 0,
                modulus: capacity,
            },
            free: RingSlice {
                start: 0,
                len: capacity,
                modulus: capacity,
            },
            buffer: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes waiting for the reader
    pub fn len(&self) -> usize {
        self.filled.len
    }

    pub fn is_empty(&self) -> bool {
        self.filled.len == 0
    }

    fn is_consistent(&self) -> bool {
        self.filled.end() == self.free.start
            && self.free.end() == self.filled.start
            && self.filled.len + self.free.len == self.capacity()
    }

    /// Where a grant lies in the storage, split at the wrap-around point
    fn ranges(&self, grant: &Grant) -> (Range<usize>, Range<usize>) {
        let to_end = (self.capacity() - grant.start).min(grant.len);
        (
            grant.start..grant.start + to_end,
            0..grant.len - to_end,
        )
    }

    /// Append a whole frame
    ///
    /// Returns false and stores nothing if the frame does not fit.
    pub fn push_frame(&mut self, frame: &[u8]) -> bool {
        let Some(grant) = self.free.pop_front(frame.len()) else {
            return false;
        };

        let (head, tail) = self.ranges(&grant);
        let (first, second) = frame.split_at(head.len());
        self.buffer[head].copy_from_slice(first);
        self.buffer[tail].copy_from_slice(second);

        self.filled.push_back(grant);
        debug_assert!(self.is_consistent());
        true
    }

    /// Move as many bytes as fit in `out`, in whole units of `align` bytes
    pub fn pop_into(&mut self, out: &mut [u8], align: usize) -> usize {
        let len = out.len().min(self.filled.len);
        let len = len - len % align.max(1);
        let Some(grant) = self.filled.pop_front(len) else {
            return 0;
        };

        let (head, tail) = self.ranges(&grant);
        let (first, second) = out[..len].split_at_mut(head.len());
        first.copy_from_slice(&self.buffer[head]);
        second.copy_from_slice(&self.buffer[tail]);

        self.free.push_back(grant);
        debug_assert!(self.is_consistent());
        len
    }

    pub fn clear(&mut self) {
        if let Some(grant) = self.filled.pop_front(self.filled.len) {
            self.free.push_back(grant);
        }
        debug_assert!(self.is_consistent());
    }
}
