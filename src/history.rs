//! ==============================================================================
//! history.rs - fixed-capacity circular reading buffer
//! ==============================================================================
//!
//! one of these per sensor. the slot vector is allocated once at creation and
//! never resized; writing moves the cursor forward one slot (wrapping) and
//! overwrites whatever was there.
//!
//! ```text
//! capacity 4, 6 writes (a..f):
//!
//!    slot:   0   1   2   3
//!          [ e | f | c | d ]
//!                ^cursor      oldest = cursor + 1 = c
//!
//! history() -> c, d, e, f
//! ```
//!
//! ==============================================================================

use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    slots: Vec<f64>,
    /// most recently written slot, None until the first write
    cursor: Option<usize>,
    /// number of slots holding a real reading (<= capacity)
    filled: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: vec![0.0; capacity.get()],
            cursor: None,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// number of readings retained
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn push(&mut self, value: f64) {
        let next = match self.cursor {
            None => 0,
            Some(c) => (c + 1) % self.slots.len(),
        };
        self.slots[next] = value;
        self.cursor = Some(next);
        if self.filled < self.slots.len() {
            self.filled += 1;
        }
    }

    /// most recent reading
    pub fn current(&self) -> Option<f64> {
        self.cursor.map(|c| self.slots[c])
    }

    /// the written slots in storage order, indexed like `cursor`
    pub fn slots(&self) -> &[f64] {
        &self.slots[..self.filled]
    }

    /// readings oldest -> newest
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buffer: self,
            offset: 0,
        }
    }

    /// reading `offset` places after the oldest one
    fn at(&self, offset: usize) -> Option<f64> {
        let cursor = self.cursor?;
        if offset >= self.filled {
            return None;
        }
        // before the first wrap this resolves to slot 0
        let capacity = self.slots.len();
        let oldest = (cursor + 1 + capacity - self.filled) % capacity;
        Some(self.slots[(oldest + offset) % capacity])
    }
}

/// Borrowing oldest -> newest iterator.
pub struct Iter<'a> {
    buffer: &'a HistoryBuffer,
    offset: usize,
}

impl Iterator for Iter<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.buffer.at(self.offset)?;
        self.offset += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.filled.saturating_sub(self.offset);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Owning oldest -> newest iterator over a copy of a buffer.
pub struct IntoIter {
    buffer: HistoryBuffer,
    offset: usize,
}

impl Iterator for IntoIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.buffer.at(self.offset)?;
        self.offset += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.filled.saturating_sub(self.offset);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IntoIter {}

impl IntoIterator for HistoryBuffer {
    type Item = f64;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            buffer: self,
            offset: 0,
        }
    }
}

impl<'a> IntoIterator for &'a HistoryBuffer {
    type Item = f64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
