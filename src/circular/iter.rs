//! Oldest-first iteration over a [`CircularLog`](super::CircularLog)

use std::iter::FusedIterator;

use crate::entry::Entry;

/// Iterator over retained entries, oldest first
pub struct Iter<'a> {
    slots: &'a [Option<Entry>],
    start: usize,
    position: usize,
    remaining: usize,
}

impl<'a> Iter<'a> {
    pub(super) fn new(slots: &'a [Option<Entry>], start: usize, len: usize) -> Self {
        Self {
            slots,
            start,
            position: 0,
            remaining: len,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let index = (self.start + self.position) % self.slots.len();
            self.position += 1;
            self.remaining -= 1;
            if let Some(entry) = self.slots[index].as_ref() {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl FusedIterator for Iter<'_> {}
