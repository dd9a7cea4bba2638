//! GrowableSeq: ordered sequence with explicit, observable capacity.
//!
//! `Vec` only promises `capacity() >= requested`, which makes capacity
//! policies (doubling on push, exact sizing on `set_capacity`) impossible to
//! observe or test. `GrowableSeq` keeps its own logical capacity and backs it
//! with a `Vec` reserved to at least that much.
//!
//! Elements dropped by a shrinking `set_size`/`set_capacity`/`clear` can be
//! handed to a caller-supplied destructor via the `*_with` variants;
//! otherwise they are dropped in place.

use core::ops::{Index, IndexMut};

/// Capacity of a freshly created sequence.
pub const INITIAL_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
pub struct GrowableSeq<T> {
    data: Vec<T>,
    capacity: usize,
}

impl<T> Default for GrowableSeq<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GrowableSeq<T> {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical capacity: the number of elements the sequence holds before it
    /// has to grow again.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Append `value`, returning its index.
    pub fn push(&mut self, value: T) -> usize {
        self.make_room(1);
        self.data.push(value);
        self.data.len() - 1
    }

    pub fn pop(&mut self) -> Option<T> {
        self.data.pop()
    }

    /// Remove and return the first element.
    pub fn shift(&mut self) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.remove(0))
    }

    /// Insert `value` at the front.
    pub fn unshift(&mut self, value: T) {
        self.make_room(1);
        self.data.insert(0, value);
    }

    /// Insert `value` before `index`. An index at or past the end appends.
    pub fn insert(&mut self, index: usize, value: T) {
        self.make_room(1);
        if index >= self.data.len() {
            self.data.push(value);
        } else {
            self.data.insert(index, value);
        }
    }

    /// Remove the element at `index`, shifting the tail down. Out of range is
    /// a no-op.
    pub fn erase(&mut self, index: usize) -> Option<T> {
        if index >= self.data.len() {
            return None;
        }
        Some(self.data.remove(index))
    }

    /// Drop every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Hand every element to `destroy`, front to back. Capacity is kept.
    pub fn clear_with<F>(&mut self, destroy: F)
    where
        F: FnMut(T),
    {
        self.data.drain(..).for_each(destroy);
    }

    /// Set the logical capacity to exactly `capacity`, dropping elements that
    /// no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.set_capacity_with(capacity, drop);
    }

    /// Like [`set_capacity`](Self::set_capacity), handing elements that no
    /// longer fit to `destroy`.
    pub fn set_capacity_with<F>(&mut self, capacity: usize, destroy: F)
    where
        F: FnMut(T),
    {
        if capacity < self.data.len() {
            self.data.drain(capacity..).for_each(destroy);
        }
        self.change_capacity(capacity);
    }

    /// Remove elements that equal `T::default()`, preserving the order of
    /// the rest.
    pub fn squash(&mut self)
    where
        T: Default + PartialEq,
    {
        let empty = T::default();
        self.data.retain(|v| *v != empty);
    }

    // Grow by doubling until `incoming` more elements fit.
    fn make_room(&mut self, incoming: usize) {
        let needed = self.data.len() + incoming;
        let mut capacity = self.capacity.max(1);
        while capacity < needed {
            capacity *= 2;
        }
        if capacity != self.capacity {
            self.change_capacity(capacity);
        }
    }

    fn change_capacity(&mut self, capacity: usize) {
        debug_assert!(self.data.len() <= capacity);
        if capacity > self.data.capacity() {
            self.data.reserve_exact(capacity - self.data.len());
        } else {
            self.data.shrink_to(capacity);
        }
        self.capacity = capacity;
    }
}

impl<T: Default> GrowableSeq<T> {
    /// Resize to exactly `len` elements. New slots hold `T::default()`; the
    /// capacity grows to exactly `len` when it is too small and is never
    /// reduced.
    pub fn set_size(&mut self, len: usize) {
        self.set_size_with(len, drop);
    }

    /// Like [`set_size`](Self::set_size), handing truncated elements to
    /// `destroy`.
    pub fn set_size_with<F>(&mut self, len: usize, destroy: F)
    where
        F: FnMut(T),
    {
        if len < self.data.len() {
            self.data.drain(len..).for_each(destroy);
            return;
        }
        if len > self.capacity {
            self.change_capacity(len);
        }
        self.data.resize_with(len, T::default);
    }
}

impl<T> Index<usize> for GrowableSeq<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for GrowableSeq<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<'a, T> IntoIterator for &'a GrowableSeq<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> FromIterator<T> for GrowableSeq<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = Self::new();
        for v in iter {
            seq.push(v);
        }
        seq
    }
}
