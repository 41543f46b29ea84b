// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Owned contiguous collections of entities.

use std::fmt;
use std::ops::Index;

use allocator_api2::vec::Vec;

use crate::allocator::{reserve_exact, Allocator, Global};
use crate::error::Result;

/// A fixed-size, owned collection of entities.
///
/// The slot array is a single block obtained from the collection's
/// allocator, separate from whatever the elements own. An empty collection
/// holds no slot array at all, so a count of zero always means "nothing
/// allocated".
///
/// Equality compares elements only.
pub struct Collection<T, A: Allocator = Global> {
    items: Vec<T, A>,
}

impl<T, A: Allocator> Collection<T, A> {
    /// An empty collection bound to `alloc`. Allocates nothing.
    pub fn empty_in(alloc: A) -> Self {
        Self {
            items: Vec::new_in(alloc),
        }
    }

    /// Build a collection of `count` elements produced by `fill`.
    ///
    /// Reserves the slot array first (nothing when `count` is zero). If
    /// `fill` fails, the elements built so far and the slot array are
    /// dropped, returning their storage, before the error is returned.
    pub(crate) fn build(alloc: A, count: usize, mut fill: impl FnMut(usize) -> Result<T>) -> Result<Self> {
        let mut items = Vec::new_in(alloc);
        if count == 0 {
            return Ok(Self { items });
        }
        reserve_exact(&mut items, count)?;
        for index in 0..count {
            items.push(fill(index)?);
        }
        Ok(Self { items })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if a slot array is allocated.
    pub fn is_allocated(&self) -> bool {
        self.items.capacity() > 0
    }

    /// The allocator the slot array lives in.
    pub fn allocator(&self) -> &A {
        self.items.allocator()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Iterate over elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably over elements in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// View the elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Collection<T> {
    /// An empty collection on the global heap. Allocates nothing.
    pub fn empty() -> Self {
        Self::empty_in(Global)
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialEq<U>, U, A: Allocator, B: Allocator> PartialEq<Collection<U, B>> for Collection<T, A> {
    fn eq(&self, other: &Collection<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for Collection<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Collection<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T, A: Allocator> Index<usize> for Collection<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Collection<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Collection<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}
