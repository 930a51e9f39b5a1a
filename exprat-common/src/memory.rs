//! General purpose data structures
//!
//! [`Stack`](struct.Stack.html) is a thin `std::vec::Vec` wrapper with
//! optional bounds checking. On top of the plain stack operations it
//! offers order-preserving insertion and removal, which lets the same type
//! double as a sorted set of `Copy` values.

use crate::config;
use std::{
    ops::{Index, IndexMut, Range},
    slice,
};

/// Check if an offset is contained in a half-open range.
/// # Panics
/// Panics if bounds checking is enabled and the index is out of the given bounds.
pub fn assert_in_bounds(bounds: Range<usize>, offset: usize) {
    if config::ENABLE_BOUNDS_CHECKING {
        assert!(
            offset >= bounds.start && offset < bounds.end,
            "array index out of bounds: {} (range is {:?})",
            offset,
            bounds,
        );
    }
}

/// A contiguous growable array type like [`std::vec::Vec`](https://doc.rust-lang.org/std/vec/struct.Vec.html)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack<T> {
    vec: Vec<T>,
}

impl<T> Stack<T> {
    pub fn new() -> Stack<T> {
        Stack { vec: Vec::new() }
    }
    pub fn with_capacity(capacity: usize) -> Stack<T> {
        Stack {
            vec: Vec::with_capacity(capacity),
        }
    }
    pub fn from_vec(vec: Vec<T>) -> Stack<T> {
        Stack { vec }
    }
    pub fn len(&self) -> usize {
        self.vec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.vec.capacity()
    }
    pub fn push(&mut self, value: T) {
        self.vec.push(value)
    }
    /// # Panics
    /// Panics if the stack is empty.
    pub fn pop(&mut self) -> T {
        requires!(!self.is_empty());
        self.vec.pop().unwrap()
    }
    pub fn clear(&mut self) {
        self.vec.clear()
    }
    pub fn iter(&self) -> slice::Iter<T> {
        self.vec.iter()
    }
    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.vec
    }
}

impl<T: Copy + Ord> Stack<T> {
    /// Insert a value before the first element that is not less than it,
    /// keeping an ascending stack ascending.
    pub fn insert_sorted(&mut self, value: T) {
        let offset = self.lower_bound(value);
        self.vec.insert(offset, value);
    }
    /// Remove and return the element at this offset, preserving the order
    /// of the remaining elements.
    pub fn remove(&mut self, offset: usize) -> T {
        assert_in_bounds(0..self.len(), offset);
        self.vec.remove(offset)
    }
    /// Find some element equal to this value by linear search.
    pub fn position(&self, value: T) -> Option<usize> {
        self.iter().position(|&element| element == value)
    }
    /// Find some element equal to this value by binary search.
    ///
    /// Requires the stack to be sorted in ascending order.
    pub fn binary_search_position(&self, value: T) -> Option<usize> {
        let mut low = 0;
        let mut high = self.len();
        while low < high {
            // Avoids overflow for offsets beyond half the address space.
            let middle = low + (high - low) / 2;
            if self[middle] == value {
                return Some(middle);
            }
            if self[middle] < value {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        None
    }
    pub fn contains(&self, value: T) -> bool {
        self.position(value).is_some()
    }
    /// Like `contains`, requires the stack to be sorted.
    pub fn binary_contains(&self, value: T) -> bool {
        self.binary_search_position(value).is_some()
    }
    /// The offset of the first element that is not less than the value.
    fn lower_bound(&self, value: T) -> usize {
        let mut low = 0;
        let mut high = self.len();
        while low < high {
            let middle = low + (high - low) / 2;
            if self[middle] < value {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        low
    }
}

/// Similar to [`vec!`](https://doc.rust-lang.org/std/macro.vec.html) ---
/// construct a new stack with the given elements.
#[allow(unused_macros)]
macro_rules! stack {
    ($($x:expr),*) => (
        {
            #[allow(unused_mut)]
            let mut result = Stack::new();
            $(
                result.push($x);
            )*
            result
        }
    );
    ($($x:expr,)*) => (stack!($($x),*))
}

impl<T> Index<usize> for Stack<T> {
    type Output = T;
    fn index(&self, offset: usize) -> &T {
        assert_in_bounds(0..self.len(), offset);
        &self.vec[offset]
    }
}

impl<T> IndexMut<usize> for Stack<T> {
    fn index_mut(&mut self, offset: usize) -> &mut T {
        assert_in_bounds(0..self.len(), offset);
        &mut self.vec[offset]
    }
}

impl<'a, T> IntoIterator for &'a Stack<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> slice::Iter<'a, T> {
        self.vec.iter()
    }
}
