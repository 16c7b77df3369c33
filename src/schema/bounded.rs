use serde::Serialize;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

/// Returned when a bounded container is already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity of {capacity} exceeded")]
pub struct CapacityExceeded {
    pub capacity: usize,
}

/// An ordered sequence that never holds more than `N` items.
///
/// Dereferences to a slice, so indexing and iteration work as usual;
/// the length only changes through [`Bounded::try_push`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bounded<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> Bounded<T, N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append `item`, or hand back an error if the sequence is full.
    pub fn try_push(&mut self, item: T) -> Result<(), CapacityExceeded> {
        if self.items.len() >= N {
            return Err(CapacityExceeded { capacity: N });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= N
    }

    /// Collect from an iterator, keeping the first `N` items.
    /// Returns the sequence and how many items were dropped.
    pub fn truncating<I: IntoIterator<Item = T>>(iter: I) -> (Self, usize) {
        let mut bounded = Self::new();
        let mut dropped = 0;
        for item in iter {
            if bounded.try_push(item).is_err() {
                dropped += 1;
            }
        }
        (bounded, dropped)
    }
}

impl<T, const N: usize> Default for Bounded<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for Bounded<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T, const N: usize> DerefMut for Bounded<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a Bounded<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for Bounded<T, N> {
    type Error = CapacityExceeded;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        if items.len() > N {
            return Err(CapacityExceeded { capacity: N });
        }
        Ok(Self { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_until_full() {
        let mut slots: Bounded<u8, 2> = Bounded::new();
        assert!(slots.try_push(1).is_ok());
        assert!(slots.try_push(2).is_ok());
        assert!(slots.is_full());
        assert_eq!(slots.try_push(3), Err(CapacityExceeded { capacity: 2 }));
        assert_eq!(&*slots, &[1, 2]);
    }

    #[test]
    fn truncating_counts_dropped() {
        let (slots, dropped) = Bounded::<&str, 4>::truncating(["a", "b", "c", "d", "e", "f"]);
        assert_eq!(slots.len(), 4);
        assert_eq!(dropped, 2);
        assert_eq!(slots[3], "d");
    }

    #[test]
    fn try_from_vec_respects_capacity() {
        assert!(Bounded::<u8, 4>::try_from(vec![1, 2, 3]).is_ok());
        assert!(Bounded::<u8, 4>::try_from(vec![1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn empty_by_default() {
        let slots: Bounded<String, 4> = Bounded::default();
        assert!(slots.is_empty());
        assert_eq!(Bounded::<String, 4>::CAPACITY, 4);
    }
}
