//! # Generational Arena
//!
//! Index-stable storage for kernel objects and wrapper bodies.
//!
//! A handle consists of:
//! - An index into the slot array
//! - A generation counter for detecting stale references
//!
//! A handle whose slot was freed (and possibly reused) resolves to nothing,
//! so a queued operation can never reach the wrong object.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed handle into an [`Arena`].
///
/// Packed like an entity id:
/// - Lower 32 bits: slot index
/// - Upper 32 bits: generation counter
pub struct Handle<T> {
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Creates a handle from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: ((generation as u64) << 32) | (index as u64),
            _marker: PhantomData,
        }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.bits as u32
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Raw packed representation, stable for the handle's lifetime.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.bits
    }
}

// Manual impls: derives would put bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bits.cmp(&other.bits)
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index(), self.generation())
    }
}

impl<T> Serialize for Handle<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits)
    }
}

impl<'de, T> Deserialize<'de> for Handle<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u64::deserialize(deserializer)?;
        Ok(Self {
            bits,
            _marker: PhantomData,
        })
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Growable slot storage handing out generational handles.
///
/// Freed slots are recycled with a bumped generation. Unlike a fixed pool
/// the arena grows on demand; physics worlds rarely know their body count
/// up front.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Number of live values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the arena holds no live values.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a value and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots would be needed.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).expect("arena exceeded u32::MAX slots");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    /// Removes a value, freeing its slot for reuse.
    ///
    /// Returns `None` if the handle is stale or already removed.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }

        let value = slot.value.take()?;
        self.free_list.push(handle.index());
        self.len -= 1;
        Some(value)
    }

    /// Checks if the handle refers to a live value.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to a live value.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a live value.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Drops every value. Generations survive so old handles stay stale.
    #[allow(clippy::cast_possible_truncation)]
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            slot.value = None;
            self.free_list.push(index as u32);
        }
        self.len = 0;
    }

    /// Iterates over all live values in slot order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let handle = Handle::new(index as u32, slot.generation);
            slot.value.as_ref().map(|v| (handle, v))
        })
    }

    /// Iterates mutably over all live values in slot order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let handle = Handle::new(index as u32, slot.generation);
            slot.value.as_mut().map(|v| (handle, v))
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let handle: Handle<()> = Handle::new(12345, 67890);
        assert_eq!(handle.index(), 12345);
        assert_eq!(handle.generation(), 67890);
    }

    #[test]
    fn test_insert_remove() {
        let mut arena = Arena::new();

        let h1 = arena.insert(42);
        assert_eq!(arena.get(h1), Some(&42));
        assert_eq!(arena.len(), 1);

        assert_eq!(arena.remove(h1), Some(42));
        assert!(arena.is_empty());
        assert_eq!(arena.remove(h1), None);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut arena = Arena::new();

        let h1 = arena.insert("first");
        arena.remove(h1);

        let h2 = arena.insert("second");
        assert_eq!(h1.index(), h2.index()); // Same slot
        assert_ne!(h1.generation(), h2.generation());
        assert!(arena.get(h1).is_none());
        assert_eq!(arena.get(h2), Some(&"second"));
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut arena = Arena::new();
        let h1 = arena.insert(1);
        let _ = arena.insert(2);

        arena.clear();
        assert!(arena.is_empty());
        assert!(!arena.contains(h1));

        let h3 = arena.insert(3);
        assert_ne!(h1, h3);
        assert_eq!(arena.iter().count(), 1);
    }
}
