//! # Collision Groups
//!
//! A collision group is one bit of a 32-bit mask. Two shapes collide when
//! each one's group is set in the other's mask.
//!
//! ```text
//! bit 0   NOTHING     reserved
//! bit 1   BOUNDS      reserved, shared by the walls
//! bit 2.. allocated   one per `allocate()`, never reused while live
//! bit 31  EVERYTHING  reserved
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// First bit handed out by the allocator.
pub const FIRST_ALLOCATED_BIT: u32 = 2;

/// Last bit the allocator may hand out. Bit 31 belongs to `EVERYTHING`.
pub const LAST_ALLOCATED_BIT: u32 = 30;

/// A single-bit collision group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollisionGroup {
    mask: u32,
}

impl CollisionGroup {
    /// Matches nothing.
    pub const NOTHING: Self = Self { mask: 1 };
    /// Shared by the world bounds.
    pub const BOUNDS: Self = Self { mask: 2 };
    /// Most significant bit; disjoint from every allocated group.
    pub const EVERYTHING: Self = Self { mask: 1 << 31 };

    /// The bitmask value.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u32 {
        self.mask
    }
}

/// Hands out collision groups in strictly increasing bit order.
#[derive(Debug)]
pub struct CollisionGroupAllocator {
    next_bit: u32,
    groups: Vec<CollisionGroup>,
}

impl CollisionGroupAllocator {
    /// Creates an allocator whose first group is `4`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_bit: FIRST_ALLOCATED_BIT,
            groups: Vec::new(),
        }
    }

    /// Issues the next group.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::CollisionGroupsExhausted`] once every bit up
    /// to [`LAST_ALLOCATED_BIT`] is taken. The counter does not advance.
    pub fn allocate(&mut self) -> PhysicsResult<CollisionGroup> {
        if self.next_bit > LAST_ALLOCATED_BIT {
            return Err(PhysicsError::CollisionGroupsExhausted { bit: self.next_bit });
        }

        let group = CollisionGroup {
            mask: 1 << self.next_bit,
        };
        self.next_bit += 1;
        self.groups.push(group);
        tracing::debug!("Allocated collision group {}", group.mask);
        Ok(group)
    }

    /// Groups issued since the last reset, in allocation order.
    #[must_use]
    pub fn groups(&self) -> &[CollisionGroup] {
        &self.groups
    }

    /// Union of every issued group.
    #[must_use]
    pub fn allocated_mask(&self) -> u32 {
        self.groups.iter().fold(0, |acc, g| acc | g.mask)
    }

    /// Forgets every issued group and restarts at bit 2.
    pub fn reset(&mut self) {
        self.next_bit = FIRST_ALLOCATED_BIT;
        self.groups.clear();
    }
}

impl Default for CollisionGroupAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_three_groups() {
        let mut alloc = CollisionGroupAllocator::new();
        let masks: Vec<u32> = (0..3).map(|_| alloc.allocate().unwrap().mask()).collect();
        assert_eq!(masks, vec![4, 8, 16]);
        assert_eq!(alloc.allocated_mask(), 28);
    }

    #[test]
    fn test_exhaustion_is_explicit() {
        let mut alloc = CollisionGroupAllocator::new();
        for _ in FIRST_ALLOCATED_BIT..=LAST_ALLOCATED_BIT {
            let group = alloc.allocate().unwrap();
            assert_eq!(group.mask() & CollisionGroup::EVERYTHING.mask(), 0);
        }

        let err = alloc.allocate().unwrap_err();
        assert!(matches!(err, PhysicsError::CollisionGroupsExhausted { bit: 31 }));
        // Still exhausted, still not wrapping.
        assert!(alloc.allocate().is_err());
        assert_eq!(alloc.groups().len(), 29);
    }

    #[test]
    fn test_reset_restarts_at_four() {
        let mut alloc = CollisionGroupAllocator::new();
        alloc.allocate().unwrap();
        alloc.allocate().unwrap();
        alloc.reset();
        assert!(alloc.groups().is_empty());
        assert_eq!(alloc.allocate().unwrap().mask(), 4);
    }
}
