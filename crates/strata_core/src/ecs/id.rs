//! Handle encoding
//!
//! Every handle is a 64-bit word:
//!
//! ```text
//! [ 42..40: kind tag | 39..24: generation | 23..0: dense index ]
//! ```
//!
//! - Index: position in the owning table (24-bit addressable space)
//! - Generation: incremented on entity destruction (prevents
//!   use-after-free); always zero for components and systems
//! - Kind tag: one flag bit per handle kind, so a raw word can never be
//!   mistaken for a handle of another kind

use bytemuck::{Pod, Zeroable};

use crate::hash::fnv1a;
use crate::hash_index::IndexKey;

pub(crate) const INDEX_BITS: u32 = 24;
pub(crate) const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Handles address at most 2^24 table entries.
pub(crate) const MAX_INDEX_SPACE: usize = 1 << INDEX_BITS;

const GENERATION_SHIFT: u32 = 24;
const GENERATION_MASK: u64 = 0xffff << GENERATION_SHIFT;

const KIND_ENTITY: u64 = 1 << 40;
const KIND_COMPONENT: u64 = 1 << 41;
const KIND_SYSTEM: u64 = 1 << 42;
const ENCODED_MASK: u64 = KIND_ENTITY | KIND_COMPONENT | KIND_SYSTEM | GENERATION_MASK | INDEX_MASK;

/// Entity handle (generation-indexed for safety)
///
/// Example:
/// ```ignore
/// let entity = world.create_entity()?;
/// world.destroy_entity(entity)?;
/// // entity handle is now invalid (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) const fn new(index: u32, generation: u16) -> Self {
        Self(KIND_ENTITY | ((generation as u64) << GENERATION_SHIFT) | (index as u64 & INDEX_MASK))
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    #[inline]
    pub fn generation(self) -> u16 {
        ((self.0 & GENERATION_MASK) >> GENERATION_SHIFT) as u16
    }

    /// The id a recycled slot will carry next: same index, generation
    /// bumped, wrapping back to zero after 0xffff so indices stay
    /// recyclable indefinitely.
    pub(crate) fn next_generation(self) -> Self {
        Self::new(self.index() as u32, self.generation().wrapping_add(1))
    }

    /// Serialize to a raw 64-bit word.
    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    /// Deserialize from a raw word; rejects words whose kind tag is not
    /// "entity" or that carry stray bits.
    pub fn from_bits(bits: u64) -> Option<Self> {
        let tagged = bits & (ENCODED_MASK & !GENERATION_MASK & !INDEX_MASK);
        if tagged == KIND_ENTITY && bits & !ENCODED_MASK == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }
}

/// Component handle. The index doubles as the component's bit position
/// in every schema.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(KIND_COMPONENT | (index as u64 & INDEX_MASK))
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Option<Self> {
        if bits & !(KIND_COMPONENT | INDEX_MASK) == 0 && bits & KIND_COMPONENT != 0 {
            Some(Self(bits))
        } else {
            None
        }
    }
}

impl IndexKey for ComponentId {
    #[inline]
    fn index_hash(&self) -> u64 {
        fnv1a(&self.0.to_le_bytes())
    }
}

/// System handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SystemId(u64);

impl SystemId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(KIND_SYSTEM | (index as u64 & INDEX_MASK))
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Option<Self> {
        if bits & !(KIND_SYSTEM | INDEX_MASK) == 0 && bits & KIND_SYSTEM != 0 {
            Some(Self(bits))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_round_trips_through_bits() {
        let id = EntityId::new(123, 45);
        assert_eq!(id.index(), 123);
        assert_eq!(id.generation(), 45);
        assert_eq!(EntityId::from_bits(id.to_bits()), Some(id));
    }

    #[test]
    fn kind_tags_do_not_cross() {
        let component = ComponentId::new(3);
        assert_eq!(EntityId::from_bits(component.to_bits()), None);
        assert_eq!(SystemId::from_bits(component.to_bits()), None);
        assert_eq!(ComponentId::from_bits(component.to_bits()), Some(component));
    }

    #[test]
    fn generation_wraps_to_zero() {
        let id = EntityId::new(7, u16::MAX);
        let next = id.next_generation();
        assert_eq!(next.index(), 7);
        assert_eq!(next.generation(), 0);
    }

    #[test]
    fn stray_bits_are_rejected() {
        let id = EntityId::new(1, 0);
        assert_eq!(EntityId::from_bits(id.to_bits() | (1 << 50)), None);
    }
}
