// pool.rs - Fixed-slot block pool
//
// Chunked slab allocator for small bookkeeping records (hash-index chain
// nodes). Live slots never move: chunks are individually boxed and are
// appended, never reallocated, so a handed-out `Slot` stays valid until
// it is freed.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    SlotOutOfBounds { slot: u32, high_water: usize },
    SlotNotAllocated { slot: u32 },
    AllocationFailed,
}

/// Handle to a pool slot. Encodes chunk and in-chunk position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Slot(u32);

impl Slot {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-slot slab with O(1) allocate and free.
///
/// Freed slots are kept on an index stack and handed back before the
/// high-water mark advances; when every slot of every chunk is taken a
/// new chunk is appended. `reset` empties the pool without releasing
/// any chunk.
pub struct BlockPool<T> {
    chunks: Vec<Box<[Option<T>]>>,
    free: Vec<u32>,
    shift: u32,
    mask: usize,
    chunk_len: usize,
    high_water: usize,
    len: usize,
}

impl<T> BlockPool<T> {
    /// Create a pool whose chunks each hold `chunk_len` slots.
    /// `chunk_len` must be a non-zero power of two.
    pub fn new(chunk_len: usize) -> Self {
        assert!(chunk_len.is_power_of_two() && chunk_len > 0);
        Self {
            chunks: Vec::new(),
            free: Vec::new(),
            shift: chunk_len.trailing_zeros(),
            mask: chunk_len - 1,
            chunk_len,
            high_water: 0,
            len: 0,
        }
    }

    #[inline]
    fn chunk_of(&self, slot: u32) -> usize {
        slot as usize >> self.shift
    }

    #[inline]
    fn local_of(&self, slot: u32) -> usize {
        slot as usize & self.mask
    }

    /// Number of live slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate a slot and move `value` into it.
    pub fn alloc(&mut self, value: T) -> Result<Slot, PoolError> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                if self.high_water == self.chunks.len() * self.chunk_len {
                    self.grow_one_chunk()?;
                }
                let slot = self.high_water as u32;
                self.high_water += 1;
                slot
            }
        };

        let (chunk, local) = (self.chunk_of(slot), self.local_of(slot));
        debug_assert!(self.chunks[chunk][local].is_none());
        self.chunks[chunk][local] = Some(value);
        self.len += 1;
        Ok(Slot(slot))
    }

    /// Free a slot, returning its value.
    ///
    /// Freeing a slot that is not currently allocated (double free, or a
    /// handle that was never handed out) is a checked error.
    pub fn free(&mut self, slot: Slot) -> Result<T, PoolError> {
        if slot.0 as usize >= self.high_water {
            return Err(PoolError::SlotOutOfBounds {
                slot: slot.0,
                high_water: self.high_water,
            });
        }
        let (chunk, local) = (self.chunk_of(slot.0), self.local_of(slot.0));
        let value = self.chunks[chunk][local]
            .take()
            .ok_or(PoolError::SlotNotAllocated { slot: slot.0 })?;
        self.free.push(slot.0);
        self.len -= 1;
        Ok(value)
    }

    pub fn get(&self, slot: Slot) -> Result<&T, PoolError> {
        if slot.0 as usize >= self.high_water {
            return Err(PoolError::SlotOutOfBounds {
                slot: slot.0,
                high_water: self.high_water,
            });
        }
        let (chunk, local) = (self.chunk_of(slot.0), self.local_of(slot.0));
        self.chunks[chunk][local]
            .as_ref()
            .ok_or(PoolError::SlotNotAllocated { slot: slot.0 })
    }

    pub fn get_mut(&mut self, slot: Slot) -> Result<&mut T, PoolError> {
        if slot.0 as usize >= self.high_water {
            return Err(PoolError::SlotOutOfBounds {
                slot: slot.0,
                high_water: self.high_water,
            });
        }
        let (chunk, local) = (self.chunk_of(slot.0), self.local_of(slot.0));
        self.chunks[chunk][local]
            .as_mut()
            .ok_or(PoolError::SlotNotAllocated { slot: slot.0 })
    }

    /// Empty the pool without releasing chunk memory.
    pub fn reset(&mut self) {
        for chunk in &mut self.chunks {
            for entry in chunk.iter_mut() {
                *entry = None;
            }
        }
        self.free.clear();
        self.high_water = 0;
        self.len = 0;
    }

    fn grow_one_chunk(&mut self) -> Result<(), PoolError> {
        let mut chunk: Vec<Option<T>> = Vec::new();
        chunk
            .try_reserve_exact(self.chunk_len)
            .map_err(|_| PoolError::AllocationFailed)?;
        chunk.resize_with(self.chunk_len, || None);
        self.chunks.push(chunk.into_boxed_slice());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_read_back() {
        let mut pool = BlockPool::new(4);
        let a = pool.alloc(10u32).unwrap();
        let b = pool.alloc(20u32).unwrap();
        assert_eq!(*pool.get(a).unwrap(), 10);
        assert_eq!(*pool.get(b).unwrap(), 20);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn free_recycles_most_recent_slot() {
        let mut pool = BlockPool::new(4);
        let a = pool.alloc(1u32).unwrap();
        let _b = pool.alloc(2u32).unwrap();
        assert_eq!(pool.free(a).unwrap(), 1);
        let c = pool.alloc(3u32).unwrap();
        // The freed slot is reused before the high-water mark advances.
        assert_eq!(c, a);
        assert_eq!(*pool.get(c).unwrap(), 3);
    }

    #[test]
    fn double_free_is_an_error() {
        let mut pool = BlockPool::new(4);
        let a = pool.alloc(7u32).unwrap();
        pool.free(a).unwrap();
        assert_eq!(
            pool.free(a),
            Err(PoolError::SlotNotAllocated { slot: a.raw() })
        );
    }

    #[test]
    fn foreign_slot_is_an_error() {
        let mut pool: BlockPool<u32> = BlockPool::new(4);
        pool.alloc(1).unwrap();
        assert!(matches!(
            pool.get(Slot(99)),
            Err(PoolError::SlotOutOfBounds { .. })
        ));
    }

    #[test]
    fn grows_past_one_chunk_without_moving_slots() {
        let mut pool = BlockPool::new(4);
        let slots: Vec<Slot> = (0..9u32).map(|i| pool.alloc(i).unwrap()).collect();
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(*pool.get(*slot).unwrap(), i as u32);
        }
        assert_eq!(pool.len(), 9);
    }

    #[test]
    fn reset_keeps_capacity_and_empties() {
        let mut pool = BlockPool::new(4);
        let a = pool.alloc(1u32).unwrap();
        pool.alloc(2u32).unwrap();
        pool.reset();
        assert!(pool.is_empty());
        assert!(matches!(
            pool.get(a),
            Err(PoolError::SlotOutOfBounds { .. })
        ));
        // Slots are handed out from the start again.
        let b = pool.alloc(3u32).unwrap();
        assert_eq!(b.raw(), 0);
    }
}
