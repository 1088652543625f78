// column.rs - Growable type-erased column
//
// Densely packed array of fixed-size elements over a 16-byte-aligned
// byte buffer. Component sizes are only known at runtime, so the column
// works in raw bytes; `bytemuck` casts expose typed slices when the
// caller knows the element type.

use bytemuck::Pod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    RowOutOfBounds { row: usize, len: usize },
    SizeMismatch { expected: usize, actual: usize },
    Misaligned,
    AllocationFailed,
}

/// Backing storage is a `Vec<u128>` so the base pointer is 16-byte
/// aligned, which keeps typed views valid for any `Pod` component with
/// natural alignment up to 16.
const BYTES_PER_WORD: usize = std::mem::size_of::<u128>();

pub struct ByteColumn {
    buf: Vec<u128>,
    elem_size: usize,
    len: usize,
}

impl ByteColumn {
    pub fn new(elem_size: usize) -> Self {
        assert!(elem_size > 0);
        Self {
            buf: Vec::new(),
            elem_size,
            len: 0,
        }
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All live element bytes, densely packed.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.buf)[..self.len * self.elem_size]
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.buf)[..self.len * self.elem_size]
    }

    /// Append one element, copying its bytes in.
    pub fn push(&mut self, value: &[u8]) -> Result<(), ColumnError> {
        if value.len() != self.elem_size {
            return Err(ColumnError::SizeMismatch {
                expected: self.elem_size,
                actual: value.len(),
            });
        }
        let row = self.push_zeroed()?;
        self.row_mut(row).copy_from_slice(value);
        Ok(())
    }

    /// Append one element without meaningful contents. The row reads as
    /// zero until it is overwritten.
    pub fn push_zeroed(&mut self) -> Result<usize, ColumnError> {
        self.ensure_capacity(self.len + 1)?;
        let row = self.len;
        self.len += 1;
        self.row_mut(row).fill(0);
        Ok(row)
    }

    /// Drop the last element.
    pub fn pop(&mut self) -> Result<(), ColumnError> {
        if self.len == 0 {
            return Err(ColumnError::RowOutOfBounds { row: 0, len: 0 });
        }
        self.len -= 1;
        Ok(())
    }

    /// Remove `row` by overwriting it with the last element and
    /// shrinking by one. O(1), order-unstable.
    pub fn swap_remove(&mut self, row: usize) -> Result<(), ColumnError> {
        if row >= self.len {
            return Err(ColumnError::RowOutOfBounds { row, len: self.len });
        }
        let last = self.len - 1;
        if row != last {
            let size = self.elem_size;
            self.bytes_mut().copy_within(last * size..(last + 1) * size, row * size);
        }
        self.len -= 1;
        Ok(())
    }

    pub fn get(&self, row: usize) -> Result<&[u8], ColumnError> {
        if row >= self.len {
            return Err(ColumnError::RowOutOfBounds { row, len: self.len });
        }
        Ok(&self.bytes()[row * self.elem_size..(row + 1) * self.elem_size])
    }

    pub fn get_mut(&mut self, row: usize) -> Result<&mut [u8], ColumnError> {
        if row >= self.len {
            return Err(ColumnError::RowOutOfBounds { row, len: self.len });
        }
        Ok(self.row_mut(row))
    }

    pub fn back(&self) -> Option<&[u8]> {
        if self.len == 0 {
            return None;
        }
        Some(&self.bytes()[(self.len - 1) * self.elem_size..self.len * self.elem_size])
    }

    /// Typed view of the whole column. `T` must match the element size
    /// exactly; alignment is re-checked by the cast.
    pub fn as_slice<T: Pod>(&self) -> Result<&[T], ColumnError> {
        if std::mem::size_of::<T>() != self.elem_size {
            return Err(ColumnError::SizeMismatch {
                expected: self.elem_size,
                actual: std::mem::size_of::<T>(),
            });
        }
        bytemuck::try_cast_slice(self.bytes()).map_err(|_| ColumnError::Misaligned)
    }

    pub fn as_mut_slice<T: Pod>(&mut self) -> Result<&mut [T], ColumnError> {
        if std::mem::size_of::<T>() != self.elem_size {
            return Err(ColumnError::SizeMismatch {
                expected: self.elem_size,
                actual: std::mem::size_of::<T>(),
            });
        }
        bytemuck::try_cast_slice_mut(self.bytes_mut()).map_err(|_| ColumnError::Misaligned)
    }

    #[inline]
    fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let size = self.elem_size;
        &mut self.bytes_mut()[row * size..(row + 1) * size]
    }

    /// Doubling growth, in whole backing words.
    fn ensure_capacity(&mut self, elems: usize) -> Result<(), ColumnError> {
        let words_needed = (elems * self.elem_size + BYTES_PER_WORD - 1) / BYTES_PER_WORD;
        if words_needed <= self.buf.len() {
            return Ok(());
        }
        let target = words_needed.max(self.buf.len() * 2).max(4);
        self.buf
            .try_reserve_exact(target - self.buf.len())
            .map_err(|_| ColumnError::AllocationFailed)?;
        self.buf.resize(target, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_get_round_trip() {
        let mut col = ByteColumn::new(4);
        col.push(&7u32.to_le_bytes()).unwrap();
        col.push(&9u32.to_le_bytes()).unwrap();
        assert_eq!(col.get(0).unwrap(), 7u32.to_le_bytes());
        assert_eq!(col.get(1).unwrap(), 9u32.to_le_bytes());
        assert_eq!(col.back().unwrap(), 9u32.to_le_bytes());
    }

    #[test]
    fn wrong_size_push_is_rejected() {
        let mut col = ByteColumn::new(4);
        assert_eq!(
            col.push(&[1u8, 2]),
            Err(ColumnError::SizeMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn swap_remove_moves_tail_into_hole() {
        let mut col = ByteColumn::new(4);
        for v in [10u32, 20, 30] {
            col.push(&v.to_le_bytes()).unwrap();
        }
        col.swap_remove(0).unwrap();
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(0).unwrap(), 30u32.to_le_bytes());
        assert_eq!(col.get(1).unwrap(), 20u32.to_le_bytes());
    }

    #[test]
    fn typed_views_round_trip() {
        let mut col = ByteColumn::new(std::mem::size_of::<[f32; 2]>());
        col.push(bytemuck::bytes_of(&[1.0f32, 2.0])).unwrap();
        col.push(bytemuck::bytes_of(&[3.0f32, 4.0])).unwrap();
        {
            let view = col.as_mut_slice::<[f32; 2]>().unwrap();
            view[1][0] = 5.0;
        }
        let view = col.as_slice::<[f32; 2]>().unwrap();
        assert_eq!(view, &[[1.0, 2.0], [5.0, 4.0]]);
    }

    #[test]
    fn typed_view_size_mismatch_is_rejected() {
        let col = ByteColumn::new(4);
        assert!(matches!(
            col.as_slice::<u64>(),
            Err(ColumnError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn push_zeroed_reads_as_zero_after_churn() {
        let mut col = ByteColumn::new(4);
        col.push(&u32::MAX.to_le_bytes()).unwrap();
        col.pop().unwrap();
        let row = col.push_zeroed().unwrap();
        assert_eq!(col.get(row).unwrap(), [0u8; 4]);
    }

    #[test]
    fn growth_preserves_contents() {
        let mut col = ByteColumn::new(8);
        for v in 0..100u64 {
            col.push(&v.to_le_bytes()).unwrap();
        }
        for v in 0..100u64 {
            assert_eq!(col.get(v as usize).unwrap(), v.to_le_bytes());
        }
    }
}
