//! Nested arenas carved out of a parent's remaining capacity

use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use super::{Arena, ArenaOptions, DEFAULT_ALIGNMENT};
use crate::error::MemoryResult;

/// Nested arena whose buffer is a reserved range inside a parent arena
///
/// The wrapper borrows the parent so the child cannot outlive it. The
/// child never owns its buffer, cannot grow, and its destroy leaves the
/// parent untouched; the reserved range is not returned to the parent.
/// Reclaim it by taking a marker before the [`Arena::subarena`] call and
/// popping it once the child is gone.
#[derive(Debug)]
pub struct SubArena<'parent> {
    inner: Arena,
    _parent: PhantomData<&'parent Arena>,
}

impl<'parent> SubArena<'parent> {
    /// The underlying arena
    pub fn arena(&self) -> &Arena {
        &self.inner
    }

    /// The underlying arena, mutably
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.inner
    }
}

impl Deref for SubArena<'_> {
    type Target = Arena;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SubArena<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Arena {
    /// Carves a sub-arena of `size` bytes out of this arena's remaining
    /// capacity
    ///
    /// The range is reserved through the normal allocation path, so the
    /// parent's statistics and observer see it as one allocation. Fails
    /// when the remaining capacity cannot fit `size` plus alignment
    /// padding.
    ///
    /// Growing this arena while the sub-arena is live invalidates the
    /// child's buffer; callers that enable growth must not hold live
    /// sub-arenas across allocations on the parent.
    pub fn subarena(&self, size: usize) -> MemoryResult<SubArena<'_>> {
        let ptr = self.alloc_bytes_aligned(size, DEFAULT_ALIGNMENT)?;
        let options = ArenaOptions::new().with_label(format!("{}/sub", self.label()));
        let inner = Arena::new_borrowed(ptr, size, Some(self.id()), options)?;
        Ok(SubArena {
            inner,
            _parent: PhantomData,
        })
    }
}
