//! Block ledger: exclusive ownership of the pool's blocks
//!
//! The ledger is an ordered sequence of block pointers with no aliasing;
//! the last entry is the current block. It performs the only global
//! allocator traffic in the crate: one acquisition per block, one release
//! per block over the block's lifetime, possibly in a different pool after
//! ownership transfer.

use core::alloc::Layout;
use core::mem;
use core::ptr::NonNull;
use std::alloc;

use crate::error::{AllocError, AllocResult};

#[cfg(feature = "logging")]
use tracing::debug;

/// Layout of one block: `block_size` bytes at the element's alignment
pub(crate) const fn block_layout<T>(block_size: usize) -> Layout {
    assert!(block_size > 0, "block size must be non-zero");
    match Layout::from_size_align(block_size, mem::align_of::<T>()) {
        Ok(layout) => layout,
        Err(_) => panic!("block size does not form a valid layout"),
    }
}

pub(crate) struct BlockLedger<T, const BLOCK_SIZE: usize> {
    blocks: Vec<NonNull<T>>,
}

impl<T, const BLOCK_SIZE: usize> BlockLedger<T, BLOCK_SIZE> {
    pub(crate) const LAYOUT: Layout = block_layout::<T>(BLOCK_SIZE);

    pub(crate) const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Acquires a fresh block and appends it as the new current block
    ///
    /// On failure the ledger is untouched.
    pub(crate) fn acquire(&mut self) -> AllocResult<NonNull<T>> {
        // SAFETY: LAYOUT has non-zero size (asserted in block_layout).
        let raw = unsafe { alloc::alloc(Self::LAYOUT) };
        let Some(block) = NonNull::new(raw.cast::<T>()) else {
            return Err(AllocError::out_of_memory(Self::LAYOUT));
        };
        self.blocks.push(block);

        #[cfg(feature = "logging")]
        {
            debug!(block = ?block.as_ptr(), bytes = BLOCK_SIZE, "acquired block");
        }

        Ok(block)
    }

    /// Yields all blocks, leaving the ledger empty; ownership moves with them
    pub(crate) fn drain(&mut self) -> Vec<NonNull<T>> {
        mem::take(&mut self.blocks)
    }

    /// Appends all blocks of `blocks`, assuming their ownership
    pub(crate) fn absorb(&mut self, mut blocks: Vec<NonNull<T>>) {
        if self.blocks.is_empty() {
            self.blocks = blocks;
        } else {
            self.blocks.append(&mut blocks);
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub(crate) fn bytes(&self) -> usize {
        self.blocks.len() * BLOCK_SIZE
    }

    /// Checks whether `ptr` lies inside the slot region of an owned block
    pub(crate) fn contains_slot(&self, ptr: *const T, slots_per_block: usize) -> bool {
        let addr = ptr as usize;
        let span = slots_per_block * mem::size_of::<T>();
        self.blocks.iter().any(|block| {
            let start = block.as_ptr() as usize;
            addr >= start && addr < start + span
        })
    }

    /// Releases every block back to the global allocator
    pub(crate) fn release_all(&mut self) {
        for block in self.blocks.drain(..) {
            // SAFETY: every ledger entry was acquired with LAYOUT (here or
            // in the pool this block was transferred from) and is released
            // exactly once.
            unsafe { release_block(block, Self::LAYOUT) };
        }
    }
}

impl<T, const BLOCK_SIZE: usize> Drop for BlockLedger<T, BLOCK_SIZE> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Returns one block to the global allocator
///
/// # Safety
/// `block` must have been acquired with `layout` and not yet released.
pub(crate) unsafe fn release_block<T>(block: NonNull<T>, layout: Layout) {
    #[cfg(feature = "logging")]
    {
        debug!(block = ?block.as_ptr(), bytes = layout.size(), "released block");
    }

    // SAFETY: forwarded from the caller.
    unsafe { alloc::dealloc(block.as_ptr().cast::<u8>(), layout) };
}
