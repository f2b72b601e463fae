//! Export records for the pool-to-pool transfer protocol
//!
//! A record is produced by `export_free` / `export_all` on a source pool and
//! consumed by `import` on a destination pool of the same element type and
//! block size. Records are plain data and can be buffered or carried across
//! thread boundaries before being imported.

use core::fmt;
use core::mem::{self, ManuallyDrop};
use core::ptr::NonNull;

use super::ledger::{block_layout, release_block};

/// Free slots and, optionally, block ownership exported from one pool
///
/// `free_slots` entries are references into blocks; they are owned by the
/// record only insofar as the blocks travel in the same record (`export_all`)
/// or remain owned by the source pool (`export_free`). `blocks` entries are
/// exclusively owned: a record dropped without being imported releases them
/// back to the global allocator, so the acquire/release ledger still
/// reconciles. Free slots are never released on drop.
pub struct ExportRecord<T, const BLOCK_SIZE: usize = 4096> {
    free_slots: Vec<NonNull<T>>,
    blocks: Vec<NonNull<T>>,
}

impl<T, const BLOCK_SIZE: usize> ExportRecord<T, BLOCK_SIZE> {
    pub(crate) fn new(free_slots: Vec<NonNull<T>>, blocks: Vec<NonNull<T>>) -> Self {
        Self { free_slots, blocks }
    }

    /// Number of free slots carried by this record
    #[inline]
    pub fn num_free_slots(&self) -> usize {
        self.free_slots.len()
    }

    /// Number of owned blocks carried by this record
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Checks whether the record carries nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free_slots.is_empty() && self.blocks.is_empty()
    }

    /// Decomposes the record without running its drop glue
    pub(crate) fn into_parts(self) -> (Vec<NonNull<T>>, Vec<NonNull<T>>) {
        let mut this = ManuallyDrop::new(self);
        (
            mem::take(&mut this.free_slots),
            mem::take(&mut this.blocks),
        )
    }
}

impl<T, const BLOCK_SIZE: usize> Drop for ExportRecord<T, BLOCK_SIZE> {
    fn drop(&mut self) {
        let layout = block_layout::<T>(BLOCK_SIZE);
        for block in self.blocks.drain(..) {
            // SAFETY: blocks in a record were drained from a pool ledger and
            // have not been released; dropping the record is their single
            // release. Slots referencing them die with the record.
            unsafe { release_block(block, layout) };
        }
    }
}

impl<T, const BLOCK_SIZE: usize> fmt::Debug for ExportRecord<T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRecord")
            .field("free_slots", &self.free_slots.len())
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

// SAFETY: ExportRecord<T> is Send when T is Send.
// - The record exclusively owns its block storage and the slot pointer lists
// - No access to that storage happens until a destination pool imports it,
//   and the exporting pool has already severed its references
// - T: Send bound ensures payload values written into the slots later may
//   live on the importing thread
unsafe impl<T: Send, const BLOCK_SIZE: usize> Send for ExportRecord<T, BLOCK_SIZE> {}
