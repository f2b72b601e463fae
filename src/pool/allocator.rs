//! Main pool allocator implementation
//!
//! # Safety
//!
//! This module implements a single-writer pool allocator over interior
//! mutability:
//! - Pool state lives in an `UnsafeCell`; the pool is `!Sync`, so all calls
//!   on one instance are serialized on a single thread
//! - No method re-enters the pool while holding the state reference; user
//!   code (payload constructors, destructors) runs only after the reference
//!   has been released
//! - Slot pointers handed to callers address uninitialized storage inside
//!   ledger-owned blocks; every dereference is the caller's obligation
//!
//! ## Invariants
//!
//! - Every free-list entry addresses a carved slot of some owned block (or,
//!   after `transfer_free`, of a block owned by the source pool)
//! - Only the current block has uncarved slots; earlier blocks are fully
//!   carved
//! - live slots = carved slots minus free-list length, for every externally
//!   observable state
//! - Each block is acquired once and released once, possibly by a different
//!   pool after ownership transfer

use core::alloc::Layout;
use core::cell::UnsafeCell;
use core::mem;
use core::ptr::{self, NonNull};
use std::alloc;

use super::bump::BumpCursor;
use super::free_list::FreeList;
use super::ledger::BlockLedger;
use super::pool_box::PoolBox;
use super::stats::StatCounters;
use super::transfer::ExportRecord;
use super::{PoolConfig, PoolStats};
use crate::error::{AllocError, AllocResult};
use crate::traits::{MemoryUsage, Resettable};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

struct PoolState<T, const BLOCK_SIZE: usize> {
    ledger: BlockLedger<T, BLOCK_SIZE>,
    cursor: BumpCursor<T>,
    free: FreeList<T>,
    counters: StatCounters,
}

/// Typed fixed-size object pool allocator
///
/// Hands out storage slots sized and aligned for one `T`, carving them from
/// `BLOCK_SIZE`-byte blocks acquired from the global allocator. Allocation
/// consults the free-list tier first, then the bump tier, and only acquires
/// a new block when both are exhausted, so a freshly deallocated slot is the
/// next to be reused.
///
/// A pool is strictly single-writer: it is `Send` (when `T` is) but `!Sync`,
/// and no operation takes a lock or touches an atomic. Threads cooperate by
/// moving whole pools or [`ExportRecord`]s between each other.
///
/// Dropping a pool releases every owned block. **Payload destructors are not
/// run**: it is the caller's responsibility that no slot holds a live value,
/// or that those values' destructors have already been run. Violating this
/// leaks the values' owned resources but does not corrupt memory.
pub struct PoolAllocator<T, const BLOCK_SIZE: usize = 4096> {
    state: UnsafeCell<PoolState<T, BLOCK_SIZE>>,
    config: PoolConfig,
}

impl<T, const BLOCK_SIZE: usize> PoolAllocator<T, BLOCK_SIZE> {
    /// Number of slots carved from each block
    ///
    /// Evaluated at compile time; a block must hold at least one slot.
    pub const SLOTS_PER_BLOCK: usize = {
        assert!(
            mem::size_of::<T>() > 0,
            "zero-sized payload types are not supported"
        );
        assert!(
            BLOCK_SIZE >= mem::size_of::<T>(),
            "BLOCK_SIZE must hold at least one slot of T"
        );
        BLOCK_SIZE / mem::size_of::<T>()
    };

    /// Creates an empty pool: no blocks, no free slots, no bump cursor
    ///
    /// Acquires nothing from the global allocator until the first
    /// [`allocate`](Self::allocate).
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates an empty pool with the given configuration
    pub fn with_config(config: PoolConfig) -> Self {
        // Force the compile-time slot-count check at construction.
        let _ = Self::SLOTS_PER_BLOCK;

        Self {
            state: UnsafeCell::new(PoolState {
                ledger: BlockLedger::new(),
                cursor: BumpCursor::new(),
                free: FreeList::new(),
                counters: StatCounters::default(),
            }),
            config,
        }
    }

    /// Exclusive access to the pool state
    ///
    /// # Safety
    /// The caller must not let the returned reference coexist with any other
    /// reference obtained from this method on the same pool. The pool is
    /// `!Sync`, so calls are serialized on one thread; every method releases
    /// the reference before running user code or calling back into `self`.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    unsafe fn state_mut(&self) -> &mut PoolState<T, BLOCK_SIZE> {
        // SAFETY: forwarded from the caller.
        unsafe { &mut *self.state.get() }
    }

    /// Returns a pointer to an uninitialized, properly aligned slot for one `T`
    ///
    /// Selection order: free list, then the bump cursor, then a freshly
    /// acquired block. Fails only when the global allocator cannot supply a
    /// new block, in which case the pool is left exactly as it was.
    pub fn allocate(&self) -> AllocResult<NonNull<T>> {
        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };

        let slot = if let Some(slot) = state.free.pop() {
            slot
        } else if let Some(slot) = state.cursor.allocate_one() {
            slot
        } else {
            let block = state.ledger.acquire()?;
            // The first slot is carved immediately; the cursor covers the
            // remainder of the fresh block.
            // SAFETY: SLOTS_PER_BLOCK >= 1, so offset 1 is within the slot
            // region or one past its end.
            unsafe {
                let rest = NonNull::new_unchecked(block.as_ptr().add(1));
                state.cursor.init(rest, Self::SLOTS_PER_BLOCK - 1);
            }
            block
        };

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: slot addresses size_of::<T>() writable bytes inside an
            // owned block (subject to the transfer_free lifetime contract).
            unsafe { ptr::write_bytes(slot.as_ptr().cast::<u8>(), pattern, mem::size_of::<T>()) };
        }

        if self.config.track_stats {
            state.counters.total_allocs += 1;
            // Saturates for pools serving free slots imported via
            // transfer_free, which are not carved from own blocks.
            let live = (state.ledger.len() * Self::SLOTS_PER_BLOCK)
                .saturating_sub(state.free.len() + state.cursor.remaining());
            if live > state.counters.peak_live {
                state.counters.peak_live = live;
            }
        }

        #[cfg(feature = "logging")]
        {
            trace!(slot = ?slot.as_ptr(), "allocated slot");
        }

        Ok(slot)
    }

    /// Returns a slot to the free-list tier
    ///
    /// `ptr` may be null, in which case this is a no-op. The pool does not
    /// validate that `ptr` belongs to one of its blocks.
    ///
    /// # Safety
    /// A non-null `ptr` must have been obtained from [`allocate`](Self::allocate)
    /// on this pool, or imported into it via the transfer protocol, must not
    /// already be on the free list, and must not hold a live value the caller
    /// still intends to use.
    pub unsafe fn deallocate(&self, ptr: *mut T) {
        let Some(slot) = NonNull::new(ptr) else {
            return;
        };

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: per the caller contract, slot addresses an owned,
            // no-longer-live slot.
            unsafe { ptr::write_bytes(slot.as_ptr().cast::<u8>(), pattern, mem::size_of::<T>()) };
        }

        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };
        state.free.push(slot);
        if self.config.track_stats {
            state.counters.total_deallocs += 1;
        }

        #[cfg(feature = "logging")]
        {
            trace!(slot = ?slot.as_ptr(), "deallocated slot");
        }
    }

    /// Allocates storage for `n` contiguous `T` from the global allocator
    ///
    /// Bulk requests bypass the pool entirely: they touch neither the block
    /// ledger, the bump cursor, nor the free list. Pair with
    /// [`deallocate_array`](Self::deallocate_array).
    pub fn allocate_array(&self, n: usize) -> AllocResult<NonNull<T>> {
        if n == 0 {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(n).map_err(|_| AllocError::size_overflow())?;
        // SAFETY: layout has non-zero size (n >= 1 and T is not zero-sized).
        let raw = unsafe { alloc::alloc(layout) };
        NonNull::new(raw.cast::<T>()).ok_or(AllocError::out_of_memory(layout))
    }

    /// Releases storage obtained from [`allocate_array`](Self::allocate_array)
    ///
    /// # Safety
    /// `ptr` must come from `allocate_array(n)` on any pool of this type with
    /// the same `n`, and must not be released twice. Null or `n == 0` is a
    /// no-op.
    pub unsafe fn deallocate_array(&self, ptr: *mut T, n: usize) {
        if ptr.is_null() || n == 0 {
            return;
        }
        let Ok(layout) = Layout::array::<T>(n) else {
            return;
        };
        // SAFETY: ptr was allocated with exactly this layout (caller contract).
        unsafe { alloc::dealloc(ptr.cast::<u8>(), layout) };
    }

    /// Allocates a slot and moves `value` into it
    pub fn new_object(&self, value: T) -> AllocResult<NonNull<T>> {
        let slot = self.allocate()?;
        // SAFETY: slot is valid, aligned, uninitialized storage for one T.
        unsafe { slot.as_ptr().write(value) };
        Ok(slot)
    }

    /// Allocates a slot and constructs the value in place via `init`
    ///
    /// If `init` panics, the slot returns to the free-list tier before the
    /// panic propagates, exactly as if it had been explicitly deallocated.
    pub fn new_object_with<F>(&self, init: F) -> AllocResult<NonNull<T>>
    where
        F: FnOnce() -> T,
    {
        let slot = self.allocate()?;
        let guard = SlotGuard { pool: self, slot };
        let value = init();
        mem::forget(guard);
        // SAFETY: slot is valid, aligned, uninitialized storage for one T.
        unsafe { slot.as_ptr().write(value) };
        Ok(slot)
    }

    /// Drops the value in `ptr` and returns the slot to the free-list tier
    ///
    /// Null is a no-op.
    ///
    /// # Safety
    /// A non-null `ptr` must address a slot of this pool (or one imported
    /// into it) holding a properly initialized `T` that is not referenced
    /// elsewhere.
    pub unsafe fn delete_object(&self, ptr: *mut T) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: ptr holds an initialized T per the caller contract; the
        // slot is handed back untouched by anything else afterwards.
        unsafe {
            ptr::drop_in_place(ptr);
            self.deallocate(ptr);
        }
    }

    /// Allocates a slot, moves `value` in, and wraps it in a scoped handle
    ///
    /// The handle drops the payload and frees the slot when it goes out of
    /// scope; it borrows the pool, so the pool outlives every handle.
    pub fn make_unique(&self, value: T) -> AllocResult<PoolBox<'_, T, BLOCK_SIZE>> {
        PoolBox::new_in(value, self)
    }

    /// Exports the free-list tier; block ownership stays with this pool
    ///
    /// Afterwards the pool's free list is empty; blocks and the bump cursor
    /// are unchanged.
    ///
    /// **Lifetime warning:** slot pointers in the record keep pointing into
    /// blocks owned by this pool. The importing pool must not serve a slot
    /// past this pool's destruction; doing so and dereferencing it is
    /// use-after-free. Use [`export_all`](Self::export_all) to sever the
    /// coupling.
    pub fn export_free(&self) -> ExportRecord<T, BLOCK_SIZE> {
        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };
        let slots = state.free.drain();

        #[cfg(feature = "logging")]
        {
            debug!(free_slots = slots.len(), "exported free slots");
        }

        ExportRecord::new(slots, Vec::new())
    }

    /// Exports free slots, the bump remainder, and every owned block
    ///
    /// The uncarved suffix of the current block is promoted to explicit free
    /// slots so the importing pool can manage the block from its free-list
    /// tier alone; its own bump cursor never switches blocks. This pool
    /// reverts to the initial state.
    ///
    /// The caller must ensure no slot of this pool is live outside its free
    /// list; live payloads would be stranded in blocks the record now owns.
    pub fn export_all(&self) -> ExportRecord<T, BLOCK_SIZE> {
        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };
        let mut slots = state.free.drain();
        state.cursor.drain_into(&mut slots);
        state.cursor.clear();
        let blocks = state.ledger.drain();

        #[cfg(feature = "logging")]
        {
            debug!(
                free_slots = slots.len(),
                blocks = blocks.len(),
                "exported free slots and blocks"
            );
        }

        ExportRecord::new(slots, blocks)
    }

    /// Imports an export record, assuming ownership of everything it carries
    ///
    /// Always additive: free slots append to the free-list tier, blocks
    /// append to the block ledger. The bump cursor is unchanged; imported
    /// blocks are never bump-carved here. Never fails and never calls the
    /// global allocator.
    pub fn import(&self, record: ExportRecord<T, BLOCK_SIZE>) {
        let (slots, blocks) = record.into_parts();

        #[cfg(feature = "logging")]
        {
            debug!(
                free_slots = slots.len(),
                blocks = blocks.len(),
                "imported export record"
            );
        }

        // SAFETY: no other state reference is alive (see state_mut); the
        // record's parts were moved out above without running its drop glue.
        let state = unsafe { self.state_mut() };
        state.free.absorb(slots);
        state.ledger.absorb(blocks);
    }

    /// Moves every free slot of `src` onto this pool's free list
    ///
    /// Equivalent to `self.import(src.export_free())`; see
    /// [`export_free`](Self::export_free) for the lifetime warning.
    pub fn transfer_free(&self, src: &Self) {
        debug_assert!(
            !ptr::eq(self, src),
            "transfer_free requires two distinct pools"
        );
        self.import(src.export_free());
    }

    /// Moves free slots and block ownership from `src` into this pool
    ///
    /// `src` reverts to the initial state; afterwards every pointer it ever
    /// handed out is served by this pool with no lifetime coupling to `src`.
    /// The caller must ensure `src` has no live allocations (every slot
    /// handed out by `src` has been deallocated back to it).
    pub fn transfer_all(&self, src: &Self) {
        debug_assert!(
            !ptr::eq(self, src),
            "transfer_all requires two distinct pools"
        );
        self.import(src.export_all());
    }

    /// Bytes currently acquired from the global allocator
    pub fn allocated_bytes(&self) -> usize {
        // SAFETY: no other state reference is alive (see state_mut).
        unsafe { self.state_mut() }.ledger.bytes()
    }

    /// Number of slots on the free-list tier
    pub fn num_slots_available(&self) -> usize {
        // SAFETY: no other state reference is alive (see state_mut).
        unsafe { self.state_mut() }.free.len()
    }

    /// Number of uncarved slots in the current block
    pub fn num_bump_available(&self) -> usize {
        // SAFETY: no other state reference is alive (see state_mut).
        unsafe { self.state_mut() }.cursor.remaining()
    }

    /// Number of blocks currently owned
    pub fn num_blocks(&self) -> usize {
        // SAFETY: no other state reference is alive (see state_mut).
        unsafe { self.state_mut() }.ledger.len()
    }

    /// Number of slots currently handed out and not yet returned
    ///
    /// Counts against this pool's own blocks. Free slots imported via
    /// `transfer_free` inflate the free list without adding carved slots, so
    /// for such a pool the count saturates at zero.
    pub fn live_slots(&self) -> usize {
        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };
        (state.ledger.len() * Self::SLOTS_PER_BLOCK)
            .saturating_sub(state.free.len() + state.cursor.remaining())
    }

    /// Checks whether no slot is currently live
    pub fn is_unused(&self) -> bool {
        self.live_slots() == 0
    }

    /// Diagnostic membership test: does `ptr` lie in an owned slot region?
    ///
    /// Slots imported via `transfer_free` live in the source pool's blocks
    /// and are not reported here.
    pub fn contains(&self, ptr: *const T) -> bool {
        // SAFETY: no other state reference is alive (see state_mut).
        unsafe { self.state_mut() }
            .ledger
            .contains_slot(ptr, Self::SLOTS_PER_BLOCK)
    }

    /// Statistics snapshot, if tracking is enabled
    pub fn stats(&self) -> Option<PoolStats> {
        if !self.config.track_stats {
            return None;
        }
        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };
        Some(PoolStats {
            blocks: state.ledger.len(),
            allocated_bytes: state.ledger.bytes(),
            slots_available: state.free.len(),
            bump_available: state.cursor.remaining(),
            total_allocs: state.counters.total_allocs,
            total_deallocs: state.counters.total_deallocs,
            peak_live: state.counters.peak_live,
        })
    }

    /// The configuration this pool was created with
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl<T, const BLOCK_SIZE: usize> Default for PoolAllocator<T, BLOCK_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pool identity is reference identity; two handles are equal only when they
/// are the same pool.
impl<T, const BLOCK_SIZE: usize> PartialEq for PoolAllocator<T, BLOCK_SIZE> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl<T, const BLOCK_SIZE: usize> Eq for PoolAllocator<T, BLOCK_SIZE> {}

impl<T, const BLOCK_SIZE: usize> core::fmt::Debug for PoolAllocator<T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("allocated_bytes", &self.allocated_bytes())
            .field("slots_available", &self.num_slots_available())
            .field("bump_available", &self.num_bump_available())
            .finish()
    }
}

impl<T, const BLOCK_SIZE: usize> MemoryUsage for PoolAllocator<T, BLOCK_SIZE> {
    fn used_memory(&self) -> usize {
        self.live_slots() * mem::size_of::<T>()
    }

    fn available_memory(&self) -> Option<usize> {
        Some((self.num_slots_available() + self.num_bump_available()) * mem::size_of::<T>())
    }

    /// Overridden: blocks may carry tail padding that is never slot storage.
    fn total_memory(&self) -> Option<usize> {
        Some(self.allocated_bytes())
    }
}

impl<T, const BLOCK_SIZE: usize> Resettable for PoolAllocator<T, BLOCK_SIZE> {
    /// # Safety
    /// Caller must ensure no slot of this pool is live and no export record
    /// referencing its blocks is outstanding.
    unsafe fn reset(&self) {
        // SAFETY: no other state reference is alive (see state_mut).
        let state = unsafe { self.state_mut() };
        state.free.clear();
        state.cursor.clear();
        state.ledger.release_all();
        state.counters = StatCounters::default();
    }
}

// SAFETY: PoolAllocator<T> is Send when T is Send.
// - The pool exclusively owns its blocks, free list, and cursor; moving it
//   to another thread moves that ownership wholesale
// - T: Send bound ensures payload values in live slots may live on the
//   receiving thread
// - The type stays !Sync (UnsafeCell state), so single-writer discipline is
//   preserved after the move
unsafe impl<T: Send, const BLOCK_SIZE: usize> Send for PoolAllocator<T, BLOCK_SIZE> {}

/// Returns the slot to the free list if construction unwinds
struct SlotGuard<'a, T, const BLOCK_SIZE: usize> {
    pool: &'a PoolAllocator<T, BLOCK_SIZE>,
    slot: NonNull<T>,
}

impl<T, const BLOCK_SIZE: usize> Drop for SlotGuard<'_, T, BLOCK_SIZE> {
    fn drop(&mut self) {
        // SAFETY: slot came from allocate on this pool and holds no value.
        unsafe { self.pool.deallocate(self.slot.as_ptr()) };
    }
}
