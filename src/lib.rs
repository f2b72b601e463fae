//! # typed-pool
//!
//! A typed fixed-size object pool allocator.
//!
//! [`PoolAllocator<T, BLOCK_SIZE>`] hands out storage slots sized and aligned
//! for a single `T`. Memory is acquired from the global allocator in
//! `BLOCK_SIZE`-byte blocks and carved into slots, so individual allocation
//! and deallocation are O(1) and touch only pool-local bookkeeping:
//!
//! - a **bump tier** carves the current block front to back;
//! - a **free-list tier** stacks returned slots and is consulted first, so a
//!   freshly returned slot is the next to be reused.
//!
//! Pools cooperate across instances (and threads) through a transfer
//! protocol: [`PoolAllocator::export_free`] / [`PoolAllocator::export_all`]
//! produce an [`ExportRecord`] that another pool of the same `(T, BLOCK_SIZE)`
//! consumes with [`PoolAllocator::import`]. A pool instance itself is strictly
//! single-writer; there are no locks or atomics on any allocation path.
//!
//! ## Quick start
//!
//! ```rust
//! use typed_pool::PoolAllocator;
//!
//! let pool: PoolAllocator<u64> = PoolAllocator::new();
//!
//! let slot = pool.allocate().unwrap();
//! unsafe {
//!     slot.as_ptr().write(7);
//!     assert_eq!(*slot.as_ptr(), 7);
//!     pool.deallocate(slot.as_ptr());
//! }
//!
//! // Or let the pool construct and destroy the payload:
//! let boxed = pool.make_unique(42u64).unwrap();
//! assert_eq!(*boxed, 42);
//! ```
//!
//! ## Features
//!
//! - `logging`: block acquisition/release and transfer tracing via `tracing`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

mod error;
mod traits;

pub mod pool;

pub use crate::error::{AllocError, AllocErrorKind, AllocResult};
pub use crate::pool::{ExportRecord, PoolAllocator, PoolBox, PoolConfig, PoolStats};
pub use crate::traits::{MemoryUsage, Resettable};

/// Convenient re-exports of commonly used types and traits.
pub mod prelude {
    pub use crate::error::{AllocError, AllocErrorKind, AllocResult};
    pub use crate::pool::{ExportRecord, PoolAllocator, PoolBox, PoolConfig, PoolStats};
    pub use crate::traits::{MemoryUsage, Resettable};
}
