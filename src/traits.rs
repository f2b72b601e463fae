//! Memory management traits
//!
//! Capacity reporting and reset functionality shared by pool-like types.

/// Memory usage reporting trait
///
/// Allows allocators to report their current memory usage. Useful for
/// monitoring, diagnostics, and implementing memory limits.
pub trait MemoryUsage {
    /// Returns currently used memory in bytes
    ///
    /// For a pool this is the storage backing live slots, not including
    /// internal bookkeeping structures.
    fn used_memory(&self) -> usize;

    /// Returns available memory in bytes
    ///
    /// Returns `None` if the allocator has no inherent limit. A pool reports
    /// the storage it can hand out without going back to the global
    /// allocator.
    fn available_memory(&self) -> Option<usize>;

    /// Returns total memory capacity in bytes
    ///
    /// Default is the sum of used and available memory; implementations with
    /// per-block overhead should override this.
    fn total_memory(&self) -> Option<usize> {
        match (self.used_memory(), self.available_memory()) {
            (used, Some(available)) => Some(used + available),
            _ => None,
        }
    }

    /// Returns memory usage as a percentage (0.0 to 100.0)
    ///
    /// Returns `None` if total memory is unknown or zero.
    fn memory_usage_percent(&self) -> Option<f32> {
        self.total_memory().and_then(|total| {
            if total == 0 {
                Some(0.0)
            } else {
                Some((self.used_memory() as f32 / total as f32) * 100.0)
            }
        })
    }
}

/// Resettable allocator trait
///
/// Allocators implementing this trait can be reset, invalidating all
/// previous allocations and returning to their initial state.
pub trait Resettable {
    /// Resets the allocator, invalidating all previous allocations
    ///
    /// # Safety
    /// - All pointers from previous allocations become invalid immediately
    /// - Caller must ensure no live references exist before calling
    /// - After reset, the allocator is ready for new allocations
    unsafe fn reset(&self);

    /// Checks if the allocator can be safely reset
    fn can_reset(&self) -> bool {
        true
    }

    /// Resets the allocator only if it's safe to do so
    ///
    /// Returns `true` if reset was performed, `false` if it was skipped.
    ///
    /// # Safety
    /// Same requirements as [`reset`](Resettable::reset), applied only when
    /// the reset actually runs.
    unsafe fn try_reset(&self) -> bool {
        if self.can_reset() {
            unsafe { self.reset() };
            true
        } else {
            false
        }
    }
}
