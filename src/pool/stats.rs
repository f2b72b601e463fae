//! Pool allocator statistics

/// Point-in-time statistics snapshot for a pool
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    /// Blocks currently owned by the pool
    pub blocks: usize,
    /// Bytes currently acquired from the global allocator
    pub allocated_bytes: usize,
    /// Slots on the free list
    pub slots_available: usize,
    /// Uncarved slots in the current block
    pub bump_available: usize,
    /// Total allocations served over the pool's lifetime
    pub total_allocs: u64,
    /// Total deallocations over the pool's lifetime
    pub total_deallocs: u64,
    /// Highest number of simultaneously live slots observed
    pub peak_live: usize,
}

/// Lifetime counters kept in the single-writer pool state
///
/// Plain integers on purpose; the pool has no concurrent observers.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StatCounters {
    pub(crate) total_allocs: u64,
    pub(crate) total_deallocs: u64,
    pub(crate) peak_live: usize,
}
