//! Pool configuration variants

/// Configuration for a pool allocator
///
/// The default tracks statistics and writes no debug patterns; the presets
/// mirror common deployment profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Track allocation counters and peak usage
    pub track_stats: bool,
    /// Fill freshly handed-out slots with this byte
    ///
    /// The fill dereferences the slot, so with free slots imported via
    /// `transfer_free` it is subject to the same source-pool lifetime
    /// contract as any other slot access.
    pub alloc_pattern: Option<u8>,
    /// Fill returned slots with this byte before they reach the free list
    pub dealloc_pattern: Option<u8>,
}

impl PoolConfig {
    /// Production profile: counters on, no debug fills
    pub const fn production() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug profile: counters on, recognizable fill patterns
    pub const fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(0xAB),
            dealloc_pattern: Some(0xDE),
        }
    }

    /// Performance profile: minimal overhead, nothing tracked
    pub const fn performance() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::production()
    }
}
