//! Smart pointer for pool-allocated objects

use core::fmt;
use core::ptr::{self, NonNull};

use super::PoolAllocator;
use crate::error::AllocResult;

/// RAII smart pointer for a pool-allocated value
///
/// Automatically drops the payload and returns its slot to the pool when it
/// goes out of scope. Similar to `Box` but backed by a [`PoolAllocator`];
/// the handle borrows the pool, so the pool is guaranteed to outlive it.
pub struct PoolBox<'pool, T, const BLOCK_SIZE: usize = 4096> {
    ptr: NonNull<T>,
    pool: &'pool PoolAllocator<T, BLOCK_SIZE>,
}

impl<'pool, T, const BLOCK_SIZE: usize> PoolBox<'pool, T, BLOCK_SIZE> {
    /// Creates a new `PoolBox` by allocating from the given pool
    #[must_use = "allocated value must be used"]
    pub fn new_in(value: T, pool: &'pool PoolAllocator<T, BLOCK_SIZE>) -> AllocResult<Self> {
        let ptr = pool.new_object(value)?;
        Ok(Self { ptr, pool })
    }

    /// The pool this value lives in
    pub fn pool(&self) -> &'pool PoolAllocator<T, BLOCK_SIZE> {
        self.pool
    }

    /// Consumes the `PoolBox` and returns the contained value
    ///
    /// The slot returns to the pool; the payload destructor does not run
    /// here, the value is moved out instead.
    pub fn into_inner(self) -> T {
        // SAFETY: ptr holds an initialized T owned by this handle.
        let value = unsafe { ptr::read(self.ptr.as_ptr()) };

        // Return the slot without running the destructor again.
        // SAFETY: ptr came from allocate on this pool; the value has been
        // moved out, so the slot is dead storage.
        unsafe { self.pool.deallocate(self.ptr.as_ptr()) };
        core::mem::forget(self);

        value
    }

    /// Raw pointer to the payload, for FFI-style escapes
    ///
    /// The handle still owns the slot; the pointer must not outlive it.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T, const BLOCK_SIZE: usize> core::ops::Deref for PoolBox<'_, T, BLOCK_SIZE> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: ptr holds an initialized T for the lifetime of the handle.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, const BLOCK_SIZE: usize> core::ops::DerefMut for PoolBox<'_, T, BLOCK_SIZE> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: ptr holds an initialized T, exclusively borrowed via self.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: fmt::Debug, const BLOCK_SIZE: usize> fmt::Debug for PoolBox<'_, T, BLOCK_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, const BLOCK_SIZE: usize> Drop for PoolBox<'_, T, BLOCK_SIZE> {
    fn drop(&mut self) {
        // SAFETY: ptr holds an initialized T obtained from this pool; after
        // drop_in_place the slot is dead storage and goes back to the pool.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.pool.deallocate(self.ptr.as_ptr());
        }
    }
}
