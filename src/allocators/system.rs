//! Raw allocation boundary and the C heap implementation.

use std::ptr::NonNull;

use crate::error::RawAllocError;

/// Raw allocation primitives a manager sits on top of.
///
/// # Safety
///
/// Implementors must return pointers that stay valid until passed to
/// [`release`](RawAllocator::release) or [`resize`](RawAllocator::resize),
/// and every successful call must yield an address not currently owned by
/// anyone else.
pub unsafe trait RawAllocator {
    /// Allocate `size` bytes of uninitialized memory.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, RawAllocError>;

    /// Allocate `count * size` zeroed bytes.
    fn zero_allocate(&self, count: usize, size: usize) -> Result<NonNull<u8>, RawAllocError>;

    /// Resize an allocation, possibly relocating it.
    ///
    /// On failure the original block is left untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator and not yet released.
    unsafe fn resize(&self, ptr: NonNull<u8>, new_size: usize) -> Result<NonNull<u8>, RawAllocError>;

    /// Release an allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator and not yet released.
    unsafe fn release(&self, ptr: NonNull<u8>);
}

/// The C heap (`malloc`, `calloc`, `realloc`, `free`).
///
/// Zero-byte requests are rounded up to one byte so that success always
/// yields a unique pointer that can be released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Create a new system allocator handle.
    pub const fn new() -> Self {
        Self
    }
}

unsafe impl RawAllocator for SystemAllocator {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, RawAllocError> {
        // SAFETY: malloc has no preconditions.
        let ptr = unsafe { libc::malloc(size.max(1)) };
        NonNull::new(ptr.cast::<u8>()).ok_or_else(RawAllocError::last_os_error)
    }

    fn zero_allocate(&self, count: usize, size: usize) -> Result<NonNull<u8>, RawAllocError> {
        let (count, size) = if count == 0 || size == 0 { (1, 1) } else { (count, size) };
        // SAFETY: calloc checks count * size for overflow itself.
        let ptr = unsafe { libc::calloc(count, size) };
        NonNull::new(ptr.cast::<u8>()).ok_or_else(RawAllocError::last_os_error)
    }

    unsafe fn resize(&self, ptr: NonNull<u8>, new_size: usize) -> Result<NonNull<u8>, RawAllocError> {
        // realloc(p, 0) may free p, so never ask for zero bytes.
        let new = libc::realloc(ptr.as_ptr().cast(), new_size.max(1));
        NonNull::new(new.cast::<u8>()).ok_or_else(RawAllocError::last_os_error)
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        libc::free(ptr.as_ptr().cast());
    }
}
