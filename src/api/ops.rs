//! Tracked allocation operations.
//!
//! Each operation calls the raw primitive, reports a failure through the
//! diagnostics backend, and on success registers (or follows) the block in
//! a manager when one is supplied. [`Mode`] makes the tracked and untracked
//! paths explicit:
//!
//! ```rust
//! use memtrack::{allocate, call_site, Manager, Mode};
//!
//! let mut manager = Manager::new().unwrap();
//! let tracked = allocate(32, Mode::Tracked(&mut manager), &call_site!()).unwrap();
//! assert!(manager.contains(tracked));
//!
//! let untracked = allocate(32, Mode::untracked(), &call_site!()).unwrap();
//! assert!(!manager.contains(untracked));
//! # unsafe { memtrack::RawAllocator::release(&memtrack::SystemAllocator, untracked) };
//! ```

use std::ptr::NonNull;

use super::manager::Manager;
use crate::allocators::system::{RawAllocator, SystemAllocator};
use crate::diagnostics::{self, CallSite};
use crate::error::{RawAllocError, TrackError, TrackResult};

/// Whether an operation registers its result with a manager.
pub enum Mode<'a, A: RawAllocator = SystemAllocator> {
    /// Register the result in this manager, using its allocator.
    Tracked(&'a mut Manager<A>),
    /// Plain wrapper over this allocator. No registry is touched.
    Untracked(&'a A),
}

impl Mode<'static, SystemAllocator> {
    /// Untracked mode over the C heap.
    pub fn untracked() -> Self {
        Mode::Untracked(&SystemAllocator)
    }
}

impl<'a, A: RawAllocator> Mode<'a, A> {
    /// Whether this mode registers results.
    pub fn is_tracked(&self) -> bool {
        matches!(self, Mode::Tracked(_))
    }
}

impl<'a, A: RawAllocator> From<&'a mut Manager<A>> for Mode<'a, A> {
    fn from(manager: &'a mut Manager<A>) -> Self {
        Mode::Tracked(manager)
    }
}

/// Turn a raw failure into a report plus `AllocationFailure`.
fn checked(
    result: Result<NonNull<u8>, RawAllocError>,
    site: &CallSite,
    size: usize,
) -> TrackResult<NonNull<u8>> {
    result.map_err(|err| {
        diagnostics::report_allocation_failure(site, err, Some(size));
        TrackError::AllocationFailure(err)
    })
}

/// Allocate `size` bytes.
///
/// In tracked mode the block is registered with the manager. If the entry
/// cannot be created the block is released again and `RegistrationFailure`
/// is returned.
pub fn allocate<A: RawAllocator>(size: usize, mode: Mode<'_, A>, site: &CallSite) -> TrackResult<NonNull<u8>> {
    match mode {
        Mode::Untracked(allocator) => checked(allocator.allocate(size), site, size),
        Mode::Tracked(manager) => {
            let ptr = checked(manager.allocator().allocate(size), site, size)?;
            manager.register_fresh(ptr, size, site)
        }
    }
}

/// Allocate `count * size` zeroed bytes.
///
/// Registration follows the same rules as [`allocate`].
pub fn zero_allocate<A: RawAllocator>(
    count: usize,
    size: usize,
    mode: Mode<'_, A>,
    site: &CallSite,
) -> TrackResult<NonNull<u8>> {
    let total = count.saturating_mul(size);
    match mode {
        Mode::Untracked(allocator) => checked(allocator.zero_allocate(count, size), site, total),
        Mode::Tracked(manager) => {
            let ptr = checked(manager.allocator().zero_allocate(count, size), site, total)?;
            manager.register_fresh(ptr, total, site)
        }
    }
}

/// Resize `ptr` to `new_size` bytes, possibly relocating it.
///
/// In tracked mode the entry for `ptr` is updated in place: same id, same
/// position, new address. If `ptr` is not tracked by the manager the resize
/// still succeeds and the returned block is untracked. On failure `ptr` is
/// left untouched and still tracked.
///
/// # Safety
///
/// `ptr` must be a live block from the mode's allocator. In tracked mode it
/// is either owned by the manager or by the caller; in untracked mode it
/// must not be tracked by any manager, which would be left holding a stale
/// address.
pub unsafe fn resize<A: RawAllocator>(
    ptr: NonNull<u8>,
    new_size: usize,
    mode: Mode<'_, A>,
    site: &CallSite,
) -> TrackResult<NonNull<u8>> {
    match mode {
        Mode::Untracked(allocator) => checked(allocator.resize(ptr, new_size), site, new_size),
        Mode::Tracked(manager) => {
            let new = checked(manager.allocator().resize(ptr, new_size), site, new_size)?;
            if manager.relocate(ptr, new, new_size).is_none() {
                #[cfg(feature = "log")]
                log::debug!(
                    target: "memtrack",
                    "resize of untracked {:p} from {}; result {:p} stays untracked",
                    ptr.as_ptr(),
                    site,
                    new.as_ptr()
                );
            }
            Ok(new)
        }
    }
}
