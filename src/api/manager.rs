//! The memory manager: an owning registry of tracked allocations.
//!
//! A [`Manager`] owns every address registered with it. Addresses are
//! released individually with [`Manager::remove`], all at once with
//! [`Manager::release_all`], or when the manager is destroyed or dropped.
//!
//! # Example
//!
//! ```rust
//! use memtrack::{call_site, Manager};
//!
//! let mut manager = Manager::new().unwrap();
//! let a = manager.alloc(16, &call_site!()).unwrap();
//! let _b = manager.zalloc(4, 8, &call_site!()).unwrap();
//!
//! manager.remove(a).unwrap();
//! assert_eq!(manager.release_all(), 1);
//! ```
//!
//! Managers hold raw pointers and are neither `Send` nor `Sync`; every
//! operation runs to completion before the next one can start.

use std::fmt::Write as _;
use std::ptr::NonNull;

use super::config::ManagerConfig;
use super::ops::{self, Mode};
use super::stats::ManagerStats;
use crate::allocators::registry::{Entries, Entry, EntryId, Registry};
use crate::allocators::system::{RawAllocator, SystemAllocator};
use crate::diagnostics::{self, CallSite, RegistrationCause};
use crate::error::{TrackError, TrackResult};

/// Anything that names a memory address.
pub trait Address {
    /// The address as an integer.
    fn as_addr(self) -> usize;
}

impl<T: ?Sized> Address for NonNull<T> {
    fn as_addr(self) -> usize {
        self.cast::<u8>().as_ptr() as usize
    }
}

impl<T: ?Sized> Address for *const T {
    fn as_addr(self) -> usize {
        self.cast::<u8>() as usize
    }
}

impl<T: ?Sized> Address for *mut T {
    fn as_addr(self) -> usize {
        self.cast::<u8>() as usize
    }
}

/// Owning registry of tracked allocations.
pub struct Manager<A: RawAllocator = SystemAllocator> {
    registry: Registry,
    allocator: A,
    config: ManagerConfig,
    tracked_bytes: usize,
    peak_entries: usize,
    total_registered: u64,
    total_released: u64,
    relocations: u64,
    failed_registrations: u64,
}

impl Manager<SystemAllocator> {
    /// Create an empty manager over the C heap.
    ///
    /// Fails with `AllocationFailure` if the registry's initial storage
    /// cannot be reserved.
    pub fn new() -> TrackResult<Self> {
        Self::with_config(ManagerConfig::default())
    }

    /// Create an empty manager over the C heap with a custom config.
    pub fn with_config(config: ManagerConfig) -> TrackResult<Self> {
        Self::with_allocator(SystemAllocator, config)
    }
}

impl<A: RawAllocator> Manager<A> {
    /// Create an empty manager over a custom raw allocator.
    pub fn with_allocator(allocator: A, config: ManagerConfig) -> TrackResult<Self> {
        let registry = Registry::with_capacity(config.initial_capacity, config.max_entries)?;

        #[cfg(feature = "log")]
        log::debug!(
            target: "memtrack",
            "manager created (capacity {}, limit {:?})",
            config.initial_capacity,
            config.max_entries
        );

        Ok(Self {
            registry,
            allocator,
            config,
            tracked_bytes: 0,
            peak_entries: 0,
            total_registered: 0,
            total_released: 0,
            relocations: 0,
            failed_registrations: 0,
        })
    }

    /// Register an address allocated elsewhere and take ownership of it.
    ///
    /// The entry is appended after every existing entry. On failure the
    /// registry is unchanged and `ptr` is NOT released: the caller still
    /// owns it.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this manager's raw allocator, must not have been
    /// released, and must not be released by anyone but this manager from
    /// now on.
    pub unsafe fn add(&mut self, ptr: NonNull<u8>) -> TrackResult<NonNull<u8>> {
        self.register(ptr, None, None)?;
        Ok(ptr)
    }

    /// Register an address, recording its size and call-site when given.
    pub(crate) fn register(
        &mut self,
        ptr: NonNull<u8>,
        size: Option<usize>,
        site: Option<&CallSite>,
    ) -> TrackResult<EntryId> {
        let site = if self.config.record_call_sites { site.copied() } else { None };

        match self.registry.insert(ptr, size, site) {
            Ok(id) => {
                self.tracked_bytes += size.unwrap_or(0);
                self.total_registered += 1;
                self.peak_entries = self.peak_entries.max(self.registry.len());
                Ok(id)
            }
            Err(err) => {
                if err == TrackError::RegistrationFailure {
                    self.failed_registrations += 1;
                }
                Err(err)
            }
        }
    }

    /// Register a block the manager's allocator just produced.
    ///
    /// If no entry can be created the block is released and the failure is
    /// reported, so a failed tracked allocation never leaks.
    pub(crate) fn register_fresh(
        &mut self,
        ptr: NonNull<u8>,
        size: usize,
        site: &CallSite,
    ) -> TrackResult<NonNull<u8>> {
        match self.register(ptr, Some(size), Some(site)) {
            Ok(_) => Ok(ptr),
            Err(TrackError::RegistrationFailure) => {
                // SAFETY: the allocator handed out ptr a moment ago and
                // nobody else has seen it.
                unsafe { self.allocator.release(ptr) };
                let cause = match self.config.max_entries {
                    Some(max) if self.registry.len() >= max => RegistrationCause::LimitReached(max),
                    _ => RegistrationCause::OutOfMemory,
                };
                diagnostics::report_registration_failure(site, cause, Some(size));
                Err(TrackError::RegistrationFailure)
            }
            // A live entry already owns this address; leave it to that entry.
            Err(err) => Err(err),
        }
    }

    /// Follow a resized block to its new address.
    ///
    /// Returns `None` when `old` was not tracked; the new block is then
    /// left untracked.
    pub(crate) fn relocate(&mut self, old: NonNull<u8>, new: NonNull<u8>, new_size: usize) -> Option<EntryId> {
        let old_addr = old.as_addr();
        let old_size = self.registry.find(old_addr)?.size().unwrap_or(0);
        let id = self.registry.relocate(old_addr, new, Some(new_size))?;

        self.tracked_bytes = self.tracked_bytes - old_size + new_size;
        if new.as_addr() != old_addr {
            self.relocations += 1;
        }
        Some(id)
    }

    /// Find the entry tracking `ptr`. Comparison is by address identity.
    pub fn find<P: Address>(&self, ptr: P) -> Option<&Entry> {
        self.registry.find(ptr.as_addr())
    }

    /// Whether `ptr` is tracked.
    pub fn contains<P: Address>(&self, ptr: P) -> bool {
        self.find(ptr).is_some()
    }

    /// Resolve a stable entry id. Ids of removed entries resolve to `None`.
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.registry.get(id)
    }

    /// Release `ptr` and remove its entry.
    ///
    /// Fails with `EntryNotFound` (changing nothing) if `ptr` is not
    /// tracked, so a second remove of the same address is caught.
    pub fn remove<P: Address>(&mut self, ptr: P) -> TrackResult<()> {
        let addr = ptr.as_addr();
        let entry = self
            .registry
            .remove(addr)
            .ok_or(TrackError::EntryNotFound(addr))?;
        self.release_entry(entry);
        Ok(())
    }

    /// Stop tracking `ptr` without releasing it, handing ownership back.
    pub fn forget<P: Address>(&mut self, ptr: P) -> Option<NonNull<u8>> {
        let entry = self.registry.remove(ptr.as_addr())?;
        self.tracked_bytes -= entry.size().unwrap_or(0);
        Some(entry.address())
    }

    /// Release every tracked address, returning how many were released.
    ///
    /// Entries are released tail first. The registry is empty and reusable
    /// afterwards.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        while let Some(entry) = self.registry.pop_back() {
            self.release_entry(entry);
            released += 1;
        }

        #[cfg(feature = "log")]
        {
            if released > 0 {
                log::debug!(target: "memtrack", "released {} tracked allocations", released);
            }
        }

        released
    }

    /// Release every tracked address and the manager itself.
    ///
    /// Returns the number of entries released.
    pub fn destroy(mut self) -> usize {
        let released = self.release_all();

        #[cfg(feature = "log")]
        log::debug!(target: "memtrack", "manager destroyed ({} entries released)", released);

        released
    }

    fn release_entry(&mut self, entry: Entry) {
        #[cfg(feature = "debug")]
        {
            if let (true, Some(size)) = (self.config.poison_on_release, entry.size()) {
                // SAFETY: the entry owns at least `size` writable bytes.
                unsafe { crate::debug::poison::poison_freed(entry.as_ptr(), size) };
            }
        }

        // SAFETY: the entry owned this block and has just been unlinked.
        unsafe { self.allocator.release(entry.address()) };

        self.tracked_bytes -= entry.size().unwrap_or(0);
        self.total_released += 1;
    }

    /// Allocate `size` bytes and track them.
    pub fn alloc(&mut self, size: usize, site: &CallSite) -> TrackResult<NonNull<u8>> {
        ops::allocate(size, Mode::Tracked(self), site)
    }

    /// Allocate `count * size` zeroed bytes and track them.
    pub fn zalloc(&mut self, count: usize, size: usize, site: &CallSite) -> TrackResult<NonNull<u8>> {
        ops::zero_allocate(count, size, Mode::Tracked(self), site)
    }

    /// Resize a block, following it in the registry if it is tracked.
    ///
    /// # Safety
    ///
    /// See [`resize`](crate::resize).
    pub unsafe fn realloc(&mut self, ptr: NonNull<u8>, new_size: usize, site: &CallSite) -> TrackResult<NonNull<u8>> {
        ops::resize(ptr, new_size, Mode::Tracked(self), site)
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> Entries<'_> {
        self.registry.iter()
    }

    /// Number of tracked addresses.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// The raw allocator this manager releases through.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// The configuration this manager was created with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Snapshot of the manager's counters.
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            live_entries: self.registry.len(),
            tracked_bytes: self.tracked_bytes,
            peak_entries: self.peak_entries,
            total_registered: self.total_registered,
            total_released: self.total_released,
            relocations: self.relocations,
            failed_registrations: self.failed_registrations,
            total_slots: self.registry.total_slots(),
            free_slots: self.registry.free_slots(),
        }
    }

    /// Render the outstanding entries, oldest first.
    pub fn leak_report(&self) -> String {
        let mut out = String::new();
        if self.is_empty() {
            out.push_str("[memtrack] No outstanding allocations");
            return out;
        }

        let _ = write!(out, "[memtrack] {} outstanding allocation(s)", self.len());
        for entry in self.entries() {
            let _ = write!(out, "\n  {:p}", entry.as_ptr());
            if let Some(size) = entry.size() {
                let _ = write!(out, ", {} bytes", size);
            }
            if let Some(site) = entry.call_site() {
                let _ = write!(out, ", from {}", site);
            }
            #[cfg(feature = "debug")]
            {
                for line in entry.backtrace().lines() {
                    let _ = write!(out, "\n      {}", line);
                }
            }
        }
        out
    }
}

impl<A: RawAllocator> Drop for Manager<A> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<A: RawAllocator> std::fmt::Debug for Manager<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("len", &self.len())
            .field("tracked_bytes", &self.tracked_bytes)
            .field("config", &self.config)
            .finish()
    }
}

/// Create an empty manager over the C heap.
pub fn create_manager() -> TrackResult<Manager> {
    Manager::new()
}

/// Destroy a manager, releasing everything it tracks.
///
/// Fails with `InvalidManager` when no manager is supplied; nothing else is
/// touched in that case.
pub fn destroy_manager<A: RawAllocator>(manager: Option<Manager<A>>) -> TrackResult<()> {
    match manager {
        Some(manager) => {
            manager.destroy();
            Ok(())
        }
        None => Err(TrackError::InvalidManager),
    }
}
