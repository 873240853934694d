//! # memtrack
//!
//! Allocation tracking over the C heap.
//!
//! ## Features
//!
//! - Owning manager: every tracked allocation is registered and released
//!   through one handle
//! - Individual release with double-free detection
//! - Bulk release of everything outstanding
//! - Resize tracking: an entry follows its block across relocation
//! - Explicit untracked mode for plain wrapped calls
//! - One-line failure diagnostics with call-site context
//! - Optional `log` integration, backtraces and memory poisoning
//!
//! ## Quick Start
//!
//! ```rust
//! use memtrack::{mm_alloc, mm_realloc, mm_zalloc, Manager, Mode};
//!
//! let mut manager = Manager::new().unwrap();
//!
//! let a = mm_alloc!(16, Mode::Tracked(&mut manager)).unwrap();
//! let b = mm_zalloc!(8, 4, Mode::Tracked(&mut manager)).unwrap();
//! let a = unsafe { mm_realloc!(a, 64, Mode::Tracked(&mut manager)) }.unwrap();
//!
//! manager.remove(b).unwrap();
//! assert!(manager.contains(a));
//!
//! // Release everything that is left, then the manager itself.
//! assert_eq!(manager.destroy(), 1);
//! ```

pub mod api;
pub mod diagnostics;
pub mod error;

mod allocators;
mod sync;
mod util;

#[cfg(feature = "debug")]
mod debug;

// Re-export public API at crate root for convenience
pub use api::config::ManagerConfig;
pub use api::manager::{create_manager, destroy_manager, Address, Manager};
pub use api::ops::{allocate, resize, zero_allocate, Mode};
pub use api::stats::ManagerStats;

// Raw allocator boundary
pub use allocators::system::{RawAllocator, SystemAllocator};

// Registry entries
pub use allocators::registry::{Entries, Entry, EntryId};

// Diagnostics
pub use diagnostics::{
    CallSite, CollectingSink, Diagnostic, DiagnosticKind, DiagnosticSink, RegistrationCause,
};

// Errors
pub use error::{RawAllocError, TrackError, TrackResult};
