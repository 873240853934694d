//! Synchronization primitives.
//!
//! Only the diagnostic sink registry is shared between threads; managers
//! themselves are single-threaded.

pub(crate) mod mutex;
