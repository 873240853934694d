//! Allocation backends.
//!
//! This module contains the raw allocator boundary and the registry.
//! **These are the only modules that should touch the C heap directly.**

pub(crate) mod registry;
pub(crate) mod system;
