//! Public API for memtrack.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with types from this module.

pub mod config;
pub mod manager;
pub mod ops;
pub mod stats;
