//! Error types for tracked allocation.

use std::fmt;
use std::io;

use thiserror::Error;

/// Failure reported by a raw allocation primitive.
///
/// Carries the `errno` value observed after the failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawAllocError {
    code: i32,
}

impl RawAllocError {
    /// Create an error from an `errno` value.
    pub const fn new(code: i32) -> Self {
        Self { code }
    }

    /// Out of memory (`ENOMEM`).
    pub const fn out_of_memory() -> Self {
        Self::new(libc::ENOMEM)
    }

    /// Capture the calling thread's current `errno`.
    ///
    /// Falls back to `ENOMEM` when the platform left `errno` unset.
    pub fn last_os_error() -> Self {
        match io::Error::last_os_error().raw_os_error() {
            Some(code) if code != 0 => Self::new(code),
            _ => Self::out_of_memory(),
        }
    }

    /// The raw failure code.
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// Resolve the failure code to a human-readable message.
    pub fn message(&self) -> String {
        let full = io::Error::from_raw_os_error(self.code).to_string();
        // io::Error appends " (os error N)"; the diagnostic line carries the code itself.
        match full.rfind(" (os error") {
            Some(idx) => full[..idx].to_string(),
            None => full,
        }
    }
}

impl fmt::Display for RawAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code)
    }
}

impl std::error::Error for RawAllocError {}

/// Errors returned by the manager and the tracked allocation operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackError {
    /// The raw primitive could not satisfy the request.
    #[error("allocation failed: {0}")]
    AllocationFailure(RawAllocError),

    /// The raw allocation succeeded but no registry entry could be created.
    ///
    /// Tracked operations release the raw memory before returning this.
    #[error("allocation succeeded but could not be registered")]
    RegistrationFailure,

    /// No manager was supplied where one is required.
    #[error("no memory manager supplied")]
    InvalidManager,

    /// The address is not present in the registry.
    #[error("address {0:#x} is not tracked by this manager")]
    EntryNotFound(usize),

    /// The address is already present in the registry.
    #[error("address {0:#x} is already tracked by this manager")]
    AlreadyTracked(usize),
}

impl TrackError {
    /// Whether this error came from the raw allocator.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailure(_))
    }
}

impl From<RawAllocError> for TrackError {
    fn from(err: RawAllocError) -> Self {
        Self::AllocationFailure(err)
    }
}

/// Result alias used throughout the crate.
pub type TrackResult<T> = Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_os_suffix() {
        let err = RawAllocError::out_of_memory();
        assert_eq!(err.code(), libc::ENOMEM);
        assert!(!err.message().contains("os error"));
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_track_error_display() {
        let err = TrackError::EntryNotFound(0x1000);
        assert_eq!(err.to_string(), "address 0x1000 is not tracked by this manager");

        let err: TrackError = RawAllocError::out_of_memory().into();
        assert!(err.is_allocation_failure());
        assert!(err.to_string().starts_with("allocation failed: "));
    }
}
