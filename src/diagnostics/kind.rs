//! Allocation failure diagnostics.

use std::fmt;

use super::context::CallSite;
use crate::error::RawAllocError;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The raw allocator refused the request.
    AllocationFailure,
    /// The allocation succeeded but could not be registered and was released.
    RegistrationFailure,
}

impl DiagnosticKind {
    /// Short label used in log output.
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::AllocationFailure => "allocation failure",
            DiagnosticKind::RegistrationFailure => "registration failure",
        }
    }
}

/// Why a fresh allocation could not be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationCause {
    /// The manager's `max_entries` limit was reached.
    LimitReached(usize),
    /// Registry storage could not grow.
    OutOfMemory,
}

/// One failure report.
///
/// Renders as the fixed line
/// `Error (<file> @ <func>:<line> <code>) - <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Kind of failure.
    pub kind: DiagnosticKind,
    /// Where the request came from.
    pub site: CallSite,
    /// Failure code from the raw primitive.
    pub code: i32,
    /// Resolved human-readable message.
    pub message: String,
    /// Requested size in bytes, when known.
    pub size: Option<usize>,
}

impl Diagnostic {
    /// Diagnostic for a failed raw allocation.
    pub fn allocation_failure(site: CallSite, err: RawAllocError) -> Self {
        Self {
            kind: DiagnosticKind::AllocationFailure,
            site,
            code: err.code(),
            message: err.message(),
            size: None,
        }
    }

    /// Diagnostic for an allocation that could not be registered.
    pub fn registration_failure(site: CallSite, cause: RegistrationCause) -> Self {
        let (code, message) = match cause {
            RegistrationCause::LimitReached(max) => {
                (libc::ENOSPC, format!("registry limit of {} entries reached", max))
            }
            RegistrationCause::OutOfMemory => {
                let err = RawAllocError::out_of_memory();
                (err.code(), format!("{} (registry entry)", err.message()))
            }
        };
        Self {
            kind: DiagnosticKind::RegistrationFailure,
            site,
            code,
            message,
            size: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error ({} @ {}:{} {}) - {}",
            self.site.file, self.site.function, self.site.line, self.code, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let site = CallSite::new("main.c", "main", 17);
        let diag = Diagnostic {
            kind: DiagnosticKind::AllocationFailure,
            site,
            code: 12,
            message: "Cannot allocate memory".to_string(),
            size: None,
        };

        assert_eq!(
            diag.to_string(),
            "Error (main.c @ main:17 12) - Cannot allocate memory"
        );
    }

    #[test]
    fn test_allocation_failure_resolves_message() {
        let site = CallSite::new("lib.rs", "f", 1);
        let diag = Diagnostic::allocation_failure(site, RawAllocError::out_of_memory());

        assert_eq!(diag.code, libc::ENOMEM);
        assert_eq!(diag.message, RawAllocError::out_of_memory().message());
        assert_eq!(diag.size, None);
        assert!(diag.to_string().starts_with("Error (lib.rs @ f:1 "));
    }

    #[test]
    fn test_registration_failure_names_cause() {
        let site = CallSite::new("lib.rs", "f", 2);

        let capped = Diagnostic::registration_failure(site, RegistrationCause::LimitReached(4));
        assert_eq!(capped.code, libc::ENOSPC);
        assert_eq!(capped.message, "registry limit of 4 entries reached");

        let starved = Diagnostic::registration_failure(site, RegistrationCause::OutOfMemory);
        assert_eq!(starved.code, libc::ENOMEM);
        assert!(starved.message.ends_with("(registry entry)"));
    }
}
