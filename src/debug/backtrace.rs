//! Registration backtraces.
//!
//! Each entry remembers the stack that registered it so leak reports can
//! point at the culprit.

/// Capture and render the current stack.
pub fn capture() -> String {
    format!("{:?}", ::backtrace::Backtrace::new())
}
