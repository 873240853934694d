//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, logs, or custom sinks.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::context::CallSite;
use super::kind::{Diagnostic, RegistrationCause};
use crate::error::RawAllocError;
use crate::sync::mutex::Mutex;

/// Global flag to suppress stderr output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Global flag to enable verbose diagnostics.
static VERBOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Installed sinks.
static SINKS: Mutex<Vec<Arc<dyn DiagnosticSink>>> = Mutex::new(Vec::new());

/// Suppress stderr output. Sinks and the `log` backend still receive diagnostics.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Enable verbose diagnostic output.
pub fn set_verbose(verbose: bool) {
    VERBOSE_DIAGNOSTICS.store(verbose, Ordering::Relaxed);
}

/// Check if stderr output is suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE_DIAGNOSTICS.load(Ordering::Relaxed)
}

/// Route diagnostics to `sink` in addition to stderr.
pub fn add_sink(sink: Arc<dyn DiagnosticSink>) {
    SINKS.lock().push(sink);
}

/// Remove one installed sink, matched by identity.
///
/// Returns whether the sink was installed.
pub fn remove_sink(sink: &Arc<dyn DiagnosticSink>) -> bool {
    let target = Arc::as_ptr(sink) as *const ();
    let mut sinks = SINKS.lock();
    let before = sinks.len();
    sinks.retain(|s| Arc::as_ptr(s) as *const () != target);
    sinks.len() != before
}

/// Install `sink` until the returned guard is dropped.
#[must_use = "the sink is removed as soon as the guard is dropped"]
pub fn scoped_sink(sink: Arc<dyn DiagnosticSink>) -> SinkGuard {
    add_sink(sink.clone());
    SinkGuard { sink }
}

/// Removes its sink on drop. Returned by [`scoped_sink`].
pub struct SinkGuard {
    sink: Arc<dyn DiagnosticSink>,
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        remove_sink(&self.sink);
    }
}

/// Remove every installed sink.
pub fn clear_sinks() {
    SINKS.lock().clear();
}

/// Emit a diagnostic.
///
/// Writes the fixed one-line format to stderr unless suppressed, then hands
/// the diagnostic to every installed sink and the `log` backend. Never fails.
pub fn emit(diag: &Diagnostic) {
    if !is_suppressed() {
        emit_to_stderr(diag);
    }

    // Snapshot so a sink may itself install sinks without deadlocking.
    let sinks = SINKS.lock().clone();
    for sink in &sinks {
        sink.emit(diag);
    }

    #[cfg(feature = "log")]
    emit_to_log(diag);
}

/// Report a failed raw allocation.
pub fn report_allocation_failure(site: &CallSite, err: RawAllocError, size: Option<usize>) {
    let mut diag = Diagnostic::allocation_failure(*site, err);
    diag.size = size;
    emit(&diag);
}

/// Report an allocation that was released because it could not be registered.
pub fn report_registration_failure(site: &CallSite, cause: RegistrationCause, size: Option<usize>) {
    let mut diag = Diagnostic::registration_failure(*site, cause);
    diag.size = size;
    emit(&diag);
}

/// Internal: emit to stderr.
fn emit_to_stderr(diag: &Diagnostic) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", stderr_line(diag, is_verbose()));
}

/// The single line written for `diag`.
///
/// Verbose output appends the requested size after the fixed format, on
/// the same line.
fn stderr_line(diag: &Diagnostic, verbose: bool) -> String {
    match (verbose, diag.size) {
        (true, Some(size)) => format!(
            "{} [requested {}]",
            diag,
            crate::util::size::format_bytes(size)
        ),
        _ => diag.to_string(),
    }
}

/// Emit a diagnostic using the log crate.
#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic) {
    log::error!(target: "memtrack", "{}: {}", diag.kind.label(), diag);
}

/// Initialize output switches from the environment.
///
/// Checks the `MEMTRACK_DIAGNOSTICS` environment variable:
/// - "0", "off" or "quiet" -> suppress stderr output
/// - "1" or "on" -> emit to stderr
/// - "verbose" -> emit to stderr with the requested size
pub fn init_from_env() {
    if let Ok(val) = std::env::var("MEMTRACK_DIAGNOSTICS") {
        match val.to_lowercase().as_str() {
            "0" | "off" | "quiet" | "false" => suppress_diagnostics(true),
            "1" | "on" | "true" => {
                suppress_diagnostics(false);
                set_verbose(false);
            }
            "verbose" | "2" => {
                suppress_diagnostics(false);
                set_verbose(true);
            }
            _ => {}
        }
    }
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic);
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Diagnostics raised from the given function.
    pub fn from_function(&self, function: &str) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.site.function == function)
            .cloned()
            .collect()
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic) {
        self.diagnostics.lock().push(diag.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        let site = CallSite::new("emit.rs", "test_collecting_sink", 1);
        sink.emit(&Diagnostic::allocation_failure(site, RawAllocError::out_of_memory()));

        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.from_function("test_collecting_sink").len(), 1);
        assert!(sink.from_function("elsewhere").is_empty());

        sink.clear();
        assert_eq!(sink.diagnostics().len(), 0);
    }

    #[test]
    fn test_installed_sink_receives_reports() {
        let sink = Arc::new(CollectingSink::new());
        let _guard = scoped_sink(sink.clone());

        let site = CallSite::new("emit.rs", "test_installed_sink_receives_reports", 7);
        report_allocation_failure(&site, RawAllocError::out_of_memory(), Some(32));

        let seen = sink.from_function("test_installed_sink_receives_reports");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].size, Some(32));
        assert_eq!(seen[0].site.line, 7);
    }

    #[test]
    fn test_scoped_sink_is_removed_on_drop() {
        let sink = Arc::new(CollectingSink::new());
        let site = CallSite::new("emit.rs", "test_scoped_sink_is_removed_on_drop", 9);

        {
            let _guard = scoped_sink(sink.clone());
            report_allocation_failure(&site, RawAllocError::out_of_memory(), None);
        }
        report_allocation_failure(&site, RawAllocError::out_of_memory(), None);

        assert_eq!(sink.from_function(site.function).len(), 1);
    }

    #[test]
    fn test_remove_sink_reports_membership() {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(CollectingSink::new());
        add_sink(sink.clone());

        assert!(remove_sink(&sink));
        assert!(!remove_sink(&sink));
    }

    #[test]
    fn test_stderr_line_is_single_line() {
        let site = CallSite::new("emit.rs", "f", 3);
        let mut diag = Diagnostic::allocation_failure(site, RawAllocError::out_of_memory());
        diag.size = Some(2048);

        let plain = stderr_line(&diag, false);
        assert_eq!(plain, diag.to_string());

        let verbose = stderr_line(&diag, true);
        assert!(!verbose.contains('\n'));
        assert!(verbose.starts_with(&plain));
        assert!(verbose.ends_with(" [requested 2.00 KB]"));
    }

    #[test]
    fn test_verbose_without_size_is_plain() {
        let site = CallSite::new("emit.rs", "f", 4);
        let diag = Diagnostic::allocation_failure(site, RawAllocError::out_of_memory());
        assert_eq!(stderr_line(&diag, true), diag.to_string());
    }

    #[test]
    fn test_suppression_flag() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }
}
