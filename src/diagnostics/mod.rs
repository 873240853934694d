//! Allocation failure diagnostics.
//!
//! This module provides:
//! - **Call-site context**: where an allocation was requested
//! - **Failure reports**: one fixed-format line per failed allocation
//! - **Output routing**: stderr, custom sinks, and the `log` crate
//!
//! ## Format
//!
//! ```text
//! Error (<file> @ <function>:<line> <code>) - <message>
//! ```
//!
//! Reports are purely observational. Every failure is also returned to the
//! caller as an `Err`; never parse diagnostic text to detect one.

pub mod context;
pub mod emit;
pub mod kind;
pub mod macros;

pub use context::CallSite;
pub use emit::{
    add_sink, clear_sinks, emit, init_from_env, remove_sink, report_allocation_failure,
    report_registration_failure, scoped_sink, set_verbose, suppress_diagnostics, CollectingSink,
    DiagnosticSink, SinkGuard,
};
pub use kind::{Diagnostic, DiagnosticKind, RegistrationCause};
