//! Build script for memtrack.
//!
//! Warns about feature and target combinations that are unlikely to be what
//! the user wants.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    // --- Debug Features ---
    if debug_enabled && profile == "release" {
        emit_warning("Debug features enabled in release build!");
        emit_note("Every tracked allocation captures a backtrace and released");
        emit_note("memory is poisoned. Consider disabling for production.");
    }

    check_target();
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_note(msg: &str) {
    println!("cargo:warning=[memtrack]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[memtrack] ⚠️  {}", msg);
}

// =============================================================================
// Target checks
// =============================================================================

fn check_target() {
    let target = env::var("TARGET").unwrap_or_default();

    if target.starts_with("wasm32-unknown-unknown") {
        emit_warning("wasm32-unknown-unknown has no C heap");
        emit_note("SystemAllocator needs malloc/calloc/realloc/free from libc.");
        emit_note("Supply your own RawAllocator on this target.");
    }
}
