//! Call-site capturing macros.
//!
//! These build a [`CallSite`](crate::CallSite) where they are written and
//! forward to the tracked allocation operations.

/// Capture the current file, function and line as a [`CallSite`](crate::CallSite).
///
/// # Example
///
/// ```rust
/// let site = memtrack::call_site!();
/// assert!(!site.function.is_empty());
/// assert!(site.file.ends_with(".rs"));
/// assert!(site.line > 0);
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __site() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        $crate::CallSite::new(
            ::core::file!(),
            $crate::diagnostics::context::trim_function_name(__type_name_of(__site)),
            ::core::line!(),
        )
    }};
}

/// Tracked or untracked `allocate` with the call-site captured.
///
/// # Example
///
/// ```rust
/// use memtrack::{mm_alloc, Manager, Mode};
///
/// let mut manager = Manager::new().unwrap();
/// let ptr = mm_alloc!(16, Mode::Tracked(&mut manager)).unwrap();
/// assert!(manager.contains(ptr));
/// ```
#[macro_export]
macro_rules! mm_alloc {
    ($size:expr) => {
        $crate::allocate($size, $crate::Mode::untracked(), &$crate::call_site!())
    };
    ($size:expr, $mode:expr) => {
        $crate::allocate($size, $mode, &$crate::call_site!())
    };
}

/// Tracked or untracked `zero_allocate` with the call-site captured.
#[macro_export]
macro_rules! mm_zalloc {
    ($count:expr, $size:expr) => {
        $crate::zero_allocate($count, $size, $crate::Mode::untracked(), &$crate::call_site!())
    };
    ($count:expr, $size:expr, $mode:expr) => {
        $crate::zero_allocate($count, $size, $mode, &$crate::call_site!())
    };
}

/// Tracked or untracked `resize` with the call-site captured.
///
/// Expands to a call of the `unsafe` [`resize`](crate::resize); invoke it
/// inside an `unsafe` block.
#[macro_export]
macro_rules! mm_realloc {
    ($ptr:expr, $size:expr) => {
        $crate::resize($ptr, $size, $crate::Mode::untracked(), &$crate::call_site!())
    };
    ($ptr:expr, $size:expr, $mode:expr) => {
        $crate::resize($ptr, $size, $mode, &$crate::call_site!())
    };
}
