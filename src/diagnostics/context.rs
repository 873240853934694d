//! Call-site context attached to allocation diagnostics.
//!
//! A [`CallSite`] is built once where the allocation is requested (usually
//! through [`call_site!`](crate::call_site)) and passed down explicitly.

use std::fmt;

/// Originating location of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Source file.
    pub file: &'static str,
    /// Enclosing function path.
    pub function: &'static str,
    /// Source line.
    pub line: u32,
}

impl CallSite {
    /// Create a call-site from its parts.
    pub const fn new(file: &'static str, function: &'static str, line: u32) -> Self {
        Self { file, function, line }
    }

    /// Capture the caller's file and line.
    ///
    /// The function name is not available this way; prefer
    /// [`call_site!`](crate::call_site) when it matters.
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self::new(location.file(), "<unknown>", location.line())
    }

    /// A placeholder for callers that have no location to offer.
    pub const fn unknown() -> Self {
        Self::new("<unknown>", "<unknown>", 0)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}:{}", self.file, self.function, self.line)
    }
}

/// Strip the helper suffix left by [`call_site!`](crate::call_site)'s
/// function-name trick.
#[doc(hidden)]
pub fn trim_function_name(name: &'static str) -> &'static str {
    let name = name.strip_suffix("::__site").unwrap_or(name);
    // Closures show up as `{{closure}}` segments; keep the enclosing fn.
    let mut name = name;
    while let Some(stripped) = name.strip_suffix("::{{closure}}") {
        name = stripped;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let site = CallSite::new("src/main.rs", "main", 42);
        assert_eq!(site.to_string(), "src/main.rs @ main:42");
    }

    #[test]
    fn test_caller() {
        let site = CallSite::caller();
        assert!(site.file.ends_with("context.rs"));
        assert!(site.line > 0);
    }

    #[test]
    fn test_macro_captures_function() {
        let site = crate::call_site!();
        assert!(site.function.ends_with("test_macro_captures_function"));
        assert!(site.file.ends_with("context.rs"));
    }

    #[test]
    fn test_macro_inside_nested_fn() {
        fn inner() -> CallSite {
            crate::call_site!()
        }

        let site = inner();
        assert!(site.function.ends_with("test_macro_inside_nested_fn::inner"));
        assert!(site.file.ends_with(".rs"));
        assert!(site.line > 0);
    }

    #[test]
    fn test_trim_function_name() {
        assert_eq!(trim_function_name("a::b::__site"), "a::b");
        assert_eq!(trim_function_name("a::b::{{closure}}::__site"), "a::b");
        assert_eq!(trim_function_name("plain"), "plain");
    }
}
