//! Manager configuration.

/// Configuration for a [`Manager`](crate::Manager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Registry slots reserved at creation (default: 16)
    pub initial_capacity: usize,

    /// Maximum number of live entries (default: unlimited)
    ///
    /// Registering past the limit fails with `RegistrationFailure`.
    pub max_entries: Option<usize>,

    /// Store the registering call-site on each entry
    pub record_call_sites: bool,

    /// Fill released memory of known size with a poison pattern
    /// (only honored with the `debug` feature)
    pub poison_on_release: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            max_entries: None,
            record_call_sites: true,
            poison_on_release: cfg!(feature = "debug"),
        }
    }
}

impl ManagerConfig {
    /// Create a minimal config: no reservation, no call-site bookkeeping.
    pub fn minimal() -> Self {
        Self {
            initial_capacity: 0,
            max_entries: None,
            record_call_sites: false,
            poison_on_release: false,
        }
    }

    /// Create a config that caps the registry at `max_entries`.
    pub fn bounded(max_entries: usize) -> Self {
        Self::default().with_max_entries(max_entries)
    }

    /// Builder pattern: set initial capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Builder pattern: cap the number of live entries.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Builder pattern: enable or disable call-site recording.
    pub fn with_call_sites(mut self, enabled: bool) -> Self {
        self.record_call_sites = enabled;
        self
    }

    /// Builder pattern: enable or disable poisoning of released memory.
    pub fn with_poison_on_release(mut self, enabled: bool) -> Self {
        self.poison_on_release = enabled;
        self
    }
}
