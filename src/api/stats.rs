//! Manager statistics.

use crate::util::size::format_bytes;

/// Counters describing a manager's registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Entries currently tracked.
    pub live_entries: usize,

    /// Sum of the known sizes of live entries.
    pub tracked_bytes: usize,

    /// Highest number of simultaneously live entries.
    pub peak_entries: usize,

    /// Entries ever registered.
    pub total_registered: u64,

    /// Entries released through remove, release-all, or destruction.
    pub total_released: u64,

    /// Tracked resizes that moved an entry to a new address.
    pub relocations: u64,

    /// Registrations refused after the raw allocation succeeded.
    pub failed_registrations: u64,

    /// Slots in the registry arena.
    pub total_slots: usize,

    /// Vacant slots awaiting reuse.
    pub free_slots: usize,
}

impl ManagerStats {
    /// Entries handed back to the caller without being released.
    pub fn forgotten(&self) -> u64 {
        self.total_registered
            .saturating_sub(self.total_released)
            .saturating_sub(self.live_entries as u64)
    }
}

impl std::fmt::Display for ManagerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Manager Statistics:")?;
        writeln!(f, "  Live entries:   {}", self.live_entries)?;
        writeln!(f, "  Tracked bytes:  {}", format_bytes(self.tracked_bytes))?;
        writeln!(f, "  Peak entries:   {}", self.peak_entries)?;
        writeln!(f, "  Registered:     {}", self.total_registered)?;
        writeln!(f, "  Released:       {}", self.total_released)?;
        writeln!(f, "  Relocations:    {}", self.relocations)?;
        writeln!(f, "  Failed:         {}", self.failed_registrations)?;
        write!(f, "  Slots:          {} ({} free)", self.total_slots, self.free_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forgotten() {
        let stats = ManagerStats {
            live_entries: 2,
            total_registered: 10,
            total_released: 5,
            ..ManagerStats::default()
        };
        assert_eq!(stats.forgotten(), 3);
    }

    #[test]
    fn test_display() {
        let stats = ManagerStats {
            live_entries: 1,
            tracked_bytes: 2048,
            ..ManagerStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("Live entries:   1"));
        assert!(text.contains("2.00 KB"));
    }
}
