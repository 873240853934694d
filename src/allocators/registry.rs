//! Registry of tracked addresses.
//!
//! Entries live in a slot arena addressed by generational [`EntryId`]s.
//! Vacant slots are recycled through a free list, an address index gives
//! constant-time lookup, and insertion order is threaded through the slots
//! as an index-linked list so appends and unlinks never scan.

use std::collections::HashMap;
use std::fmt;
use std::ptr::NonNull;

use crate::diagnostics::CallSite;
use crate::error::{RawAllocError, TrackError, TrackResult};

/// Generation counter for id validation.
type Generation = u32;

/// A stable identifier for a registry entry.
///
/// Ids survive relocation of the tracked memory and go stale once the
/// entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    index: u32,
    generation: Generation,
}

impl EntryId {
    /// Get the raw slot index (for debugging).
    pub fn raw_index(&self) -> u32 {
        self.index
    }

    /// Get the generation (for debugging).
    pub fn raw_generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A tracked allocation.
pub struct Entry {
    id: EntryId,
    address: NonNull<u8>,
    size: Option<usize>,
    site: Option<CallSite>,
    #[cfg(feature = "debug")]
    backtrace: String,
}

impl Entry {
    /// The entry's stable id.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The tracked address.
    pub fn address(&self) -> NonNull<u8> {
        self.address
    }

    /// The tracked address as a raw pointer.
    pub fn as_ptr(&self) -> *mut u8 {
        self.address.as_ptr()
    }

    /// The tracked address as an integer.
    pub fn addr(&self) -> usize {
        self.address.as_ptr() as usize
    }

    /// Requested size in bytes, when the registering call knew it.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Where the allocation was registered, if recorded.
    pub fn call_site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }

    /// Backtrace captured at registration.
    #[cfg(feature = "debug")]
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("size", &self.size)
            .field("site", &self.site)
            .finish()
    }
}

/// Internal slot holding at most one entry.
struct Slot {
    entry: Option<Entry>,
    generation: Generation,
    /// Previous slot in insertion order
    prev: Option<u32>,
    /// Next slot in insertion order
    next: Option<u32>,
}

/// Insertion-ordered collection of tracked addresses.
pub(crate) struct Registry {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    by_address: HashMap<usize, u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    max_entries: Option<usize>,
}

impl Registry {
    /// Create a registry with `capacity` slots reserved up front.
    pub fn with_capacity(capacity: usize, max_entries: Option<usize>) -> TrackResult<Self> {
        let mut slots = Vec::new();
        let mut by_address = HashMap::new();
        let capacity = max_entries.map_or(capacity, |max| capacity.min(max));

        slots
            .try_reserve(capacity)
            .map_err(|_| TrackError::AllocationFailure(RawAllocError::out_of_memory()))?;
        by_address
            .try_reserve(capacity)
            .map_err(|_| TrackError::AllocationFailure(RawAllocError::out_of_memory()))?;

        Ok(Self {
            slots,
            free_list: Vec::new(),
            by_address,
            head: None,
            tail: None,
            len: 0,
            max_entries,
        })
    }

    /// Append an entry for `address` at the tail.
    ///
    /// Fails without mutation if the address is already present, the
    /// registry is at its configured limit, or slot storage cannot grow.
    pub fn insert(
        &mut self,
        address: NonNull<u8>,
        size: Option<usize>,
        site: Option<CallSite>,
    ) -> TrackResult<EntryId> {
        let key = address.as_ptr() as usize;
        if self.by_address.contains_key(&key) {
            return Err(TrackError::AlreadyTracked(key));
        }
        if self.max_entries.is_some_and(|max| self.len >= max) {
            return Err(TrackError::RegistrationFailure);
        }
        if self.free_list.is_empty() {
            if self.slots.len() >= u32::MAX as usize {
                return Err(TrackError::RegistrationFailure);
            }
            self.slots
                .try_reserve(1)
                .map_err(|_| TrackError::RegistrationFailure)?;
        }
        self.by_address
            .try_reserve(1)
            .map_err(|_| TrackError::RegistrationFailure)?;

        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    entry: None,
                    generation: 0,
                    prev: None,
                    next: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let tail = self.tail;
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let id = EntryId {
            index,
            generation: slot.generation,
        };
        slot.entry = Some(Entry {
            id,
            address,
            size,
            site,
            #[cfg(feature = "debug")]
            backtrace: crate::debug::backtrace::capture(),
        });
        slot.prev = tail;
        slot.next = None;

        match tail {
            Some(tail) => self.slots[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.by_address.insert(key, index);
        self.len += 1;

        Ok(id)
    }

    /// Look up an entry by address identity.
    pub fn find(&self, addr: usize) -> Option<&Entry> {
        let index = *self.by_address.get(&addr)?;
        self.slots[index as usize].entry.as_ref()
    }

    /// Resolve an id; stale ids resolve to `None`.
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Point the entry tracking `old` at a relocated block.
    ///
    /// Returns `None` (and changes nothing) when `old` is not tracked.
    pub fn relocate(&mut self, old: usize, new: NonNull<u8>, new_size: Option<usize>) -> Option<EntryId> {
        let index = *self.by_address.get(&old)?;
        let new_key = new.as_ptr() as usize;

        if new_key != old {
            self.by_address.remove(&old);
            self.by_address.insert(new_key, index);
        }

        let entry = self.slots[index as usize].entry.as_mut()?;
        entry.address = new;
        if new_size.is_some() {
            entry.size = new_size;
        }
        Some(entry.id)
    }

    /// Unlink and return the entry tracking `addr`.
    pub fn remove(&mut self, addr: usize) -> Option<Entry> {
        let index = self.by_address.remove(&addr)?;
        Some(self.vacate(index))
    }

    /// Unlink and return the most recently appended entry.
    pub fn pop_back(&mut self) -> Option<Entry> {
        let index = self.tail?;
        let entry = self.vacate(index);
        self.by_address.remove(&entry.addr());
        Some(entry)
    }

    /// Detach a slot from the order list and recycle it.
    fn vacate(&mut self, index: u32) -> Entry {
        let slot = &mut self.slots[index as usize];
        let prev = slot.prev.take();
        let next = slot.next.take();
        let entry = slot.entry.take();
        // Bump so outstanding ids go stale immediately.
        slot.generation = slot.generation.wrapping_add(1);

        match prev {
            Some(prev) => self.slots[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next as usize].prev = prev,
            None => self.tail = prev,
        }

        self.free_list.push(index);
        self.len -= 1;

        match entry {
            Some(entry) => entry,
            None => unreachable!("linked slot {} has no entry", index),
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        self.free_list.len()
    }
}

/// Iterator over entries in insertion order.
pub struct Entries<'a> {
    slots: &'a [Slot],
    cursor: Option<u32>,
    remaining: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = &self.slots[self.cursor? as usize];
        self.cursor = slot.next;
        self.remaining -= 1;
        slot.entry.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: usize) -> NonNull<u8> {
        // Fake addresses: the registry never dereferences them.
        NonNull::new((n * 16) as *mut u8).unwrap()
    }

    fn addrs(registry: &Registry) -> Vec<usize> {
        registry.iter().map(|e| e.addr()).collect()
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut registry = Registry::with_capacity(4, None).unwrap();
        for n in 1..=5 {
            registry.insert(addr(n), Some(n), None).unwrap();
        }

        assert_eq!(registry.len(), 5);
        assert_eq!(addrs(&registry), vec![16, 32, 48, 64, 80]);
        assert_eq!(registry.iter().len(), 5);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = Registry::with_capacity(4, None).unwrap();
        registry.insert(addr(1), None, None).unwrap();

        assert_eq!(
            registry.insert(addr(1), None, None),
            Err(TrackError::AlreadyTracked(16))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut registry = Registry::with_capacity(4, None).unwrap();
        for n in 1..=5 {
            registry.insert(addr(n), None, None).unwrap();
        }

        assert!(registry.remove(32).is_some());
        assert_eq!(addrs(&registry), vec![16, 48, 64, 80]);

        assert!(registry.remove(16).is_some());
        assert_eq!(addrs(&registry), vec![48, 64, 80]);

        assert!(registry.remove(80).is_some());
        assert_eq!(addrs(&registry), vec![48, 64]);

        assert!(registry.remove(80).is_none());
        assert!(registry.find(16).is_none());
        assert!(registry.find(48).is_some());
    }

    #[test]
    fn test_stale_ids_and_slot_reuse() {
        let mut registry = Registry::with_capacity(0, None).unwrap();
        let id = registry.insert(addr(1), None, None).unwrap();
        assert_eq!(registry.get(id).map(Entry::addr), Some(16));

        registry.remove(16);
        assert!(registry.get(id).is_none());
        assert_eq!(registry.free_slots(), 1);

        let reused = registry.insert(addr(2), None, None).unwrap();
        assert_eq!(reused.raw_index(), id.raw_index());
        assert_ne!(reused, id);
        assert!(registry.get(id).is_none());
        assert_eq!(registry.total_slots(), 1);
    }

    #[test]
    fn test_relocate_keeps_identity_and_position() {
        let mut registry = Registry::with_capacity(4, None).unwrap();
        registry.insert(addr(1), Some(8), None).unwrap();
        let id = registry.insert(addr(2), Some(8), None).unwrap();
        registry.insert(addr(3), Some(8), None).unwrap();

        assert_eq!(registry.relocate(32, addr(10), Some(64)), Some(id));
        assert!(registry.find(32).is_none());

        let moved = registry.find(160).unwrap();
        assert_eq!(moved.id(), id);
        assert_eq!(moved.size(), Some(64));
        assert_eq!(addrs(&registry), vec![16, 160, 48]);

        assert_eq!(registry.relocate(32, addr(11), None), None);
    }

    #[test]
    fn test_pop_back_drains_tail_first() {
        let mut registry = Registry::with_capacity(4, None).unwrap();
        for n in 1..=3 {
            registry.insert(addr(n), None, None).unwrap();
        }

        let order: Vec<usize> = std::iter::from_fn(|| registry.pop_back().map(|e| e.addr())).collect();
        assert_eq!(order, vec![48, 32, 16]);
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn test_every_entry_has_backtrace() {
        let mut registry = Registry::with_capacity(2, None).unwrap();
        registry.insert(addr(1), None, None).unwrap();
        registry.insert(addr(2), Some(8), None).unwrap();

        assert!(registry.iter().all(|e| !e.backtrace().is_empty()));
    }

    #[test]
    fn test_max_entries() {
        let mut registry = Registry::with_capacity(16, Some(2)).unwrap();
        registry.insert(addr(1), None, None).unwrap();
        registry.insert(addr(2), None, None).unwrap();

        assert_eq!(
            registry.insert(addr(3), None, None),
            Err(TrackError::RegistrationFailure)
        );

        registry.remove(16);
        assert!(registry.insert(addr(3), None, None).is_ok());
    }
}
