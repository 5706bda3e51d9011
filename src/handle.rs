//! Handle & buffer registry
//!
//! Foreign objects reach the host only as `Handle`s: opaque integers naming a
//! slot in the session's handle table. Each slot owns one runtime reference.
//! Handles are generational, so a released handle never becomes valid again
//! even when its slot is reused.

use std::fmt;

use crate::runtime::{DType, ObjId};

/// Opaque name for a foreign object. Never dereferenced by the host.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    fn new(index: u32, generation: u32) -> Self {
        Handle(((generation as u64) << 32) | index as u64)
    }

    /// Rebuild a handle from its integer form (C ABI).
    pub const fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    fn index(self) -> u32 {
        self.0 as u32
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index(), self.generation())
    }
}

/// Handle of a foreign iterator. Not `Clone`: disposing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct IteratorHandle(pub(crate) Handle);

impl IteratorHandle {
    pub fn handle(&self) -> Handle {
        self.0
    }
}

/// A handle together with the array memory it keeps alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub handle: Handle,
    /// Address of the first element.
    pub data: usize,
    pub byte_len: usize,
    pub dtype: DType,
    pub shape: Vec<usize>,
}

/// Result of `free`. Zero is success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ReleaseStatus {
    Ok = 0,
    /// Unknown or already released handle.
    StaleHandle = 1,
    /// The buffer address does not belong to the handle.
    BufferMismatch = 2,
    /// The runtime was torn down first.
    RuntimeReleased = 3,
}

impl ReleaseStatus {
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            0 => ReleaseStatus::Ok,
            2 => ReleaseStatus::BufferMismatch,
            3 => ReleaseStatus::RuntimeReleased,
            _ => ReleaseStatus::StaleHandle,
        }
    }

    pub fn is_ok(self) -> bool {
        self == ReleaseStatus::Ok
    }
}

/// Iterator progress, tracked per iterator handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterState {
    Created,
    Yielding,
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Object,
    Iterator(IterState),
}

struct Entry {
    generation: u32,
    obj: Option<ObjId>,
    kind: EntryKind,
}

/// Slot table mapping handles to owned runtime references.
#[derive(Default)]
pub(crate) struct HandleTable {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `obj` under a fresh handle.
    pub fn insert(&mut self, obj: ObjId, kind: EntryKind) -> Handle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.generation = entry.generation.wrapping_add(1).max(1);
            entry.obj = Some(obj);
            entry.kind = kind;
            return Handle::new(index, entry.generation);
        }
        let index = self.entries.len() as u32;
        // Generation starts at 1 so the raw value 0 never names a handle.
        self.entries.push(Entry {
            generation: 1,
            obj: Some(obj),
            kind,
        });
        Handle::new(index, 1)
    }

    fn entry(&self, handle: Handle) -> Option<&Entry> {
        self.entries
            .get(handle.index() as usize)
            .filter(|e| e.generation == handle.generation() && e.obj.is_some())
    }

    fn entry_mut(&mut self, handle: Handle) -> Option<&mut Entry> {
        self.entries
            .get_mut(handle.index() as usize)
            .filter(|e| e.generation == handle.generation() && e.obj.is_some())
    }

    pub fn get(&self, handle: Handle) -> Option<ObjId> {
        self.entry(handle).and_then(|e| e.obj)
    }

    pub fn kind(&self, handle: Handle) -> Option<EntryKind> {
        self.entry(handle).map(|e| e.kind)
    }

    pub fn set_kind(&mut self, handle: Handle, kind: EntryKind) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.kind = kind;
        }
    }

    /// Forget a handle, returning the reference it owned.
    pub fn remove(&mut self, handle: Handle) -> Option<ObjId> {
        let entry = self.entry_mut(handle)?;
        let obj = entry.obj.take();
        self.free.push(handle.index());
        self.live -= 1;
        obj
    }

    /// Remove every handle, returning the owned references.
    pub fn drain(&mut self) -> Vec<ObjId> {
        let objs = self.entries.iter_mut().filter_map(|e| e.obj.take()).collect();
        self.free = (0..self.entries.len() as u32).collect();
        self.live = 0;
        objs
    }

    pub fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_raw_round_trip() {
        let handle = Handle::new(7, 3);
        assert_eq!(Handle::from_raw(handle.raw()), handle);
        assert_eq!(handle.to_string(), "#7v3");
    }

    #[test]
    fn test_removed_handle_stays_invalid() {
        let mut table = HandleTable::new();
        let first = table.insert(ObjId::new(1, 0), EntryKind::Object);
        assert_eq!(table.remove(first), Some(ObjId::new(1, 0)));
        assert_eq!(table.remove(first), None);

        let second = table.insert(ObjId::new(2, 0), EntryKind::Object);
        assert_ne!(first, second);
        assert_eq!(table.get(first), None);
        assert_eq!(table.get(second), Some(ObjId::new(2, 0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_zero_is_never_a_handle() {
        let mut table = HandleTable::new();
        let handle = table.insert(ObjId::new(0, 0), EntryKind::Object);
        assert_ne!(handle.raw(), 0);
        assert_eq!(table.get(Handle::from_raw(0)), None);
    }

    #[test]
    fn test_drain_returns_owned_refs() {
        let mut table = HandleTable::new();
        table.insert(ObjId::new(1, 0), EntryKind::Object);
        let iter = table.insert(ObjId::new(2, 0), EntryKind::Iterator(IterState::Created));
        assert_eq!(table.kind(iter), Some(EntryKind::Iterator(IterState::Created)));
        assert_eq!(table.drain().len(), 2);
        assert_eq!(table.len(), 0);
        assert_eq!(table.get(iter), None);
    }
}
