//! Object heap for the built-in runtime
//!
//! Objects live in a slot table addressed by generational `ObjId`s. Each slot
//! carries a reference count; when it drops to zero the object is removed and
//! the references it owned are released in turn. A slot that is reused gets a
//! new generation, so a stale `ObjId` never aliases a newer object.
//!
//! Immortal objects (modules, natives, singletons) are created with a
//! reference the heap keeps for itself and are never collected while the
//! runtime is alive.

use crate::runtime::ObjId;
use crate::vm::value::Object;

struct Slot {
    generation: u32,
    refcount: u32,
    object: Option<Object>,
}

#[derive(Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object with a reference count of one.
    pub fn alloc(&mut self, object: Object) -> ObjId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.refcount = 1;
            slot.object = Some(object);
            return ObjId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            refcount: 1,
            object: Some(object),
        });
        ObjId::new(index, 0)
    }

    fn slot(&self, id: ObjId) -> Option<&Slot> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation() && slot.object.is_some())
    }

    fn slot_mut(&mut self, id: ObjId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation() && slot.object.is_some())
    }

    pub fn get(&self, id: ObjId) -> Option<&Object> {
        self.slot(id).and_then(|slot| slot.object.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut Object> {
        self.slot_mut(id).and_then(|slot| slot.object.as_mut())
    }

    pub fn is_live(&self, id: ObjId) -> bool {
        self.slot(id).is_some()
    }

    pub fn refcount(&self, id: ObjId) -> u32 {
        self.slot(id).map_or(0, |slot| slot.refcount)
    }

    pub fn incref(&mut self, id: ObjId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.refcount += 1;
        }
    }

    /// Drop one reference. Objects reaching zero are collected together with
    /// anything only they kept alive.
    pub fn decref(&mut self, id: ObjId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slot_mut(id) else {
                continue;
            };
            slot.refcount -= 1;
            if slot.refcount > 0 {
                continue;
            }
            if let Some(object) = slot.object.take() {
                pending.extend(object.children());
            }
            self.free.push(id.index());
            self.live -= 1;
        }
    }

    /// Number of live objects.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Drop every object at once (runtime teardown).
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}
