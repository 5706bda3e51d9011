//! Iteration protocol
//!
//! `get_iter` binds a foreign iterator to an array's first axis. Each `next`
//! yields one row (a scalar for 1-d arrays) until the iterator is exhausted;
//! from then on `next` keeps returning `None` without touching the runtime.
//! Iterators are not restartable: create a fresh one to traverse again.
//! Disposal is explicit; `ForeignIter` is a convenience wrapper that
//! disposes on drop.

use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::handle::{EntryKind, Handle, IterState, IteratorHandle};
use crate::interpreter::{Interpreter, Session};
use crate::marshal::{Item, into_item};

fn iter_state(session: &Session, handle: Handle) -> BridgeResult<IterState> {
    match session.handles.kind(handle) {
        Some(EntryKind::Iterator(state)) => Ok(state),
        Some(EntryKind::Object) => Err(BridgeError::type_mismatch(
            "iterator",
            session.runtime.type_name(session.lookup(handle)?),
        )),
        None => Err(BridgeError::InvalidHandle(handle)),
    }
}

impl Interpreter {
    /// Create an iterator over the object behind `handle`. The source handle
    /// stays valid.
    pub fn get_iter(&self, handle: Handle) -> BridgeResult<IteratorHandle> {
        self.with_session(|session| {
            let obj = session.lookup(handle)?;
            let iterator = session
                .runtime
                .iter(obj)
                .map_err(|e| BridgeError::foreign("iter", e))?;
            let handle = session.register(iterator, EntryKind::Iterator(IterState::Created));
            Ok(IteratorHandle(handle))
        })
    }

    /// Advance. `Ok(None)` marks exhaustion.
    pub fn next(self: &Arc<Self>, iterator: &IteratorHandle) -> BridgeResult<Option<Item>> {
        let handle = iterator.handle();
        self.with_session(|session| {
            if iter_state(session, handle)? == IterState::Exhausted {
                return Ok(None);
            }
            let obj = session.lookup(handle)?;
            let next = session
                .runtime
                .next(obj)
                .map_err(|e| BridgeError::foreign("next", e))?;
            let Some(item) = next else {
                session
                    .handles
                    .set_kind(handle, EntryKind::Iterator(IterState::Exhausted));
                return Ok(None);
            };
            session
                .handles
                .set_kind(handle, EntryKind::Iterator(IterState::Yielding));

            into_item(self, session, item, "next").map(Some)
        })
    }

    /// Current state of an iterator.
    pub fn iter_state(&self, iterator: &IteratorHandle) -> BridgeResult<IterState> {
        self.with_session(|session| iter_state(session, iterator.handle()))
    }

    /// Release an iterator in any state.
    pub fn dispose(&self, iterator: IteratorHandle) -> BridgeResult<()> {
        self.dispose_handle(iterator.handle())
    }

    /// Release an iterator named by its raw handle (C ABI).
    pub fn dispose_handle(&self, handle: Handle) -> BridgeResult<()> {
        self.with_session(|session| {
            iter_state(session, handle)?;
            if let Some(obj) = session.handles.remove(handle) {
                session.runtime.decref(obj);
            }
            Ok(())
        })
    }

    /// Iterate `handle` as a Rust iterator.
    pub fn iterate(self: &Arc<Self>, handle: Handle) -> BridgeResult<ForeignIter> {
        let iterator = self.get_iter(handle)?;
        Ok(ForeignIter {
            interpreter: Arc::clone(self),
            iterator: Some(iterator),
        })
    }
}

/// Iterator adapter over a foreign iterator, disposed on drop.
pub struct ForeignIter {
    interpreter: Arc<Interpreter>,
    iterator: Option<IteratorHandle>,
}

impl Iterator for ForeignIter {
    type Item = BridgeResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let iterator = self.iterator.as_ref()?;
        match self.interpreter.next(iterator) {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                // Stop after the first error.
                if let Some(iterator) = self.iterator.take() {
                    let _ = self.interpreter.dispose(iterator);
                }
                Some(Err(e))
            }
        }
    }
}

impl Drop for ForeignIter {
    fn drop(&mut self) {
        if let Some(iterator) = self.iterator.take() {
            if let Err(e) = self.interpreter.dispose(iterator) {
                if !e.is_fatal() {
                    tracing::warn!("failed to dispose iterator: {e}");
                }
            }
        }
    }
}
