//! The running bridge
//!
//! An `Interpreter` owns the embedded runtime together with the handle table.
//! Both sit behind one mutex, the execution lock: every operation that
//! touches the runtime (calls, indexing, iteration, field reads, `free`)
//! holds it for its whole duration, so foreign state is only ever mutated by
//! one thread at a time.

use parking_lot::Mutex;

use crate::error::{BridgeError, BridgeResult};
use crate::handle::{BufferDescriptor, EntryKind, Handle, HandleTable, ReleaseStatus};
use crate::runtime::{ExceptionKind, ForeignResult, ForeignRuntime, ObjId};

pub(crate) struct Session {
    pub runtime: Box<dyn ForeignRuntime>,
    pub handles: HandleTable,
    root: String,
}

impl Session {
    /// The runtime reference behind a handle (borrowed).
    pub fn lookup(&self, handle: Handle) -> BridgeResult<ObjId> {
        self.handles
            .get(handle)
            .ok_or(BridgeError::InvalidHandle(handle))
    }

    /// Hand ownership of `obj` to a new handle.
    pub fn register(&mut self, obj: ObjId, kind: EntryKind) -> Handle {
        let handle = self.handles.insert(obj, kind);
        tracing::debug!(%handle, ?obj, "registered handle");
        handle
    }

    pub fn decref_all(&mut self, objs: impl IntoIterator<Item = ObjId>) {
        for obj in objs {
            self.runtime.decref(obj);
        }
    }

    /// Resolve a dotted path. The first segment names a top-level module;
    /// when no such module exists it is looked up on the root module instead.
    pub fn resolve(&mut self, path: &str) -> ForeignResult<ObjId> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = match self.runtime.import(first) {
            Ok(module) => module,
            Err(e) if e.kind == ExceptionKind::ModuleNotFoundError && first != self.root => {
                tracing::debug!(path, root = %self.root, "resolving against root module");
                let root = self.runtime.import(&self.root)?;
                let attr = self.runtime.getattr(root, first);
                self.runtime.decref(root);
                attr?
            }
            Err(e) => return Err(e),
        };
        for segment in segments {
            let next = self.runtime.getattr(current, segment);
            self.runtime.decref(current);
            current = next?;
        }
        Ok(current)
    }

    /// Release the buffer owned through `handle`.
    pub fn release_buffer(&mut self, handle: Handle, data: usize) -> ReleaseStatus {
        let Some(obj) = self.handles.get(handle) else {
            return ReleaseStatus::StaleHandle;
        };
        let status = ReleaseStatus::from_code(self.runtime.release_buffer(obj, data));
        if status.is_ok() {
            self.handles.remove(handle);
        }
        status
    }
}

pub struct Interpreter {
    session: Mutex<Option<Session>>,
    runtime_name: &'static str,
    root: String,
}

impl Interpreter {
    /// Wrap an initialized runtime. `root_module` is the module unqualified
    /// call paths fall back to.
    pub fn new(runtime: Box<dyn ForeignRuntime>, root_module: impl Into<String>) -> Self {
        let root = root_module.into();
        let runtime_name = runtime.name();
        Self {
            session: Mutex::new(Some(Session {
                runtime,
                handles: HandleTable::new(),
                root: root.clone(),
            })),
            runtime_name,
            root,
        }
    }

    pub fn runtime_name(&self) -> &'static str {
        self.runtime_name
    }

    pub fn root_module(&self) -> &str {
        &self.root
    }

    /// Run `op` under the execution lock.
    pub(crate) fn with_session<R>(
        &self,
        op: impl FnOnce(&mut Session) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        let mut guard = self.session.lock();
        match guard.as_mut() {
            Some(session) => op(session),
            None => Err(BridgeError::Released),
        }
    }

    pub fn is_released(&self) -> bool {
        self.session.lock().is_none()
    }

    /// Number of handles currently registered.
    pub fn live_handles(&self) -> usize {
        self.session.lock().as_ref().map_or(0, |s| s.handles.len())
    }

    /// Release the buffer behind `handle`. A second `free` of the same handle
    /// reports `StaleHandle`.
    pub fn free(&self, handle: Handle, data: usize) -> ReleaseStatus {
        let mut guard = self.session.lock();
        let status = match guard.as_mut() {
            Some(session) => session.release_buffer(handle, data),
            None => ReleaseStatus::RuntimeReleased,
        };
        tracing::trace!(%handle, ?status, "free");
        status
    }

    /// Drop a handle that carries no buffer (scalars, iterators, other
    /// objects).
    pub fn release(&self, handle: Handle) -> BridgeResult<()> {
        self.with_session(|session| {
            let obj = session
                .handles
                .remove(handle)
                .ok_or(BridgeError::InvalidHandle(handle))?;
            session.runtime.decref(obj);
            Ok(())
        })
    }

    /// Buffer description of an array handle.
    pub fn buffer(&self, handle: Handle) -> BridgeResult<BufferDescriptor> {
        self.with_session(|session| {
            let obj = session.lookup(handle)?;
            let info = session.runtime.array_info(obj).ok_or_else(|| {
                BridgeError::type_mismatch("ndarray", session.runtime.type_name(obj))
            })?;
            Ok(BufferDescriptor {
                handle,
                data: info.data,
                byte_len: info.nbytes,
                dtype: info.dtype,
                shape: info.shape,
            })
        })
    }

    /// Runtime type name of the object behind `handle`.
    pub fn type_name(&self, handle: Handle) -> BridgeResult<String> {
        self.with_session(|session| {
            let obj = session.lookup(handle)?;
            Ok(session.runtime.type_name(obj))
        })
    }

    /// Tear the runtime down. Outstanding handles become invalid.
    pub(crate) fn shutdown(&self) {
        let Some(mut session) = self.session.lock().take() else {
            return;
        };
        let outstanding = session.handles.drain();
        if !outstanding.is_empty() {
            tracing::debug!(count = outstanding.len(), "dropping outstanding handles");
        }
        session.decref_all(outstanding);
        session.runtime.finalize();
        tracing::info!(runtime = self.runtime_name, "runtime finalized");
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("runtime", &self.runtime_name)
            .field("root", &self.root)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
