//! Owning handle values for foreign arrays
//!
//! An `ArrayObject` keeps one foreign array alive. Dropping it frees the
//! buffer through the registry; `into_raw` gives up ownership instead, after
//! which whoever holds the `BufferDescriptor` must call `free` exactly once.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::handle::{BufferDescriptor, Handle, ReleaseStatus};
use crate::interpreter::Interpreter;
use crate::marshal::{FromForeign, HostValue, ResultTag, coerce};
use crate::runtime::{ArrayInfo, DType};

/// Host element types with a matching foreign dtype.
pub trait Element: Copy + Send + Sync + 'static {
    const DTYPE: DType;

    fn from_values(value: HostValue) -> BridgeResult<Vec<Self>>;
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;

    fn from_values(value: HostValue) -> BridgeResult<Vec<Self>> {
        Vec::<f64>::from_host(value)
    }
}

impl Element for i64 {
    const DTYPE: DType = DType::Int64;

    fn from_values(value: HostValue) -> BridgeResult<Vec<Self>> {
        Vec::<i64>::from_host(value)
    }
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn from_values(value: HostValue) -> BridgeResult<Vec<Self>> {
        Vec::<bool>::from_host(value)
    }
}

fn values_tag(dtype: DType) -> ResultTag {
    match dtype {
        DType::Bool => ResultTag::Bools,
        DType::Int64 => ResultTag::Ints,
        DType::Float64 => ResultTag::Floats,
    }
}

pub struct ArrayObject {
    interpreter: Arc<Interpreter>,
    buffer: BufferDescriptor,
    owned: bool,
}

impl ArrayObject {
    pub(crate) fn new(interpreter: Arc<Interpreter>, handle: Handle, info: ArrayInfo) -> Self {
        Self {
            interpreter,
            buffer: BufferDescriptor {
                handle,
                data: info.data,
                byte_len: info.nbytes,
                dtype: info.dtype,
                shape: info.shape,
            },
            owned: true,
        }
    }

    pub fn handle(&self) -> Handle {
        self.buffer.handle
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.buffer.shape
    }

    pub fn ndim(&self) -> usize {
        self.buffer.shape.len()
    }

    pub fn len(&self) -> usize {
        self.buffer.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.buffer
    }

    pub fn interpreter(&self) -> &Arc<Interpreter> {
        &self.interpreter
    }

    /// Elements in row-major order, as host values.
    pub fn values(&self) -> BridgeResult<HostValue> {
        let handle = self.buffer.handle;
        let tag = values_tag(self.buffer.dtype);
        self.interpreter.with_session(|session| {
            let obj = session.lookup(handle)?;
            coerce(session, obj, tag)
        })
    }

    /// Elements as `T`. Fails when `T` does not match the array's dtype.
    pub fn to_vec<T: Element>(&self) -> BridgeResult<Vec<T>> {
        self.check_dtype::<T>()?;
        T::from_values(self.values()?)
    }

    fn check_dtype<T: Element>(&self) -> BridgeResult<()> {
        if self.buffer.dtype == T::DTYPE {
            Ok(())
        } else {
            Err(BridgeError::type_mismatch(
                T::DTYPE.name(),
                self.buffer.dtype.name(),
            ))
        }
    }

    /// View this array as an array of `T`.
    pub fn typed<T: Element>(self) -> BridgeResult<ForeignArray<T>> {
        self.check_dtype::<T>()?;
        Ok(ForeignArray {
            inner: self,
            _element: PhantomData,
        })
    }

    /// Release now, reporting the status.
    pub fn free(mut self) -> BridgeResult<()> {
        self.owned = false;
        let status = self.interpreter.free(self.buffer.handle, self.buffer.data);
        if status.is_ok() {
            Ok(())
        } else {
            Err(BridgeError::Release {
                handle: self.buffer.handle,
                status: status.code(),
            })
        }
    }

    /// Give up ownership. The buffer stays alive until `free` is called with
    /// the returned descriptor.
    pub fn into_raw(mut self) -> BufferDescriptor {
        self.owned = false;
        self.buffer.clone()
    }
}

impl fmt::Debug for ArrayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayObject")
            .field("handle", &self.buffer.handle)
            .field("dtype", &self.buffer.dtype)
            .field("shape", &self.buffer.shape)
            .finish()
    }
}

impl Drop for ArrayObject {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        let status = self.interpreter.free(self.buffer.handle, self.buffer.data);
        // After teardown the runtime already reclaimed everything.
        if !status.is_ok() && status != ReleaseStatus::RuntimeReleased {
            tracing::warn!(handle = %self.buffer.handle, ?status, "failed to release array");
        }
    }
}

/// An `ArrayObject` whose dtype is known to match `T`.
pub struct ForeignArray<T: Element> {
    inner: ArrayObject,
    _element: PhantomData<T>,
}

impl<T: Element> ForeignArray<T> {
    pub fn handle(&self) -> Handle {
        self.inner.handle()
    }

    pub fn shape(&self) -> &[usize] {
        self.inner.shape()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn to_vec(&self) -> BridgeResult<Vec<T>> {
        T::from_values(self.inner.values()?)
    }

    pub fn as_object(&self) -> &ArrayObject {
        &self.inner
    }

    pub fn into_object(self) -> ArrayObject {
        self.inner
    }

    pub fn free(self) -> BridgeResult<()> {
        self.inner.free()
    }

    pub fn into_raw(self) -> BufferDescriptor {
        self.inner.into_raw()
    }
}

impl<T: Element> fmt::Debug for ForeignArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
