//! Native runtime adapter contract
//!
//! This module describes what the bridge needs from an embedded array
//! runtime. It separates:
//! - Value representation for the boundary (abi.rs)
//! - The adapter trait every runtime implements (this file)
//! - Extern "C" stubs exposing the bridge to native hosts (stubs.rs)
//!
//! The crate ships one implementation, `vm::Engine`. Any other embedded
//! interpreter can be driven by implementing `ForeignRuntime` and booting it
//! through `Lifecycle::with_boot`.

pub mod abi;
pub mod stubs;

pub use abi::{
    ArrayInfo, DType, Exception, ExceptionKind, ForeignResult, ObjId, Primitive, SliceBounds,
};

/// Keyword arguments passed to a foreign call.
pub type Kwargs<'a> = [(&'a str, ObjId)];

/// The embedded runtime's C-level API, as seen by the bridge.
///
/// Implementations are not required to be thread safe beyond `Send`: the
/// bridge holds its execution lock around every method call.
pub trait ForeignRuntime: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Tear the runtime down. No method is called afterwards.
    fn finalize(&mut self);

    /// Import a top-level module by name.
    fn import(&mut self, module: &str) -> ForeignResult<ObjId>;

    /// `getattr(obj, name)`.
    fn getattr(&mut self, obj: ObjId, name: &str) -> ForeignResult<ObjId>;

    /// `callable(*args, **kwargs)`. Arguments are borrowed.
    fn call(&mut self, callable: ObjId, args: &[ObjId], kwargs: &Kwargs<'_>)
    -> ForeignResult<ObjId>;

    /// `obj[key]`.
    fn getitem(&mut self, obj: ObjId, key: ObjId) -> ForeignResult<ObjId>;

    /// `obj[key] = value`.
    fn setitem(&mut self, obj: ObjId, key: ObjId, value: ObjId) -> ForeignResult<()>;

    /// `iter(obj)`.
    fn iter(&mut self, obj: ObjId) -> ForeignResult<ObjId>;

    /// `next(iterator)`, with exhaustion reported as `Ok(None)`.
    fn next(&mut self, iterator: ObjId) -> ForeignResult<Option<ObjId>>;

    /// Convert any array-like object to an array (`asarray`).
    fn as_array(&mut self, obj: ObjId) -> ForeignResult<ObjId>;

    /// Create a new object from an immediate value.
    fn build(&mut self, value: Primitive) -> ForeignResult<ObjId>;

    /// Read an object back as an immediate value. Zero-dimensional arrays
    /// extract as their scalar.
    fn extract(&self, obj: ObjId) -> ForeignResult<Primitive>;

    /// The object's runtime type name.
    fn type_name(&self, obj: ObjId) -> String;

    /// Storage description when `obj` is an array.
    fn array_info(&self, obj: ObjId) -> Option<ArrayInfo>;

    fn incref(&mut self, obj: ObjId);

    fn decref(&mut self, obj: ObjId);

    /// Release the array buffer at `data` owned through `obj`, dropping the
    /// reference. Returns 0 on success.
    fn release_buffer(&mut self, obj: ObjId, data: usize) -> i32;
}
