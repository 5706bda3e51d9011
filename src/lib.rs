//! numbridge: call into an embedded numerical array runtime
//!
//! The bridge owns a single runtime instance per process (see `lifecycle`).
//! Host code calls foreign functions by dotted path with host values,
//! receives either host scalars or owning array handles, indexes and mutates
//! arrays in place, iterates them, and reads their fields. Every runtime
//! interaction is serialized by the interpreter's execution lock.
//!
//! ```no_run
//! use numbridge::{CallSpec, Index, calls};
//!
//! let interpreter = numbridge::acquire()?;
//! let xs = interpreter.call_as::<i64>(&CallSpec::new("arange").arg(10i64))?;
//! let evens: Vec<i64> = interpreter.get_as(xs.handle(), &Index::Axes(vec![
//!     numbridge::AxisIndex::slice(None, None, Some(2)),
//! ]))?;
//! assert_eq!(evens, vec![0, 2, 4, 6, 8]);
//! let roll = calls::random::randint(&interpreter, 6, None)?;
//! assert!((0..6).contains(&roll));
//! # Ok::<(), numbridge::BridgeError>(())
//! ```

pub mod array;
pub mod calls;
pub mod config;
pub mod error;
pub mod field;
pub mod handle;
pub mod index;
pub mod interpreter;
pub mod iter;
pub mod lifecycle;
pub mod loader;
pub mod marshal;
pub mod runtime;
pub mod stdlib;
pub mod vm;

#[cfg(test)]
mod tests;

pub use array::{ArrayObject, Element, ForeignArray};
pub use config::RuntimeConf;
pub use error::{BridgeError, BridgeResult, IndexFault, InitializationError};
pub use handle::{BufferDescriptor, Handle, IterState, IteratorHandle, ReleaseStatus};
pub use index::{AxisIndex, Index};
pub use interpreter::Interpreter;
pub use iter::ForeignIter;
pub use lifecycle::{Lifecycle, RuntimeState, acquire, release};
pub use marshal::{Arg, CallSpec, FromForeign, HostValue, Item, ResultTag};
pub use runtime::{DType, ExceptionKind};
