//! Value representation exchanged across the runtime boundary
//!
//! The bridge never sees the runtime's objects directly. It works with:
//! - `ObjId`: a generational reference to a runtime-owned object
//! - `Primitive`: immediate values the bridge builds or extracts
//! - `DType`: element types of the runtime's n-d arrays
//! - `Exception`: a raised foreign exception (type name + message)
//!
//! Reference rules follow the classic embedding API: every `ObjId` returned
//! from a `ForeignRuntime` method is a new reference owned by the caller and
//! must be released with `decref`. `ObjId`s inside an extracted `Primitive`
//! are borrowed.

use std::fmt;

/// A reference to an object owned by the embedded runtime.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId {
    index: u32,
    generation: u32,
}

impl ObjId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjId({}v{})", self.index, self.generation)
    }
}

/// Element type of a runtime array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int64,
    Float64,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn itemsize(self) -> usize {
        match self {
            DType::Bool => 1,
            DType::Int64 | DType::Float64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int64 => "int64",
            DType::Float64 => "float64",
        }
    }

    /// Parse a dtype name the way the runtime spells it.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "bool" | "bool_" => Some(DType::Bool),
            "int" | "int64" | "long" | "i8" => Some(DType::Int64),
            "float" | "float64" | "double" | "f8" => Some(DType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounds of a slice object. `None` means the bound was not given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SliceBounds {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

/// Immediate values built by, or extracted from, the runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    None,
    /// The "argument not supplied" sentinel. Natives treat it exactly like a
    /// missing argument.
    NoValue,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// When building, the items are consumed (their references move into the
    /// tuple). When extracting, they are borrowed.
    Tuple(Vec<ObjId>),
    Slice(SliceBounds),
}

/// Snapshot of an array object's backing storage.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayInfo {
    pub dtype: DType,
    pub shape: Vec<usize>,
    /// Address of the first element.
    pub data: usize,
    /// Bytes spanned by the logical elements.
    pub nbytes: usize,
}

impl ArrayInfo {
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Foreign exception type, named after the runtime's own classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    TypeError,
    ValueError,
    IndexError,
    KeyError,
    AttributeError,
    StopIteration,
    ZeroDivisionError,
    ModuleNotFoundError,
    OverflowError,
    MemoryError,
    RuntimeError,
}

impl ExceptionKind {
    pub const fn name(self) -> &'static str {
        match self {
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::ModuleNotFoundError => "ModuleNotFoundError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::MemoryError => "MemoryError",
            ExceptionKind::RuntimeError => "RuntimeError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raised foreign exception.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: String,
}

impl Exception {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::IndexError, message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::AttributeError, message)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Exception {}

pub type ForeignResult<T> = Result<T, Exception>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_names_round_trip() {
        for dtype in [DType::Bool, DType::Int64, DType::Float64] {
            assert_eq!(DType::parse(dtype.name()), Some(dtype));
        }
        assert_eq!(DType::parse("complex128"), None);
    }

    #[test]
    fn exception_display_uses_foreign_type_name() {
        let exc = Exception::index_error("index 10 is out of bounds");
        assert_eq!(exc.to_string(), "IndexError: index 10 is out of bounds");
    }
}
