//! Indexing & mutation protocol
//!
//! `get` and `set` address elements of a foreign array either by one integer
//! per axis or by per-axis specifiers (integer, full slice, strided slice,
//! fancy index). Rank and zero-step mistakes are caught before the runtime is
//! entered, so they surface as distinct `IndexFault`s.

use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult, IndexFault};
use crate::handle::Handle;
use crate::interpreter::{Interpreter, Session};
use crate::marshal::{FromForeign, HostValue, Item, coerce, into_item, to_foreign};
use crate::runtime::{Exception, ExceptionKind, ObjId, Primitive, SliceBounds};

/// One axis of an index expression.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisIndex {
    /// A single position; the axis is dropped from the result.
    At(i64),
    /// `:`
    Full,
    /// `start:stop:step` with Python semantics.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// Integer positions.
    Fancy(Vec<i64>),
    /// Boolean mask over the axis.
    Mask(Vec<bool>),
    /// A foreign array used as the index: an integer array of any shape,
    /// whose shape replaces the indexed axis, or a one-dimensional mask.
    FancyArray(Handle),
}

impl AxisIndex {
    pub fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        AxisIndex::Slice { start, stop, step }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Index {
    /// One integer per axis; must match the array's rank exactly.
    Offsets(Vec<i64>),
    /// Per-axis specifiers; trailing axes default to `:`.
    Axes(Vec<AxisIndex>),
}

impl From<Vec<i64>> for Index {
    fn from(offsets: Vec<i64>) -> Self {
        Index::Offsets(offsets)
    }
}

impl From<&[i64]> for Index {
    fn from(offsets: &[i64]) -> Self {
        Index::Offsets(offsets.to_vec())
    }
}

impl From<Vec<AxisIndex>> for Index {
    fn from(axes: Vec<AxisIndex>) -> Self {
        Index::Axes(axes)
    }
}

impl Index {
    /// Check the expression against an array of rank `ndim`.
    pub fn validate(&self, ndim: usize) -> Result<(), IndexFault> {
        match self {
            Index::Offsets(offsets) if offsets.len() != ndim => Err(IndexFault::Rank {
                expected: ndim,
                found: offsets.len(),
            }),
            Index::Offsets(_) => Ok(()),
            Index::Axes(axes) => {
                if axes.len() > ndim {
                    return Err(IndexFault::Rank {
                        expected: ndim,
                        found: axes.len(),
                    });
                }
                if axes
                    .iter()
                    .any(|a| matches!(a, AxisIndex::Slice { step: Some(0), .. }))
                {
                    return Err(IndexFault::ZeroStep);
                }
                Ok(())
            }
        }
    }
}

fn build(session: &mut Session, primitive: Primitive) -> BridgeResult<ObjId> {
    session
        .runtime
        .build(primitive)
        .map_err(|e| BridgeError::foreign("<index>", e))
}

fn axis_key(session: &mut Session, axis: &AxisIndex) -> BridgeResult<ObjId> {
    match axis {
        AxisIndex::At(i) => build(session, Primitive::Int(*i)),
        AxisIndex::Full => build(session, Primitive::Slice(SliceBounds::default())),
        AxisIndex::Slice { start, stop, step } => build(
            session,
            Primitive::Slice(SliceBounds {
                start: *start,
                stop: *stop,
                step: *step,
            }),
        ),
        AxisIndex::Fancy(positions) => to_foreign(session, &HostValue::Ints(positions.clone())),
        AxisIndex::Mask(mask) => to_foreign(session, &HostValue::Bools(mask.clone())),
        AxisIndex::FancyArray(handle) => to_foreign(session, &HostValue::Handle(*handle)),
    }
}

/// Build the runtime key object (a tuple, one item per axis).
fn key(session: &mut Session, index: &Index) -> BridgeResult<ObjId> {
    let mut items = Vec::new();
    let outcome = (|| -> BridgeResult<()> {
        match index {
            Index::Offsets(offsets) => {
                for &offset in offsets {
                    items.push(build(session, Primitive::Int(offset))?);
                }
            }
            Index::Axes(axes) => {
                for axis in axes {
                    items.push(axis_key(session, axis)?);
                }
            }
        }
        Ok(())
    })();
    match outcome {
        Ok(()) => build(session, Primitive::Tuple(items)),
        Err(e) => {
            session.decref_all(items);
            Err(e)
        }
    }
}

/// Validate `index` against the array behind `handle`.
fn target(session: &Session, handle: Handle, index: &Index) -> BridgeResult<ObjId> {
    let obj = session.lookup(handle)?;
    let info = session.runtime.array_info(obj).ok_or_else(|| {
        BridgeError::type_mismatch("ndarray", session.runtime.type_name(obj))
    })?;
    index.validate(info.ndim())?;
    Ok(obj)
}

fn index_error(operation: &str, exception: Exception) -> BridgeError {
    match exception.kind {
        ExceptionKind::IndexError => IndexFault::OutOfRange(exception.message).into(),
        ExceptionKind::ValueError if exception.message.contains("step") => {
            IndexFault::ZeroStep.into()
        }
        ExceptionKind::ValueError if operation == "setitem" => {
            IndexFault::Shape(exception.message).into()
        }
        _ => BridgeError::foreign(operation, exception),
    }
}

/// `array[index]` as a new reference.
fn getitem(session: &mut Session, handle: Handle, index: &Index) -> BridgeResult<ObjId> {
    let obj = target(session, handle, index)?;
    let key = key(session, index)?;
    let result = session.runtime.getitem(obj, key);
    session.runtime.decref(key);
    result.map_err(|e| index_error("getitem", e))
}

impl Interpreter {
    /// Read `array[index]`. Integer-only indices give a scalar; any slice or
    /// fancy component gives a new array.
    pub fn get(self: &Arc<Self>, handle: Handle, index: &Index) -> BridgeResult<Item> {
        self.with_session(|session| {
            let result = getitem(session, handle, index)?;
            into_item(self, session, result, "getitem")
        })
    }

    /// Read a single element as `T`.
    pub fn get_as<T: FromForeign>(&self, handle: Handle, index: &Index) -> BridgeResult<T> {
        let value = self.with_session(|session| {
            let result = getitem(session, handle, index)?;
            let value = coerce(session, result, T::TAG);
            session.runtime.decref(result);
            value
        })?;
        T::from_host(value)
    }

    /// Write `array[index] = value`, broadcasting `value` to the selection.
    pub fn set(&self, handle: Handle, index: &Index, value: impl Into<HostValue>) -> BridgeResult<()> {
        let value = value.into();
        self.with_session(|session| {
            let obj = target(session, handle, index)?;
            let key = key(session, index)?;
            let value = match to_foreign(session, &value) {
                Ok(value) => value,
                Err(e) => {
                    session.runtime.decref(key);
                    return Err(e);
                }
            };
            let result = session.runtime.setitem(obj, key, value);
            session.decref_all([key, value]);
            result.map_err(|e| index_error("setitem", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_rank_must_match() {
        let index = Index::from(vec![1, 2]);
        assert_eq!(
            index.validate(3),
            Err(IndexFault::Rank {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(index.validate(2), Ok(()));
    }

    #[test]
    fn test_axes_may_be_partial() {
        let index = Index::from(vec![AxisIndex::At(0)]);
        assert_eq!(index.validate(3), Ok(()));
        let index = Index::from(vec![AxisIndex::Full; 4]);
        assert!(matches!(index.validate(3), Err(IndexFault::Rank { .. })));
    }

    #[test]
    fn test_zero_step_rejected() {
        let index = Index::from(vec![AxisIndex::slice(None, None, Some(0))]);
        assert_eq!(index.validate(1), Err(IndexFault::ZeroStep));
    }

    #[test]
    fn test_index_error_mapping() {
        let err = index_error("getitem", Exception::index_error("index 9 is out of bounds"));
        assert_eq!(
            err,
            BridgeError::Index(IndexFault::OutOfRange("index 9 is out of bounds".into()))
        );
        let err = index_error(
            "setitem",
            Exception::value_error("could not broadcast input array from shape (2,) into shape (3,)"),
        );
        assert!(matches!(err, BridgeError::Index(IndexFault::Shape(_))));
        let err = index_error("getitem", Exception::type_error("bad"));
        assert_eq!(err.foreign_kind(), Some(ExceptionKind::TypeError));
    }
}
