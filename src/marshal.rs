//! Call marshaler
//!
//! A `CallSpec` names a foreign callable by dotted path and carries host
//! arguments. Marshaling converts each argument into a fresh runtime object,
//! performs the call under the execution lock, releases the temporaries, and
//! converts the result back: to the shape requested by a `ResultTag`, or,
//! with no tag, into an owning array handle.

use std::sync::Arc;

use crate::array::{ArrayObject, Element, ForeignArray};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{EntryKind, Handle};
use crate::interpreter::{Interpreter, Session};
use crate::runtime::{DType, ForeignResult, ForeignRuntime, ObjId, Primitive};

/// A value on the host side of the boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Bools(Vec<bool>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    /// A registered foreign object.
    Handle(Handle),
}

impl HostValue {
    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::None => "None",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "str",
            HostValue::Bytes(_) => "bytes",
            HostValue::Bools(_) => "bool sequence",
            HostValue::Ints(_) => "int sequence",
            HostValue::Floats(_) => "float sequence",
            HostValue::Handle(_) => "handle",
        }
    }
}

macro_rules! host_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(value: $ty) -> Self {
                    HostValue::$variant(value.into())
                }
            }
        )*
    };
}

host_value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Str,
    &str => Str,
    Vec<u8> => Bytes,
    Vec<bool> => Bools,
    Vec<i64> => Ints,
    &[i64] => Ints,
    Vec<f64> => Floats,
    &[f64] => Floats,
    Handle => Handle,
}

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        HostValue::None
    }
}

impl From<DType> for HostValue {
    fn from(dtype: DType) -> Self {
        HostValue::Str(dtype.name().to_string())
    }
}

impl From<&ArrayObject> for HostValue {
    fn from(array: &ArrayObject) -> Self {
        HostValue::Handle(array.handle())
    }
}

impl<T: Element> From<&ForeignArray<T>> for HostValue {
    fn from(array: &ForeignArray<T>) -> Self {
        HostValue::Handle(array.handle())
    }
}

/// A positional argument slot. `Omitted` keeps its position while telling
/// the callee the argument was not supplied, which is not the same as
/// passing `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Provided(HostValue),
    Omitted,
}

impl Arg {
    pub fn of(value: impl Into<HostValue>) -> Self {
        Arg::Provided(value.into())
    }

    /// `Omitted` for `None`.
    pub fn opt<T: Into<HostValue>>(value: Option<T>) -> Self {
        value.map_or(Arg::Omitted, Arg::of)
    }
}

/// Shape the result is coerced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultTag {
    /// Discard the result.
    Unit,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Bools,
    Ints,
    Floats,
}

/// Description of one foreign call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSpec {
    pub path: String,
    pub args: Vec<Arg>,
    pub kwargs: Vec<(String, Arg)>,
    pub result: Option<ResultTag>,
}

impl CallSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
            result: None,
        }
    }

    pub fn arg(mut self, value: impl Into<HostValue>) -> Self {
        self.args.push(Arg::of(value));
        self
    }

    pub fn omitted(mut self) -> Self {
        self.args.push(Arg::Omitted);
        self
    }

    pub fn push(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.kwargs.push((name.into(), Arg::of(value)));
        self
    }

    /// Keyword argument that is left out entirely when `None`.
    pub fn kwarg_opt<T: Into<HostValue>>(mut self, name: impl Into<String>, value: Option<T>) -> Self {
        self.kwargs.push((name.into(), Arg::opt(value)));
        self
    }

    pub fn returning(mut self, tag: ResultTag) -> Self {
        self.result = Some(tag);
        self
    }
}

/// Result of an untagged lookup that may produce either form.
#[derive(Debug)]
pub enum Item {
    Scalar(HostValue),
    Array(ArrayObject),
}

impl Item {
    pub fn into_scalar(self) -> Option<HostValue> {
        match self {
            Item::Scalar(value) => Some(value),
            Item::Array(_) => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayObject> {
        match self {
            Item::Array(array) => Some(array),
            Item::Scalar(_) => None,
        }
    }
}

/// Host types a call result can be coerced into.
pub trait FromForeign: Sized {
    const TAG: ResultTag;

    fn from_host(value: HostValue) -> BridgeResult<Self>;
}

fn mismatch<T>(expected: &str, value: &HostValue) -> BridgeResult<T> {
    Err(BridgeError::type_mismatch(expected, value.kind()))
}

impl FromForeign for () {
    const TAG: ResultTag = ResultTag::Unit;

    fn from_host(_: HostValue) -> BridgeResult<Self> {
        Ok(())
    }
}

impl FromForeign for bool {
    const TAG: ResultTag = ResultTag::Bool;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Bool(b) => Ok(b),
            other => mismatch("bool", &other),
        }
    }
}

impl FromForeign for i64 {
    const TAG: ResultTag = ResultTag::Int;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Int(i) => Ok(i),
            other => mismatch("int", &other),
        }
    }
}

impl FromForeign for i32 {
    const TAG: ResultTag = ResultTag::Int;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        let wide = i64::from_host(value)?;
        i32::try_from(wide).map_err(|_| BridgeError::type_mismatch("int32", wide.to_string()))
    }
}

impl FromForeign for f64 {
    const TAG: ResultTag = ResultTag::Float;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Float(f) => Ok(f),
            other => mismatch("float", &other),
        }
    }
}

impl FromForeign for String {
    const TAG: ResultTag = ResultTag::Str;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Str(s) => Ok(s),
            other => mismatch("str", &other),
        }
    }
}

impl FromForeign for Vec<u8> {
    const TAG: ResultTag = ResultTag::Bytes;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Bytes(b) => Ok(b),
            other => mismatch("bytes", &other),
        }
    }
}

impl FromForeign for Vec<bool> {
    const TAG: ResultTag = ResultTag::Bools;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Bools(v) => Ok(v),
            other => mismatch("bool sequence", &other),
        }
    }
}

impl FromForeign for Vec<i64> {
    const TAG: ResultTag = ResultTag::Ints;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Ints(v) => Ok(v),
            other => mismatch("int sequence", &other),
        }
    }
}

impl FromForeign for Vec<f64> {
    const TAG: ResultTag = ResultTag::Floats;

    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Floats(v) => Ok(v),
            other => mismatch("float sequence", &other),
        }
    }
}

// ============================================================================
// Host -> foreign
// ============================================================================

fn sequence(session: &mut Session, items: impl Iterator<Item = Primitive>) -> BridgeResult<ObjId> {
    build_sequence(session.runtime.as_mut(), items)
        .map_err(|e| BridgeError::foreign("<argument>", e))
}

fn build_sequence(
    runtime: &mut dyn ForeignRuntime,
    items: impl Iterator<Item = Primitive>,
) -> ForeignResult<ObjId> {
    let mut ids = Vec::new();
    for item in items {
        match runtime.build(item) {
            Ok(id) => ids.push(id),
            Err(e) => {
                for id in ids {
                    runtime.decref(id);
                }
                return Err(e);
            }
        }
    }
    runtime.build(Primitive::Tuple(ids))
}

/// A new runtime reference for a host value.
pub(crate) fn to_foreign(session: &mut Session, value: &HostValue) -> BridgeResult<ObjId> {
    let primitive = match value {
        HostValue::Handle(handle) => {
            let obj = session.lookup(*handle)?;
            session.runtime.incref(obj);
            return Ok(obj);
        }
        HostValue::None => Primitive::None,
        HostValue::Bool(b) => Primitive::Bool(*b),
        HostValue::Int(i) => Primitive::Int(*i),
        HostValue::Float(f) => Primitive::Float(*f),
        HostValue::Str(s) => Primitive::Str(s.clone()),
        HostValue::Bytes(b) => Primitive::Bytes(b.clone()),
        HostValue::Bools(v) => {
            return sequence(session, v.iter().map(|&b| Primitive::Bool(b)));
        }
        HostValue::Ints(v) => return sequence(session, v.iter().map(|&i| Primitive::Int(i))),
        HostValue::Floats(v) => {
            return sequence(session, v.iter().map(|&f| Primitive::Float(f)));
        }
    };
    let built = session.runtime.build(primitive);
    built.map_err(|e| BridgeError::foreign("<argument>", e))
}

// ============================================================================
// Foreign -> host
// ============================================================================

/// Flatten an object (scalar, sequence, or array of any rank) into scalars.
pub(crate) fn flatten(
    runtime: &mut dyn ForeignRuntime,
    obj: ObjId,
    out: &mut Vec<Primitive>,
) -> ForeignResult<()> {
    let is_scalar = match runtime.array_info(obj) {
        Some(info) => info.ndim() == 0,
        None => !matches!(runtime.extract(obj), Ok(Primitive::Tuple(_))),
    };
    if is_scalar {
        out.push(runtime.extract(obj)?);
        return Ok(());
    }
    let iterator = runtime.iter(obj)?;
    let mut result = Ok(());
    loop {
        match runtime.next(iterator) {
            Ok(Some(item)) => {
                result = flatten(runtime, item, out);
                runtime.decref(item);
                if result.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    runtime.decref(iterator);
    result
}

fn scalars<T>(
    session: &mut Session,
    obj: ObjId,
    expected: &str,
    convert: impl Fn(&Primitive) -> Option<T>,
) -> BridgeResult<Vec<T>> {
    let mut values = Vec::new();
    flatten(session.runtime.as_mut(), obj, &mut values)
        .map_err(|e| BridgeError::foreign("<result>", e))?;
    values
        .iter()
        .map(|p| {
            convert(p).ok_or_else(|| BridgeError::type_mismatch(expected, primitive_kind(p)))
        })
        .collect()
}

fn primitive_kind(value: &Primitive) -> &'static str {
    match value {
        Primitive::None => "None",
        Primitive::NoValue => "no value",
        Primitive::Bool(_) => "bool",
        Primitive::Int(_) => "int",
        Primitive::Float(_) => "float",
        Primitive::Str(_) => "str",
        Primitive::Bytes(_) => "bytes",
        Primitive::Tuple(_) => "tuple",
        Primitive::Slice(_) => "slice",
    }
}

fn tag_name(tag: ResultTag) -> &'static str {
    match tag {
        ResultTag::Unit => "no value",
        ResultTag::Bool => "bool",
        ResultTag::Int => "int",
        ResultTag::Float => "float",
        ResultTag::Str => "str",
        ResultTag::Bytes => "bytes",
        ResultTag::Bools => "bool sequence",
        ResultTag::Ints => "int sequence",
        ResultTag::Floats => "float sequence",
    }
}

/// Coerce a borrowed result object to the tag's host shape. Handles created
/// here take their own reference.
pub(crate) fn coerce(session: &mut Session, obj: ObjId, tag: ResultTag) -> BridgeResult<HostValue> {
    match tag {
        ResultTag::Unit => return Ok(HostValue::None),
        ResultTag::Bools => {
            return scalars(session, obj, "bool", |p| match p {
                Primitive::Bool(b) => Some(*b),
                _ => None,
            })
            .map(HostValue::Bools);
        }
        ResultTag::Ints => {
            return scalars(session, obj, "int", |p| match p {
                Primitive::Int(i) => Some(*i),
                Primitive::Bool(b) => Some(*b as i64),
                _ => None,
            })
            .map(HostValue::Ints);
        }
        ResultTag::Floats => {
            return scalars(session, obj, "float", |p| match p {
                Primitive::Float(f) => Some(*f),
                Primitive::Int(i) => Some(*i as f64),
                Primitive::Bool(b) => Some(*b as i64 as f64),
                _ => None,
            })
            .map(HostValue::Floats);
        }
        _ => {}
    }

    let value = match (tag, session.runtime.extract(obj)) {
        (ResultTag::Bool, Ok(Primitive::Bool(b))) => Some(HostValue::Bool(b)),
        (ResultTag::Int, Ok(Primitive::Int(i))) => Some(HostValue::Int(i)),
        (ResultTag::Int, Ok(Primitive::Bool(b))) => Some(HostValue::Int(b as i64)),
        (ResultTag::Float, Ok(Primitive::Float(f))) => Some(HostValue::Float(f)),
        (ResultTag::Float, Ok(Primitive::Int(i))) => Some(HostValue::Float(i as f64)),
        (ResultTag::Float, Ok(Primitive::Bool(b))) => Some(HostValue::Float(b as i64 as f64)),
        (ResultTag::Str, Ok(Primitive::Str(s))) => Some(HostValue::Str(s)),
        (ResultTag::Bytes, Ok(Primitive::Bytes(b))) => Some(HostValue::Bytes(b)),
        _ => None,
    };
    value.ok_or_else(|| BridgeError::type_mismatch(tag_name(tag), session.runtime.type_name(obj)))
}

/// Convert a result object into an owning array, taking over the reference.
pub(crate) fn adopt_array(
    interpreter: &Arc<Interpreter>,
    session: &mut Session,
    obj: ObjId,
    path: &str,
) -> BridgeResult<ArrayObject> {
    let array = session.runtime.as_array(obj);
    session.runtime.decref(obj);
    let array = array.map_err(|e| BridgeError::foreign(path, e))?;
    let Some(info) = session.runtime.array_info(array) else {
        let found = session.runtime.type_name(array);
        session.runtime.decref(array);
        return Err(BridgeError::type_mismatch("ndarray", found));
    };
    let handle = session.register(array, EntryKind::Object);
    Ok(ArrayObject::new(Arc::clone(interpreter), handle, info))
}

/// Owning host form of a result, taking over the reference. Immediates and
/// zero-dimensional arrays convert to scalars, arrays and sequences become
/// owned arrays, anything else is a type error.
pub(crate) fn into_item(
    interpreter: &Arc<Interpreter>,
    session: &mut Session,
    obj: ObjId,
    path: &str,
) -> BridgeResult<Item> {
    let is_array = session
        .runtime
        .array_info(obj)
        .is_some_and(|info| info.ndim() > 0);
    if is_array {
        return adopt_array(interpreter, session, obj, path).map(Item::Array);
    }
    let value = match session.runtime.extract(obj) {
        Ok(Primitive::None | Primitive::NoValue) => HostValue::None,
        Ok(Primitive::Bool(b)) => HostValue::Bool(b),
        Ok(Primitive::Int(i)) => HostValue::Int(i),
        Ok(Primitive::Float(f)) => HostValue::Float(f),
        Ok(Primitive::Str(s)) => HostValue::Str(s),
        Ok(Primitive::Bytes(b)) => HostValue::Bytes(b),
        Ok(Primitive::Tuple(_)) => {
            return adopt_array(interpreter, session, obj, path).map(Item::Array);
        }
        Ok(Primitive::Slice(_)) | Err(_) => {
            let found = session.runtime.type_name(obj);
            session.runtime.decref(obj);
            return Err(BridgeError::type_mismatch("scalar or array", found));
        }
    };
    session.runtime.decref(obj);
    Ok(Item::Scalar(value))
}

// ============================================================================
// Calls
// ============================================================================

/// Perform the call, returning a new reference to the result.
fn call_raw(session: &mut Session, spec: &CallSpec) -> BridgeResult<ObjId> {
    tracing::trace!(path = %spec.path, args = spec.args.len(), "foreign call");

    // Trailing omitted arguments are dropped; interior ones become the
    // runtime's no-value sentinel so later positions keep their meaning.
    let supplied = spec
        .args
        .iter()
        .rposition(|a| matches!(a, Arg::Provided(_)))
        .map_or(0, |last| last + 1);

    let mut temporaries: Vec<ObjId> = Vec::with_capacity(supplied + spec.kwargs.len());
    let outcome = (|| -> BridgeResult<ObjId> {
        let callable = session
            .resolve(&spec.path)
            .map_err(|e| BridgeError::foreign(&spec.path, e))?;
        temporaries.push(callable);

        let mut args = Vec::with_capacity(supplied);
        for arg in &spec.args[..supplied] {
            let obj = match arg {
                Arg::Provided(value) => to_foreign(session, value)?,
                Arg::Omitted => session
                    .runtime
                    .build(Primitive::NoValue)
                    .map_err(|e| BridgeError::foreign(&spec.path, e))?,
            };
            temporaries.push(obj);
            args.push(obj);
        }

        let mut kwargs = Vec::with_capacity(spec.kwargs.len());
        for (name, arg) in &spec.kwargs {
            if let Arg::Provided(value) = arg {
                let obj = to_foreign(session, value)?;
                temporaries.push(obj);
                kwargs.push((name.as_str(), obj));
            }
        }

        session
            .runtime
            .call(callable, &args, &kwargs)
            .map_err(|e| BridgeError::foreign(&spec.path, e))
    })();
    session.decref_all(temporaries);
    outcome
}

impl Interpreter {
    /// Call and coerce the result to the call's result tag. Untagged calls
    /// return arrays as owned `ArrayObject`s and everything else as a scalar.
    pub fn invoke(self: &Arc<Self>, spec: &CallSpec) -> BridgeResult<Item> {
        self.with_session(|session| {
            let result = call_raw(session, spec)?;
            let Some(tag) = spec.result else {
                return into_item(self, session, result, &spec.path);
            };
            let value = coerce(session, result, tag);
            session.runtime.decref(result);
            value.map(Item::Scalar)
        })
    }

    /// Call and convert the result to `T`.
    pub fn call<T: FromForeign>(&self, spec: &CallSpec) -> BridgeResult<T> {
        let value = self.with_session(|session| {
            let result = call_raw(session, spec)?;
            let value = coerce(session, result, T::TAG);
            session.runtime.decref(result);
            value
        })?;
        T::from_host(value)
    }

    /// Call and wrap the result as an owning array handle.
    pub fn call_array(self: &Arc<Self>, spec: &CallSpec) -> BridgeResult<ArrayObject> {
        self.with_session(|session| {
            let result = call_raw(session, spec)?;
            adopt_array(self, session, result, &spec.path)
        })
    }

    /// Call and wrap the result as an array of element type `T`.
    pub fn call_as<T: Element>(self: &Arc<Self>, spec: &CallSpec) -> BridgeResult<ForeignArray<T>> {
        self.call_array(spec)?.typed()
    }
}
