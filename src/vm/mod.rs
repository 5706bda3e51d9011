//! Built-in embedded array runtime
//!
//! `Engine` is a small dynamically-typed interpreter core: a refcounted object
//! heap, a module namespace populated with native functions, n-d arrays, and
//! Python-style exceptions. It implements `ForeignRuntime`, so the bridge
//! drives it exactly as it would drive an external interpreter.

pub mod heap;
pub mod ndarray;
pub mod stdlib_setup;
pub mod value;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::runtime::{
    ArrayInfo, DType, Exception, ExceptionKind, ForeignResult, ForeignRuntime, Kwargs, ObjId,
    Primitive,
};
use crate::vm::heap::Heap;
use crate::vm::ndarray::{Located, NdArray, Scalar, Selector, checked_size, promote};
use crate::vm::value::{Args, Cursor, Object};

/// Settings the runtime is initialized with.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub home: Option<PathBuf>,
    pub lib_path: Option<PathBuf>,
    pub root_module: String,
    pub seed: Option<u64>,
}

pub struct Engine {
    heap: Heap,
    modules: HashMap<String, ObjId>,
    none: ObjId,
    no_value: ObjId,
    rng: fastrand::Rng,
    home: Option<PathBuf>,
    lib_path: Option<PathBuf>,
    finalized: bool,
}

fn check_dir(path: &Option<PathBuf>, what: &str) -> ForeignResult<()> {
    match path {
        Some(p) if !p.is_dir() => Err(Exception::new(
            ExceptionKind::RuntimeError,
            format!("could not find runtime {what} at {}", p.display()),
        )),
        _ => Ok(()),
    }
}

impl Engine {
    /// Initialize the runtime. A configured home or library directory that
    /// does not exist is fatal.
    pub fn initialize(config: &EngineConfig) -> ForeignResult<Self> {
        check_dir(&config.home, "home")?;
        check_dir(&config.lib_path, "library path")?;

        let mut heap = Heap::new();
        let none = heap.alloc(Object::None);
        let no_value = heap.alloc(Object::NoValue);
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut engine = Self {
            heap,
            modules: HashMap::new(),
            none,
            no_value,
            rng,
            home: config.home.clone(),
            lib_path: config.lib_path.clone(),
            finalized: false,
        };
        let root = if config.root_module.is_empty() {
            "numeric"
        } else {
            config.root_module.as_str()
        };
        stdlib_setup::setup_stdlib(&mut engine, root);
        Ok(engine)
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn lib_path(&self) -> Option<&Path> {
        self.lib_path.as_deref()
    }

    /// Number of live objects, including immortal ones.
    pub fn live_objects(&self) -> usize {
        self.heap.live()
    }

    pub(crate) fn register_module(&mut self, name: &str, module: ObjId) {
        self.modules.insert(name.to_string(), module);
    }

    /// Take an extra reference for a second owner.
    pub(crate) fn retain(&mut self, id: ObjId) {
        self.heap.incref(id);
    }

    pub(crate) fn rng(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    // =========================================================================
    // Object construction
    // =========================================================================

    pub(crate) fn alloc(&mut self, object: Object) -> ObjId {
        self.heap.alloc(object)
    }

    pub(crate) fn new_none(&mut self) -> ObjId {
        self.heap.incref(self.none);
        self.none
    }

    pub(crate) fn new_array(&mut self, array: NdArray) -> ObjId {
        self.alloc(Object::Array(array))
    }

    pub(crate) fn new_scalar(&mut self, value: Scalar) -> ObjId {
        self.alloc(match value {
            Scalar::Bool(b) => Object::Bool(b),
            Scalar::Int(i) => Object::Int(i),
            Scalar::Float(f) => Object::Float(f),
        })
    }

    /// Array result, collapsing zero-dimensional views to scalars.
    pub(crate) fn new_array_or_scalar(&mut self, array: NdArray) -> ObjId {
        match (array.ndim(), array.item()) {
            (0, Some(value)) => self.new_scalar(value),
            _ => self.new_array(array),
        }
    }

    // =========================================================================
    // Argument conversion
    // =========================================================================

    pub(crate) fn object(&self, id: ObjId) -> ForeignResult<&Object> {
        self.heap.get(id).ok_or_else(|| {
            Exception::new(
                ExceptionKind::RuntimeError,
                format!("reference to a released object {id:?}"),
            )
        })
    }

    pub(crate) fn object_mut(&mut self, id: ObjId) -> Option<&mut Object> {
        self.heap.get_mut(id)
    }

    pub(crate) fn is_none(&self, id: ObjId) -> bool {
        matches!(self.heap.get(id), Some(Object::None))
    }

    fn scalar_of(&self, id: ObjId) -> ForeignResult<Option<Scalar>> {
        Ok(match self.object(id)? {
            Object::Bool(b) => Some(Scalar::Bool(*b)),
            Object::Int(i) => Some(Scalar::Int(*i)),
            Object::Float(f) => Some(Scalar::Float(*f)),
            Object::Array(a) if a.ndim() == 0 => a.item(),
            _ => None,
        })
    }

    pub(crate) fn to_i64(&self, id: ObjId) -> ForeignResult<i64> {
        match self.scalar_of(id)? {
            Some(Scalar::Int(i)) => Ok(i),
            Some(Scalar::Bool(b)) => Ok(b as i64),
            _ => Err(Exception::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                self.type_name(id)
            ))),
        }
    }

    pub(crate) fn to_f64(&self, id: ObjId) -> ForeignResult<f64> {
        self.scalar_of(id)?.map(Scalar::as_f64).ok_or_else(|| {
            Exception::type_error(format!(
                "must be real number, not {}",
                self.type_name(id)
            ))
        })
    }

    pub(crate) fn to_bool(&self, id: ObjId) -> ForeignResult<bool> {
        match self.object(id)? {
            Object::None => Ok(false),
            _ => self.scalar_of(id)?.map(Scalar::as_bool).ok_or_else(|| {
                Exception::type_error(format!("'{}' has no truth value", self.type_name(id)))
            }),
        }
    }

    /// A shape argument: one integer or a sequence of integers.
    pub(crate) fn to_shape(&self, id: ObjId) -> ForeignResult<Vec<usize>> {
        let dims = match self.object(id)? {
            Object::Tuple(items) | Object::List(items) => items
                .iter()
                .map(|&item| self.to_i64(item))
                .collect::<ForeignResult<Vec<_>>>()?,
            Object::Array(a) if a.ndim() == 1 => a.values().into_iter().map(Scalar::as_i64).collect(),
            _ => vec![self.to_i64(id)?],
        };
        if dims.iter().any(|&d| d < 0) {
            return Err(Exception::value_error("negative dimensions are not allowed"));
        }
        let shape: Vec<usize> = dims.into_iter().map(|d| d as usize).collect();
        checked_size(&shape)?;
        Ok(shape)
    }

    /// Optional `dtype=` argument.
    pub(crate) fn to_dtype(&self, id: Option<ObjId>) -> ForeignResult<Option<DType>> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.object(id)? {
            Object::None => Ok(None),
            Object::Str(name) => DType::parse(name)
                .map(Some)
                .ok_or_else(|| Exception::type_error(format!("data type '{name}' not understood"))),
            other => Err(Exception::type_error(format!(
                "Cannot interpret '{}' as a data type",
                other.type_name()
            ))),
        }
    }

    /// Convert any array-like object into an array.
    pub(crate) fn to_array(&self, id: ObjId) -> ForeignResult<NdArray> {
        if let Object::Array(array) = self.object(id)? {
            return Ok(array.clone());
        }
        let mut shape = Vec::new();
        let mut values = Vec::new();
        self.flatten_into(id, 0, &mut shape, &mut values)?;
        let dtype = promote(values.iter().map(|v: &Scalar| v.dtype()));
        let dtype = if values.is_empty() { DType::Float64 } else { dtype };
        Ok(NdArray::from_values(dtype, &values, shape))
    }

    fn flatten_into(
        &self,
        id: ObjId,
        depth: usize,
        shape: &mut Vec<usize>,
        values: &mut Vec<Scalar>,
    ) -> ForeignResult<()> {
        let ragged = || Exception::value_error("setting an array element with a sequence");
        match self.object(id)? {
            Object::Tuple(items) | Object::List(items) => {
                match shape.get(depth) {
                    Some(&len) if len != items.len() => return Err(ragged()),
                    Some(_) => {}
                    None if depth == shape.len() && values.is_empty() => shape.push(items.len()),
                    None => return Err(ragged()),
                }
                for &item in items {
                    self.flatten_into(item, depth + 1, shape, values)?;
                }
                Ok(())
            }
            Object::Array(array) => {
                for (axis, &dim) in array.shape().iter().enumerate() {
                    match shape.get(depth + axis) {
                        Some(&len) if len != dim => return Err(ragged()),
                        Some(_) => {}
                        None if values.is_empty() => shape.push(dim),
                        None => return Err(ragged()),
                    }
                }
                values.extend(array.values());
                Ok(())
            }
            _ => match self.scalar_of(id)? {
                Some(value) if depth == shape.len() => {
                    values.push(value);
                    Ok(())
                }
                Some(_) => Err(ragged()),
                None => Err(Exception::type_error(format!(
                    "'{}' object cannot be converted to an array",
                    self.type_name(id)
                ))),
            },
        }
    }

    fn to_selector(&self, id: ObjId) -> ForeignResult<Selector> {
        match self.object(id)? {
            Object::Int(i) => Ok(Selector::Int(*i)),
            Object::Slice(bounds) => Ok(Selector::Slice(*bounds)),
            Object::Array(a) if a.ndim() == 0 && a.dtype() == DType::Int64 => {
                Ok(Selector::Int(a.item().map_or(0, Scalar::as_i64)))
            }
            Object::Array(_) | Object::List(_) | Object::Tuple(_) => {
                let array = self.to_array(id)?;
                match array.dtype() {
                    // Masks select along a single axis.
                    DType::Bool if array.ndim() != 1 => Err(Exception::index_error(
                        "boolean index arrays must be one-dimensional",
                    )),
                    DType::Bool => Ok(Selector::Mask(
                        array.values().into_iter().map(Scalar::as_bool).collect(),
                    )),
                    DType::Int64 => Ok(Selector::Fancy {
                        indices: array.values().into_iter().map(Scalar::as_i64).collect(),
                        shape: array.shape().to_vec(),
                    }),
                    // An empty list converts to float64 and still indexes nothing.
                    DType::Float64 if array.size() == 0 => Ok(Selector::Fancy {
                        indices: Vec::new(),
                        shape: array.shape().to_vec(),
                    }),
                    DType::Float64 => Err(Exception::index_error(
                        "arrays used as indices must be of integer (or boolean) type",
                    )),
                }
            }
            other => Err(Exception::index_error(format!(
                "only integers, slices, and integer or boolean arrays are valid indices (got '{}')",
                other.type_name()
            ))),
        }
    }

    fn to_selectors(&self, key: ObjId) -> ForeignResult<Vec<Selector>> {
        match self.object(key)? {
            Object::Tuple(items) => items.iter().map(|&item| self.to_selector(item)).collect(),
            _ => Ok(vec![self.to_selector(key)?]),
        }
    }

    fn sequence_index(&self, items: &[ObjId], key: ObjId) -> ForeignResult<usize> {
        let index = self.to_i64(key)?;
        let len = items.len() as i64;
        let resolved = if index < 0 { index + len } else { index };
        if resolved < 0 || resolved >= len {
            return Err(Exception::index_error("index out of range"));
        }
        Ok(resolved as usize)
    }

    fn attribute_error(&self, obj: ObjId, name: &str) -> Exception {
        Exception::attribute_error(format!(
            "'{}' object has no attribute '{name}'",
            self.type_name(obj)
        ))
    }

    fn array_attr(&mut self, array: &NdArray, name: &str) -> Option<ObjId> {
        let object = match name {
            "shape" => {
                let dims: Vec<ObjId> = array
                    .shape()
                    .iter()
                    .map(|&d| self.alloc(Object::Int(d as i64)))
                    .collect();
                Object::Tuple(dims)
            }
            "ndim" => Object::Int(array.ndim() as i64),
            "size" => Object::Int(array.size() as i64),
            "itemsize" => Object::Int(array.dtype().itemsize() as i64),
            "nbytes" => Object::Int(array.nbytes() as i64),
            "dtype" => Object::Str(array.dtype().name().to_string()),
            "T" => {
                let values = array.values();
                let shape: Vec<usize> = array.shape().iter().rev().copied().collect();
                let ndim = shape.len();
                let mut out = Vec::with_capacity(values.len());
                let src_strides: Vec<usize> = (0..ndim)
                    .map(|axis| array.shape()[axis + 1..].iter().product())
                    .collect();
                let total: usize = shape.iter().product();
                for flat in 0..total {
                    let mut rem = flat;
                    let mut src = 0;
                    for axis in (0..ndim).rev() {
                        let idx = rem % shape[axis];
                        rem /= shape[axis];
                        src += idx * src_strides[ndim - 1 - axis];
                    }
                    out.push(values[src]);
                }
                Object::Array(NdArray::from_values(array.dtype(), &out, shape))
            }
            _ => return None,
        };
        Some(self.alloc(object))
    }
}

impl ForeignRuntime for Engine {
    fn name(&self) -> &'static str {
        "numbridge-vm"
    }

    fn finalize(&mut self) {
        if !self.finalized {
            self.heap.clear();
            self.modules.clear();
            self.finalized = true;
        }
    }

    fn import(&mut self, module: &str) -> ForeignResult<ObjId> {
        match self.modules.get(module).copied() {
            Some(id) => {
                self.heap.incref(id);
                Ok(id)
            }
            None => Err(Exception::new(
                ExceptionKind::ModuleNotFoundError,
                format!("No module named '{module}'"),
            )),
        }
    }

    fn getattr(&mut self, obj: ObjId, name: &str) -> ForeignResult<ObjId> {
        match self.object(obj)? {
            Object::Module(module) => match module.attrs.get(name).copied() {
                Some(id) => {
                    self.heap.incref(id);
                    Ok(id)
                }
                None => Err(Exception::attribute_error(format!(
                    "module '{}' has no attribute '{name}'",
                    module.name
                ))),
            },
            Object::Array(array) => {
                let array = array.clone();
                self.array_attr(&array, name)
                    .ok_or_else(|| self.attribute_error(obj, name))
            }
            _ => Err(self.attribute_error(obj, name)),
        }
    }

    fn call(
        &mut self,
        callable: ObjId,
        args: &[ObjId],
        kwargs: &Kwargs<'_>,
    ) -> ForeignResult<ObjId> {
        let native = match self.object(callable)? {
            Object::Native(native) => native.clone(),
            other => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not callable",
                    other.type_name()
                )));
            }
        };
        let positional = args
            .iter()
            .map(|&id| (id != self.no_value).then_some(id))
            .collect();
        let keywords = kwargs
            .iter()
            .filter(|(_, id)| *id != self.no_value)
            .map(|(name, id)| (name.to_string(), *id))
            .collect();
        let args = Args {
            positional,
            keywords,
        };
        (native.func)(self, &args)
    }

    fn getitem(&mut self, obj: ObjId, key: ObjId) -> ForeignResult<ObjId> {
        match self.object(obj)? {
            Object::Array(array) => {
                let array = array.clone();
                let selectors = self.to_selectors(key)?;
                match array.locate(&selectors)? {
                    Located::View(view) => Ok(self.new_array_or_scalar(view)),
                    Located::Gather { .. } => {
                        let gathered = array.select(&selectors)?;
                        Ok(self.new_array(gathered))
                    }
                }
            }
            Object::Tuple(items) | Object::List(items) => {
                let item = items[self.sequence_index(items, key)?];
                self.heap.incref(item);
                Ok(item)
            }
            other => Err(Exception::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    fn setitem(&mut self, obj: ObjId, key: ObjId, value: ObjId) -> ForeignResult<()> {
        match self.object(obj)? {
            Object::Array(array) => {
                let array = array.clone();
                let selectors = self.to_selectors(key)?;
                let value = self.to_array(value)?;
                array.assign(&selectors, &value)
            }
            Object::List(items) => {
                let slot = self.sequence_index(items, key)?;
                self.heap.incref(value);
                let old = match self.heap.get_mut(obj) {
                    Some(Object::List(items)) => std::mem::replace(&mut items[slot], value),
                    _ => value,
                };
                self.heap.decref(old);
                Ok(())
            }
            other => Err(Exception::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    fn iter(&mut self, obj: ObjId) -> ForeignResult<ObjId> {
        let len = match self.object(obj)? {
            Object::Array(array) if array.ndim() == 0 => {
                return Err(Exception::type_error("iteration over a 0-d array"));
            }
            Object::Array(array) => array.shape()[0],
            Object::Tuple(items) | Object::List(items) => items.len(),
            Object::Iter(_) => {
                self.heap.incref(obj);
                return Ok(obj);
            }
            other => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )));
            }
        };
        self.heap.incref(obj);
        Ok(self.alloc(Object::Iter(Cursor {
            source: obj,
            position: 0,
            len,
        })))
    }

    fn next(&mut self, iterator: ObjId) -> ForeignResult<Option<ObjId>> {
        let cursor = match self.object(iterator)? {
            Object::Iter(cursor) => cursor.clone(),
            other => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not an iterator",
                    other.type_name()
                )));
            }
        };
        if cursor.position >= cursor.len {
            return Ok(None);
        }
        let item = match self.object(cursor.source)? {
            Object::Array(array) => {
                let row = array.select(&[Selector::Int(cursor.position as i64)])?;
                self.new_array_or_scalar(row)
            }
            Object::Tuple(items) | Object::List(items) => {
                let item = items[cursor.position];
                self.heap.incref(item);
                item
            }
            _ => return Err(Exception::type_error("iterator source changed type")),
        };
        if let Some(Object::Iter(live)) = self.heap.get_mut(iterator) {
            live.position += 1;
        }
        Ok(Some(item))
    }

    fn as_array(&mut self, obj: ObjId) -> ForeignResult<ObjId> {
        if matches!(self.object(obj)?, Object::Array(_)) {
            self.heap.incref(obj);
            return Ok(obj);
        }
        let array = self.to_array(obj)?;
        Ok(self.new_array(array))
    }

    fn build(&mut self, value: Primitive) -> ForeignResult<ObjId> {
        let object = match value {
            Primitive::None => return Ok(self.new_none()),
            Primitive::NoValue => {
                self.heap.incref(self.no_value);
                return Ok(self.no_value);
            }
            Primitive::Bool(b) => Object::Bool(b),
            Primitive::Int(i) => Object::Int(i),
            Primitive::Float(f) => Object::Float(f),
            Primitive::Str(s) => Object::Str(s),
            Primitive::Bytes(b) => Object::Bytes(b),
            Primitive::Tuple(items) => Object::Tuple(items),
            Primitive::Slice(bounds) => Object::Slice(bounds),
        };
        Ok(self.alloc(object))
    }

    fn extract(&self, obj: ObjId) -> ForeignResult<Primitive> {
        match self.object(obj)? {
            Object::None => Ok(Primitive::None),
            Object::NoValue => Ok(Primitive::NoValue),
            Object::Bool(b) => Ok(Primitive::Bool(*b)),
            Object::Int(i) => Ok(Primitive::Int(*i)),
            Object::Float(f) => Ok(Primitive::Float(*f)),
            Object::Str(s) => Ok(Primitive::Str(s.clone())),
            Object::Bytes(b) => Ok(Primitive::Bytes(b.clone())),
            Object::Tuple(items) | Object::List(items) => Ok(Primitive::Tuple(items.clone())),
            Object::Slice(bounds) => Ok(Primitive::Slice(*bounds)),
            Object::Array(array) if array.ndim() == 0 => match array.item() {
                Some(Scalar::Bool(b)) => Ok(Primitive::Bool(b)),
                Some(Scalar::Int(i)) => Ok(Primitive::Int(i)),
                Some(Scalar::Float(f)) => Ok(Primitive::Float(f)),
                None => Err(Exception::type_error("empty array has no scalar value")),
            },
            Object::Array(_) => Err(Exception::type_error(
                "only 0-dimensional arrays can be converted to scalars",
            )),
            other => Err(Exception::type_error(format!(
                "'{}' object has no host representation",
                other.type_name()
            ))),
        }
    }

    fn type_name(&self, obj: ObjId) -> String {
        self.heap
            .get(obj)
            .map_or("<released>", Object::type_name)
            .to_string()
    }

    fn array_info(&self, obj: ObjId) -> Option<ArrayInfo> {
        match self.heap.get(obj)? {
            Object::Array(array) => Some(ArrayInfo {
                dtype: array.dtype(),
                shape: array.shape().to_vec(),
                data: array.data_addr(),
                nbytes: array.nbytes(),
            }),
            _ => None,
        }
    }

    fn incref(&mut self, obj: ObjId) {
        self.heap.incref(obj);
    }

    fn decref(&mut self, obj: ObjId) {
        self.heap.decref(obj);
    }

    fn release_buffer(&mut self, obj: ObjId, data: usize) -> i32 {
        match self.heap.get(obj) {
            None => 1,
            Some(Object::Array(array)) if array.data_addr() == data => {
                self.heap.decref(obj);
                0
            }
            Some(_) => 2,
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::initialize(&EngineConfig {
            seed: Some(7),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn ints(engine: &mut Engine, values: &[i64]) -> ObjId {
        let items: Vec<ObjId> = values
            .iter()
            .map(|&v| engine.build(Primitive::Int(v)).unwrap())
            .collect();
        engine.build(Primitive::Tuple(items)).unwrap()
    }

    #[test]
    fn test_missing_home_fails() {
        let result = Engine::initialize(&EngineConfig {
            home: Some(PathBuf::from("/definitely/not/a/runtime/home")),
            ..EngineConfig::default()
        });
        let err = result.err().unwrap();
        assert_eq!(err.kind, ExceptionKind::RuntimeError);
    }

    #[test]
    fn test_import_unknown_module() {
        let mut engine = engine();
        let err = engine.import("nope").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ModuleNotFoundError);
    }

    #[test]
    fn test_call_releases_temporaries() {
        let mut engine = engine();
        let baseline = engine.live_objects();

        let root = engine.import("numeric").unwrap();
        let arange = engine.getattr(root, "arange").unwrap();
        let n = engine.build(Primitive::Int(5)).unwrap();
        let result = engine.call(arange, &[n], &[]).unwrap();
        assert_eq!(engine.array_info(result).unwrap().shape, vec![5]);

        for id in [result, n, arange, root] {
            engine.decref(id);
        }
        assert_eq!(engine.live_objects(), baseline);
    }

    #[test]
    fn test_iterator_keeps_source_alive() {
        let mut engine = engine();
        let source = ints(&mut engine, &[1, 2]);
        let array = engine.as_array(source).unwrap();
        engine.decref(source);

        let iter = engine.iter(array).unwrap();
        engine.decref(array);

        let first = engine.next(iter).unwrap().unwrap();
        assert_eq!(engine.extract(first).unwrap(), Primitive::Int(1));
        engine.decref(first);
        let second = engine.next(iter).unwrap().unwrap();
        engine.decref(second);
        assert!(engine.next(iter).unwrap().is_none());
        assert!(engine.next(iter).unwrap().is_none());
        engine.decref(iter);
    }

    #[test]
    fn test_release_buffer_statuses() {
        let mut engine = engine();
        let source = ints(&mut engine, &[1, 2, 3]);
        let array = engine.as_array(source).unwrap();
        engine.decref(source);
        let data = engine.array_info(array).unwrap().data;

        assert_eq!(engine.release_buffer(array, data + 8), 2);
        assert_eq!(engine.release_buffer(array, data), 0);
        assert_eq!(engine.release_buffer(array, data), 1);
    }

    #[test]
    fn test_shape_attribute_is_tuple() {
        let mut engine = engine();
        let root = engine.import("numeric").unwrap();
        let zeros = engine.getattr(root, "zeros").unwrap();
        let shape = ints(&mut engine, &[2, 3]);
        let array = engine.call(zeros, &[shape], &[]).unwrap();
        let attr = engine.getattr(array, "shape").unwrap();
        match engine.extract(attr).unwrap() {
            Primitive::Tuple(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        let err = engine.getattr(array, "nope").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::AttributeError);
    }
}
