// Object representation inside the built-in runtime.
// Every heap slot holds one `Object`; container objects own references to
// their children, which the heap releases when the container dies.
use std::collections::HashMap;

use crate::runtime::{Exception, ForeignResult, ObjId, SliceBounds};
use crate::vm::Engine;
use crate::vm::ndarray::NdArray;

/// Arguments as received by a native function.
pub struct Args {
    /// Positional arguments. `None` marks an omitted slot.
    pub positional: Vec<Option<ObjId>>,
    pub keywords: Vec<(String, ObjId)>,
}

impl Args {
    /// Bind positional and keyword arguments to named parameters. Omitted
    /// slots bind to `None`.
    pub fn bind<const N: usize>(
        &self,
        func: &str,
        params: [&str; N],
    ) -> ForeignResult<[Option<ObjId>; N]> {
        if self.positional.len() > N {
            return Err(Exception::type_error(format!(
                "{func}() takes at most {N} positional arguments ({} given)",
                self.positional.len()
            )));
        }
        let mut bound = [None; N];
        bound[..self.positional.len()].copy_from_slice(&self.positional);
        for (name, value) in &self.keywords {
            let Some(slot) = params.iter().position(|p| p == name) else {
                return Err(Exception::type_error(format!(
                    "{func}() got an unexpected keyword argument '{name}'"
                )));
            };
            if bound[slot].is_some() {
                return Err(Exception::type_error(format!(
                    "{func}() got multiple values for argument '{name}'"
                )));
            }
            bound[slot] = Some(*value);
        }
        Ok(bound)
    }

    /// Positional arguments for `*args` natives, rejecting keywords.
    pub fn varargs(&self, func: &str) -> ForeignResult<Vec<ObjId>> {
        if let Some((name, _)) = self.keywords.first() {
            return Err(Exception::type_error(format!(
                "{func}() got an unexpected keyword argument '{name}'"
            )));
        }
        Ok(self.positional.iter().flatten().copied().collect())
    }
}

pub type NativeFn = fn(&mut Engine, &Args) -> ForeignResult<ObjId>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

#[derive(Clone)]
pub struct Module {
    pub name: String,
    pub attrs: HashMap<String, ObjId>,
}

/// Cursor over the first axis of an array or over a tuple/list.
#[derive(Clone)]
pub struct Cursor {
    pub source: ObjId,
    pub position: usize,
    pub len: usize,
}

#[derive(Clone)]
pub enum Object {
    None,
    NoValue,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<ObjId>),
    List(Vec<ObjId>),
    Slice(SliceBounds),
    Array(NdArray),
    Iter(Cursor),
    Module(Module),
    Native(NativeFunction),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::None => "NoneType",
            Object::NoValue => "_NoValueType",
            Object::Bool(_) => "bool",
            Object::Int(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_) => "str",
            Object::Bytes(_) => "bytes",
            Object::Tuple(_) => "tuple",
            Object::List(_) => "list",
            Object::Slice(_) => "slice",
            Object::Array(_) => "ndarray",
            Object::Iter(_) => "iterator",
            Object::Module(_) => "module",
            Object::Native(_) => "builtin_function_or_method",
        }
    }

    /// References this object owns.
    pub fn children(&self) -> Vec<ObjId> {
        match self {
            Object::Tuple(items) | Object::List(items) => items.clone(),
            Object::Iter(cursor) => vec![cursor.source],
            Object::Module(module) => module.attrs.values().copied().collect(),
            _ => Vec::new(),
        }
    }
}
