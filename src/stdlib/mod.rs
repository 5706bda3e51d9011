//! Standard Library - Native functions for the built-in runtime
//!
//! Every native has the signature `fn(&mut Engine, &Args) -> ForeignResult<ObjId>`
//! and returns a new reference.

pub mod random;

use crate::runtime::{DType, Exception, ExceptionKind, ForeignResult, ObjId};
use crate::vm::Engine;
use crate::vm::ndarray::{NdArray, Scalar, checked_size, promote, reserve_values};
use crate::vm::value::{Args, Object};

pub(crate) fn required(slot: Option<ObjId>, func: &str, name: &str) -> ForeignResult<ObjId> {
    slot.ok_or_else(|| {
        Exception::type_error(format!("{func}() missing required argument '{name}'"))
    })
}

/// A slot that is absent or holds `None`.
pub(crate) fn given(engine: &Engine, slot: Option<ObjId>) -> Option<ObjId> {
    slot.filter(|&id| !engine.is_none(id))
}

// ============================================================================
// Construction
// ============================================================================

/// array(object, dtype=None): always a fresh array.
pub fn native_array(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [object, dtype] = args.bind("array", ["object", "dtype"])?;
    let object = required(object, "array", "object")?;
    let array = engine.to_array(object)?;
    let array = match engine.to_dtype(dtype)? {
        Some(dtype) => array.cast(dtype),
        None => array.copy(),
    };
    Ok(engine.new_array(array))
}

/// asarray(a, dtype=None): the input itself when it already fits.
pub fn native_asarray(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [a, dtype] = args.bind("asarray", ["a", "dtype"])?;
    let a = required(a, "asarray", "a")?;
    let dtype = engine.to_dtype(dtype)?;
    if let Object::Array(array) = engine.object(a)? {
        if dtype.is_none_or(|d| d == array.dtype()) {
            engine.retain(a);
            return Ok(a);
        }
    }
    let array = engine.to_array(a)?;
    let array = match dtype {
        Some(dtype) if dtype != array.dtype() => array.cast(dtype),
        _ => array,
    };
    Ok(engine.new_array(array))
}

/// arange([start,] stop[, step], dtype=None)
pub fn native_arange(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [start, stop, step, dtype] = args.bind("arange", ["start", "stop", "step", "dtype"])?;
    let first = required(start, "arange", "start")?;
    let (start, stop) = match given(engine, stop) {
        Some(stop) => (Some(first), stop),
        None => (None, first),
    };
    let step = given(engine, step);

    let bounds: Vec<Scalar> = [start, Some(stop), step]
        .into_iter()
        .flatten()
        .map(|id| scalar_arg(engine, id))
        .collect::<ForeignResult<_>>()?;
    let inferred = promote(bounds.iter().map(|s| s.dtype()));
    let inferred = if inferred == DType::Bool { DType::Int64 } else { inferred };
    let dtype = engine.to_dtype(dtype)?.unwrap_or(inferred);

    let start = start.map_or(Ok(0.0), |id| engine.to_f64(id))?;
    let stop = engine.to_f64(stop)?;
    let step = step.map_or(Ok(1.0), |id| engine.to_f64(id))?;
    if step == 0.0 {
        return Err(Exception::new(
            ExceptionKind::ZeroDivisionError,
            "division by zero",
        ));
    }
    let len = ((stop - start) / step).ceil();
    if len.is_nan() {
        return Err(Exception::value_error("arange: cannot compute length"));
    }
    let len = len.max(0.0);
    if len >= usize::MAX as f64 {
        return Err(Exception::value_error("Maximum allowed size exceeded"));
    }
    let len = checked_size(&[len as usize])?;
    let mut values = reserve_values(len)?;
    values.extend((0..len).map(|i| {
        let value = start + i as f64 * step;
        match inferred {
            DType::Float64 => Scalar::Float(value),
            _ => Scalar::Int(value as i64),
        }
    }));
    Ok(engine.new_array(NdArray::from_values(dtype, &values, vec![len])))
}

fn scalar_arg(engine: &Engine, id: ObjId) -> ForeignResult<Scalar> {
    match engine.object(id)? {
        Object::Bool(b) => Ok(Scalar::Bool(*b)),
        Object::Int(i) => Ok(Scalar::Int(*i)),
        Object::Float(f) => Ok(Scalar::Float(*f)),
        Object::Array(a) if a.ndim() == 0 => a
            .item()
            .ok_or_else(|| Exception::type_error("empty array is not a scalar")),
        other => Err(Exception::type_error(format!(
            "expected a scalar, got '{}'",
            other.type_name()
        ))),
    }
}

fn filled(
    engine: &mut Engine,
    func: &str,
    shape: Option<ObjId>,
    dtype: Option<ObjId>,
    fill: Scalar,
) -> ForeignResult<ObjId> {
    let shape = engine.to_shape(required(shape, func, "shape")?)?;
    let dtype = engine.to_dtype(dtype)?.unwrap_or(DType::Float64);
    Ok(engine.new_array(NdArray::filled(dtype, shape, fill)?))
}

pub fn native_zeros(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [shape, dtype] = args.bind("zeros", ["shape", "dtype"])?;
    filled(engine, "zeros", shape, dtype, Scalar::Int(0))
}

pub fn native_ones(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [shape, dtype] = args.bind("ones", ["shape", "dtype"])?;
    filled(engine, "ones", shape, dtype, Scalar::Int(1))
}

/// full(shape, fill_value, dtype=None): dtype defaults to the fill value's.
pub fn native_full(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [shape, fill_value, dtype] = args.bind("full", ["shape", "fill_value", "dtype"])?;
    let fill = scalar_arg(engine, required(fill_value, "full", "fill_value")?)?;
    let shape = engine.to_shape(required(shape, "full", "shape")?)?;
    let dtype = engine.to_dtype(dtype)?.unwrap_or(fill.dtype());
    Ok(engine.new_array(NdArray::filled(dtype, shape, fill)?))
}

/// reshape(a, newshape): one dimension may be -1.
pub fn native_reshape(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [a, newshape] = args.bind("reshape", ["a", "newshape"])?;
    let array = engine.to_array(required(a, "reshape", "a")?)?;
    let newshape = required(newshape, "reshape", "newshape")?;
    let dims = match engine.object(newshape)? {
        Object::Tuple(items) | Object::List(items) => items
            .iter()
            .map(|&item| engine.to_i64(item))
            .collect::<ForeignResult<Vec<_>>>()?,
        _ => vec![engine.to_i64(newshape)?],
    };
    let reshaped = array.reshape(&dims)?;
    Ok(engine.new_array(reshaped))
}

pub fn native_copy(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [a] = args.bind("copy", ["a"])?;
    let array = engine.to_array(required(a, "copy", "a")?)?;
    Ok(engine.new_array(array.copy()))
}

// ============================================================================
// Reductions
// ============================================================================

fn accumulate(dtype: DType, values: impl Iterator<Item = Scalar>) -> Scalar {
    match dtype {
        DType::Float64 => Scalar::Float(values.map(Scalar::as_f64).sum()),
        _ => Scalar::Int(values.fold(0i64, |acc, v| acc.wrapping_add(v.as_i64()))),
    }
}

/// sum(a, axis=None)
pub fn native_sum(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [a, axis] = args.bind("sum", ["a", "axis"])?;
    let array = engine.to_array(required(a, "sum", "a")?)?;
    let values = array.values();
    let Some(axis) = given(engine, axis) else {
        let total = accumulate(array.dtype(), values.into_iter());
        return Ok(engine.new_scalar(total));
    };

    let ndim = array.ndim() as i64;
    let raw = engine.to_i64(axis)?;
    let axis = if raw < 0 { raw + ndim } else { raw };
    if axis < 0 || axis >= ndim {
        return Err(Exception::new(
            ExceptionKind::ValueError,
            format!("axis {raw} is out of bounds for array of dimension {ndim}"),
        ));
    }
    let axis = axis as usize;
    let shape = array.shape();
    let outer: usize = shape[..axis].iter().product();
    let len = shape[axis];
    let inner: usize = shape[axis + 1..].iter().product();

    let mut totals = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let column = (0..len).map(|k| values[(o * len + k) * inner + i]);
            totals.push(accumulate(array.dtype(), column));
        }
    }
    let mut out_shape = shape.to_vec();
    out_shape.remove(axis);
    let dtype = if array.dtype() == DType::Float64 {
        DType::Float64
    } else {
        DType::Int64
    };
    let result = NdArray::from_values(dtype, &totals, out_shape);
    Ok(engine.new_array_or_scalar(result))
}

// ============================================================================
// Elementwise arithmetic
// ============================================================================

fn operands(engine: &Engine, args: &Args, func: &str) -> ForeignResult<(NdArray, NdArray)> {
    let [x1, x2] = args.bind(func, ["x1", "x2"])?;
    let x1 = engine.to_array(required(x1, func, "x1")?)?;
    let x2 = engine.to_array(required(x2, func, "x2")?)?;
    Ok((x1, x2))
}

fn unsupported(func: &str) -> Exception {
    Exception::type_error(format!(
        "ufunc '{func}' not supported for the input types"
    ))
}

fn arithmetic(
    engine: &mut Engine,
    args: &Args,
    func: &'static str,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
    bool_op: Option<fn(bool, bool) -> bool>,
) -> ForeignResult<ObjId> {
    let (x1, x2) = operands(engine, args, func)?;
    let dtype = promote([x1.dtype(), x2.dtype()]);
    let result = match dtype {
        DType::Bool => {
            let op = bool_op.ok_or_else(|| unsupported(func))?;
            x1.zip_with(&x2, dtype, |a, b| Ok(Scalar::Bool(op(a.as_bool(), b.as_bool()))))?
        }
        DType::Int64 => {
            x1.zip_with(&x2, dtype, |a, b| Ok(Scalar::Int(int_op(a.as_i64(), b.as_i64()))))?
        }
        DType::Float64 => {
            x1.zip_with(&x2, dtype, |a, b| Ok(Scalar::Float(float_op(a.as_f64(), b.as_f64()))))?
        }
    };
    Ok(engine.new_array_or_scalar(result))
}

pub fn native_add(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    arithmetic(engine, args, "add", i64::wrapping_add, |a, b| a + b, Some(|a, b| a || b))
}

pub fn native_subtract(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    arithmetic(engine, args, "subtract", i64::wrapping_sub, |a, b| a - b, None)
}

pub fn native_multiply(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    arithmetic(engine, args, "multiply", i64::wrapping_mul, |a, b| a * b, Some(|a, b| a && b))
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a as i64
}

fn lcm(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b)).wrapping_mul(b).wrapping_abs()
}

fn integer_binary(
    engine: &mut Engine,
    args: &Args,
    func: &'static str,
    op: fn(i64, i64) -> i64,
) -> ForeignResult<ObjId> {
    let (x1, x2) = operands(engine, args, func)?;
    if x1.dtype() == DType::Float64 || x2.dtype() == DType::Float64 {
        return Err(unsupported(func));
    }
    let result = x1.zip_with(&x2, DType::Int64, |a, b| Ok(Scalar::Int(op(a.as_i64(), b.as_i64()))))?;
    Ok(engine.new_array_or_scalar(result))
}

/// lcm(x1, x2): elementwise least common multiple of integers.
pub fn native_lcm(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    integer_binary(engine, args, "lcm", lcm)
}

/// gcd(x1, x2): elementwise greatest common divisor of integers.
pub fn native_gcd(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    integer_binary(engine, args, "gcd", gcd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(-4, 6), 2);
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(-3, 5), 15);
        assert_eq!(lcm(0, 7), 0);
    }

    #[test]
    fn test_accumulate_dtypes() {
        let ints = [Scalar::Int(2), Scalar::Bool(true)];
        assert_eq!(accumulate(DType::Int64, ints.into_iter()), Scalar::Int(3));
        let floats = [Scalar::Float(0.5), Scalar::Float(0.25)];
        assert_eq!(accumulate(DType::Float64, floats.into_iter()), Scalar::Float(0.75));
    }
}
