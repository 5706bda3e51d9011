//! `random` module natives
//!
//! Samplers return a scalar when no `size` is given and an array of that
//! shape otherwise. All draws come from the engine's seeded `fastrand::Rng`.

use crate::runtime::{DType, Exception, ForeignResult, ObjId};
use crate::stdlib::{given, required};
use crate::vm::Engine;
use crate::vm::ndarray::{NdArray, Scalar, checked_size, reserve_values};
use crate::vm::value::{Args, Object};

/// Draw `size`-shaped samples, or one scalar when `size` is absent.
fn sample(
    engine: &mut Engine,
    size: Option<ObjId>,
    dtype: DType,
    mut draw: impl FnMut(&mut fastrand::Rng) -> Scalar,
) -> ForeignResult<ObjId> {
    let Some(size) = given(engine, size) else {
        let value = draw(engine.rng());
        return Ok(engine.new_scalar(value));
    };
    let shape = engine.to_shape(size)?;
    let count = checked_size(&shape)?;
    let mut values = reserve_values(count)?;
    let rng = engine.rng();
    values.extend((0..count).map(|_| draw(rng)));
    Ok(engine.new_array(NdArray::from_values(dtype, &values, shape)))
}

/// Shape from `*dims` arguments; none at all means a scalar.
fn dims(engine: &Engine, args: &Args, func: &str) -> ForeignResult<Option<Vec<usize>>> {
    let dims = args.varargs(func)?;
    if dims.is_empty() {
        return Ok(None);
    }
    let mut shape = Vec::with_capacity(dims.len());
    for id in dims {
        let dim = engine.to_i64(id)?;
        if dim < 0 {
            return Err(Exception::value_error("negative dimensions are not allowed"));
        }
        shape.push(dim as usize);
    }
    checked_size(&shape)?;
    Ok(Some(shape))
}

fn sample_dims(
    engine: &mut Engine,
    shape: Option<Vec<usize>>,
    mut draw: impl FnMut(&mut fastrand::Rng) -> f64,
) -> ForeignResult<ObjId> {
    match shape {
        None => {
            let value = draw(engine.rng());
            Ok(engine.new_scalar(Scalar::Float(value)))
        }
        Some(shape) => {
            let count = checked_size(&shape)?;
            let mut values = reserve_values(count)?;
            let rng = engine.rng();
            values.extend((0..count).map(|_| Scalar::Float(draw(rng))));
            Ok(engine.new_array(NdArray::from_values(DType::Float64, &values, shape)))
        }
    }
}

/// Standard normal draw (Box-Muller).
fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    // 1 - u keeps the log argument in (0, 1].
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn float_arg(engine: &Engine, slot: Option<ObjId>, default: f64) -> ForeignResult<f64> {
    match given(engine, slot) {
        Some(id) => engine.to_f64(id),
        None => Ok(default),
    }
}

/// seed(seed=None): reseed, from entropy when no seed is given.
pub fn native_seed(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [seed] = args.bind("seed", ["seed"])?;
    let seed = match given(engine, seed) {
        Some(id) => {
            let value = engine.to_i64(id)?;
            if value < 0 {
                return Err(Exception::value_error("Seed must be between 0 and 2**32 - 1"));
            }
            value as u64
        }
        None => fastrand::u64(..),
    };
    engine.rng().seed(seed);
    Ok(engine.new_none())
}

/// rand(d0, d1, ...): uniform floats in [0, 1).
pub fn native_rand(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let shape = dims(engine, args, "rand")?;
    sample_dims(engine, shape, |rng| rng.f64())
}

/// randn(d0, d1, ...): standard normal floats.
pub fn native_randn(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let shape = dims(engine, args, "randn")?;
    sample_dims(engine, shape, standard_normal)
}

fn int_range(
    engine: &Engine,
    func: &str,
    low: Option<ObjId>,
    high: Option<ObjId>,
    implicit_low: i64,
) -> ForeignResult<(i64, i64)> {
    let low = engine.to_i64(required(low, func, "low")?)?;
    match given(engine, high) {
        Some(high) => Ok((low, engine.to_i64(high)?)),
        None => Ok((implicit_low, low)),
    }
}

/// randint(low, high=None, size=None, dtype=int): integers in [low, high).
pub fn native_randint(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [low, high, size, dtype] = args.bind("randint", ["low", "high", "size", "dtype"])?;
    let (low, high) = int_range(engine, "randint", low, high, 0)?;
    if low >= high {
        return Err(Exception::value_error("low >= high"));
    }
    let dtype = engine.to_dtype(dtype)?.unwrap_or(DType::Int64);
    if dtype == DType::Float64 {
        return Err(Exception::type_error(
            "Unsupported dtype float64 for randint",
        ));
    }
    sample(engine, size, dtype, |rng| Scalar::Int(rng.i64(low..high)).cast(dtype))
}

/// random_integers(low, high=None, size=None): integers in [low, high].
pub fn native_random_integers(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [low, high, size] = args.bind("random_integers", ["low", "high", "size"])?;
    let (low, high) = int_range(engine, "random_integers", low, high, 1)?;
    if low > high {
        return Err(Exception::value_error("low > high"));
    }
    sample(engine, size, DType::Int64, |rng| Scalar::Int(rng.i64(low..=high)))
}

/// random_sample(size=None), also exposed as random, ranf and sample.
pub fn native_random_sample(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [size] = args.bind("random_sample", ["size"])?;
    sample(engine, size, DType::Float64, |rng| Scalar::Float(rng.f64()))
}

/// uniform(low=0.0, high=1.0, size=None)
pub fn native_uniform(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [low, high, size] = args.bind("uniform", ["low", "high", "size"])?;
    let low = float_arg(engine, low, 0.0)?;
    let high = float_arg(engine, high, 1.0)?;
    sample(engine, size, DType::Float64, |rng| {
        Scalar::Float(low + (high - low) * rng.f64())
    })
}

/// normal(loc=0.0, scale=1.0, size=None)
pub fn native_normal(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [loc, scale, size] = args.bind("normal", ["loc", "scale", "size"])?;
    let loc = float_arg(engine, loc, 0.0)?;
    let scale = float_arg(engine, scale, 1.0)?;
    if scale < 0.0 {
        return Err(Exception::value_error("scale < 0"));
    }
    sample(engine, size, DType::Float64, |rng| {
        Scalar::Float(loc + scale * standard_normal(rng))
    })
}

/// Population for `choice`/`permutation`: an int `n` means `arange(n)`.
fn population(engine: &Engine, id: ObjId, func: &str) -> ForeignResult<NdArray> {
    if let Object::Int(n) = engine.object(id)? {
        if *n < 0 {
            return Err(Exception::value_error(format!("{func}: a must be non-negative")));
        }
        let values: Vec<Scalar> = (0..*n).map(Scalar::Int).collect();
        return Ok(NdArray::from_values(DType::Int64, &values, vec![*n as usize]));
    }
    let array = engine.to_array(id)?;
    if array.ndim() == 0 {
        return Err(Exception::value_error(format!(
            "{func}: a must be 1-dimensional or an integer"
        )));
    }
    Ok(array)
}

/// Inverse-CDF draw over cumulative weights.
fn weighted_index(rng: &mut fastrand::Rng, cumulative: &[f64]) -> usize {
    let target = rng.f64() * cumulative.last().copied().unwrap_or(0.0);
    cumulative
        .iter()
        .position(|&c| target < c)
        .unwrap_or(cumulative.len().saturating_sub(1))
}

/// choice(a, size=None, replace=True, p=None)
pub fn native_choice(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [a, size, replace, p] = args.bind("choice", ["a", "size", "replace", "p"])?;
    let pool = population(engine, required(a, "choice", "a")?, "choice")?;
    if pool.ndim() != 1 {
        return Err(Exception::value_error("a must be 1-dimensional"));
    }
    let values = pool.values();
    let n = values.len();
    let replace = match given(engine, replace) {
        Some(id) => engine.to_bool(id)?,
        None => true,
    };

    let cumulative = match given(engine, p) {
        Some(id) => {
            let weights = engine.to_array(id)?.values();
            if weights.len() != n {
                return Err(Exception::value_error("a and p must have same size"));
            }
            let mut total = 0.0;
            let mut cumulative = Vec::with_capacity(n);
            for w in weights {
                let w = w.as_f64();
                if w < 0.0 {
                    return Err(Exception::value_error("probabilities are not non-negative"));
                }
                total += w;
                cumulative.push(total);
            }
            if (total - 1.0).abs() > 1e-8 {
                return Err(Exception::value_error("probabilities do not sum to 1"));
            }
            Some(cumulative)
        }
        None => None,
    };

    let size_id = given(engine, size);
    let shape = match size_id {
        Some(id) => Some(engine.to_shape(id)?),
        None => None,
    };
    let count = shape.as_ref().map_or(1, |s| s.iter().product());
    if n == 0 && count > 0 {
        return Err(Exception::value_error(
            "a cannot be empty unless no samples are taken",
        ));
    }
    if !replace && count > n {
        return Err(Exception::value_error(
            "Cannot take a larger sample than population when 'replace=False'",
        ));
    }

    let rng = engine.rng();
    let picks: Vec<usize> = if replace {
        (0..count)
            .map(|_| match &cumulative {
                Some(cumulative) => weighted_index(rng, cumulative),
                None => rng.usize(..n),
            })
            .collect()
    } else {
        let mut remaining: Vec<usize> = (0..n).collect();
        let weights: Option<Vec<f64>> = cumulative.map(|c| {
            c.iter()
                .scan(0.0, |prev, &c| {
                    let w = c - *prev;
                    *prev = c;
                    Some(w)
                })
                .collect()
        });
        let mut picks = Vec::with_capacity(count);
        for _ in 0..count {
            let slot = match &weights {
                Some(weights) => {
                    let cumulative: Vec<f64> = remaining
                        .iter()
                        .scan(0.0, |acc, &i| {
                            *acc += weights[i];
                            Some(*acc)
                        })
                        .collect();
                    weighted_index(rng, &cumulative)
                }
                None => rng.usize(..remaining.len()),
            };
            picks.push(remaining.swap_remove(slot));
        }
        picks
    };

    let chosen: Vec<Scalar> = picks.into_iter().map(|i| values[i]).collect();
    match shape {
        None => Ok(engine.new_scalar(chosen[0])),
        Some(shape) => Ok(engine.new_array(NdArray::from_values(pool.dtype(), &chosen, shape))),
    }
}

/// bytes(length): random bytes.
pub fn native_bytes(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [length] = args.bind("bytes", ["length"])?;
    let length = engine.to_i64(required(length, "bytes", "length")?)?;
    if length < 0 {
        return Err(Exception::value_error("negative argument not allowed"));
    }
    let rng = engine.rng();
    let bytes: Vec<u8> = (0..length).map(|_| rng.u8(..)).collect();
    Ok(engine.alloc(Object::Bytes(bytes)))
}

/// Rows of `array` (first axis) in shuffled order.
fn shuffled_rows(rng: &mut fastrand::Rng, array: &NdArray) -> NdArray {
    let values = array.values();
    let rows = array.shape().first().copied().unwrap_or(0);
    let row_len = if rows == 0 { 0 } else { values.len() / rows };
    let mut order: Vec<usize> = (0..rows).collect();
    rng.shuffle(&mut order);
    let shuffled: Vec<Scalar> = order
        .into_iter()
        .flat_map(|row| values[row * row_len..(row + 1) * row_len].iter().copied())
        .collect();
    NdArray::from_values(array.dtype(), &shuffled, array.shape().to_vec())
}

/// shuffle(x): permute an array along its first axis (or a list) in place.
pub fn native_shuffle(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [x] = args.bind("shuffle", ["x"])?;
    let x = required(x, "shuffle", "x")?;
    match engine.object(x)?.clone() {
        Object::Array(array) if array.ndim() > 0 => {
            let shuffled = shuffled_rows(engine.rng(), &array);
            array.assign(&[], &shuffled)?;
        }
        Object::List(mut items) => {
            // Same ids in a new order, so ownership is unchanged.
            engine.rng().shuffle(&mut items);
            if let Some(Object::List(slots)) = engine.object_mut(x) {
                *slots = items;
            }
        }
        other => {
            return Err(Exception::type_error(format!(
                "shuffle() expects a mutable sequence, got '{}'",
                other.type_name()
            )));
        }
    }
    Ok(engine.new_none())
}

/// permutation(x): a shuffled copy, or a permuted `arange(x)` for an int.
pub fn native_permutation(engine: &mut Engine, args: &Args) -> ForeignResult<ObjId> {
    let [x] = args.bind("permutation", ["x"])?;
    let pool = population(engine, required(x, "permutation", "x")?, "permutation")?;
    let shuffled = shuffled_rows(engine.rng(), &pool);
    Ok(engine.new_array(shuffled))
}
