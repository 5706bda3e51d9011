//! `random` module call sites.
//!
//! Samplers come in pairs: without a size they return one host scalar, with
//! a size they return an owning array.

use std::sync::Arc;

use crate::array::{ArrayObject, ForeignArray};
use crate::calls::CallSite;
use crate::error::BridgeResult;
use crate::interpreter::Interpreter;
use crate::marshal::{Arg, HostValue};

pub const SEED: CallSite = CallSite::new("random.seed", &["seed"]);
pub const RAND: CallSite = CallSite::new("random.rand", &["*dims"]);
pub const RANDN: CallSite = CallSite::new("random.randn", &["*dims"]);
pub const RANDINT: CallSite = CallSite::new("random.randint", &["low", "high", "size", "dtype"]);
pub const RANDOM_INTEGERS: CallSite =
    CallSite::new("random.random_integers", &["low", "high", "size"]);
pub const RANDOM_SAMPLE: CallSite = CallSite::new("random.random_sample", &["size"]);
pub const RANDOM: CallSite = CallSite::new("random.random", &["size"]);
pub const RANF: CallSite = CallSite::new("random.ranf", &["size"]);
pub const SAMPLE: CallSite = CallSite::new("random.sample", &["size"]);
pub const CHOICE: CallSite = CallSite::new("random.choice", &["a", "size", "replace", "p"]);
pub const BYTES: CallSite = CallSite::new("random.bytes", &["length"]);
pub const SHUFFLE: CallSite = CallSite::new("random.shuffle", &["x"]);
pub const PERMUTATION: CallSite = CallSite::new("random.permutation", &["x"]);
pub const UNIFORM: CallSite = CallSite::new("random.uniform", &["low", "high", "size"]);
pub const NORMAL: CallSite = CallSite::new("random.normal", &["loc", "scale", "size"]);

pub fn seed(interpreter: &Interpreter, seed: u32) -> BridgeResult<()> {
    interpreter.call(&SEED.spec([Arg::of(seed)]))
}

fn dims(dims: &[i64]) -> impl Iterator<Item = Arg> + '_ {
    dims.iter().map(|&d| Arg::of(d))
}

/// One uniform float in [0, 1).
pub fn rand(interpreter: &Interpreter) -> BridgeResult<f64> {
    interpreter.call(&RAND.spec([]))
}

/// Uniform floats in [0, 1) with shape `shape`.
pub fn rand_array(interpreter: &Arc<Interpreter>, shape: &[i64]) -> BridgeResult<ForeignArray<f64>> {
    interpreter.call_as(&RAND.spec_from(dims(shape)))
}

pub fn randn(interpreter: &Interpreter) -> BridgeResult<f64> {
    interpreter.call(&RANDN.spec([]))
}

pub fn randn_array(interpreter: &Arc<Interpreter>, shape: &[i64]) -> BridgeResult<ForeignArray<f64>> {
    interpreter.call_as(&RANDN.spec_from(dims(shape)))
}

/// One integer in `[low, high)`, or `[0, low)` without `high`.
pub fn randint(interpreter: &Interpreter, low: i64, high: Option<i64>) -> BridgeResult<i64> {
    interpreter.call(&RANDINT.spec([Arg::of(low), Arg::opt(high)]))
}

pub fn randint_array(
    interpreter: &Arc<Interpreter>,
    low: i64,
    high: Option<i64>,
    size: &[i64],
) -> BridgeResult<ForeignArray<i64>> {
    interpreter.call_as(&RANDINT.spec([Arg::of(low), Arg::opt(high), Arg::of(size)]))
}

/// One integer in `[low, high]`, or `[1, low]` without `high`.
pub fn random_integers(interpreter: &Interpreter, low: i64, high: Option<i64>) -> BridgeResult<i64> {
    interpreter.call(&RANDOM_INTEGERS.spec([Arg::of(low), Arg::opt(high)]))
}

pub fn random_integers_array(
    interpreter: &Arc<Interpreter>,
    low: i64,
    high: Option<i64>,
    size: &[i64],
) -> BridgeResult<ForeignArray<i64>> {
    interpreter.call_as(&RANDOM_INTEGERS.spec([Arg::of(low), Arg::opt(high), Arg::of(size)]))
}

pub fn random_sample(interpreter: &Interpreter) -> BridgeResult<f64> {
    interpreter.call(&RANDOM_SAMPLE.spec([]))
}

pub fn random_sample_array(
    interpreter: &Arc<Interpreter>,
    size: &[i64],
) -> BridgeResult<ForeignArray<f64>> {
    interpreter.call_as(&RANDOM_SAMPLE.spec([Arg::of(size)]))
}

/// One element drawn from `arange(n)`.
pub fn choice(interpreter: &Interpreter, n: i64) -> BridgeResult<i64> {
    interpreter.call(&CHOICE.spec([Arg::of(n)]))
}

/// Draw `size` elements of `population` (an int `n` or an array).
pub fn choice_array(
    interpreter: &Arc<Interpreter>,
    population: impl Into<HostValue>,
    size: &[i64],
    replace: bool,
    p: Option<&[f64]>,
) -> BridgeResult<ArrayObject> {
    interpreter.call_array(&CHOICE.spec([
        Arg::of(population),
        Arg::of(size),
        Arg::of(replace),
        Arg::opt(p),
    ]))
}

pub fn bytes(interpreter: &Interpreter, length: usize) -> BridgeResult<Vec<u8>> {
    interpreter.call(&BYTES.spec([Arg::of(length as i64)]))
}

/// Shuffle `array` in place along its first axis.
pub fn shuffle(interpreter: &Interpreter, array: &ArrayObject) -> BridgeResult<()> {
    interpreter.call(&SHUFFLE.spec([Arg::of(array)]))
}

/// A permutation of `arange(n)`.
pub fn permutation(interpreter: &Arc<Interpreter>, n: i64) -> BridgeResult<ForeignArray<i64>> {
    interpreter.call_as(&PERMUTATION.spec([Arg::of(n)]))
}

/// A row-shuffled copy of `array`.
pub fn permutation_of(interpreter: &Arc<Interpreter>, array: &ArrayObject) -> BridgeResult<ArrayObject> {
    interpreter.call_array(&PERMUTATION.spec([Arg::of(array)]))
}

pub fn uniform(
    interpreter: &Arc<Interpreter>,
    low: f64,
    high: f64,
    size: &[i64],
) -> BridgeResult<ForeignArray<f64>> {
    interpreter.call_as(&UNIFORM.spec([Arg::of(low), Arg::of(high), Arg::of(size)]))
}

pub fn normal(
    interpreter: &Arc<Interpreter>,
    loc: f64,
    scale: f64,
    size: &[i64],
) -> BridgeResult<ForeignArray<f64>> {
    interpreter.call_as(&NORMAL.spec([Arg::of(loc), Arg::of(scale), Arg::of(size)]))
}
